//! Grammar symbols and expressions
//!
//! Symbols are the atoms of a grammar; expressions combine them with
//! sequence, choice, repetition and optionality.

use crate::error::GrammarError;
use compact_str::CompactString;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Not;
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Predicate deciding whether a character (or end of input, `None`) is accepted
pub type CharPredicate = Arc<dyn Fn(Option<char>) -> bool + Send + Sync>;

/// Name of a grammar rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct NonTerminal(CompactString);

impl NonTerminal {
    /// Create a non-terminal with the given name
    #[must_use]
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NonTerminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NonTerminal {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Literal text of the language
///
/// A terminal is never empty, so it always has a first character.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Terminal {
    literal: CompactString,
    first: char,
}

impl Terminal {
    /// Create a terminal for a non-empty literal
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::EmptyTerminal`] if `literal` is empty.
    pub fn new(literal: impl Into<CompactString>) -> Result<Self, GrammarError> {
        let literal = literal.into();
        let first = literal.chars().next().ok_or(GrammarError::EmptyTerminal)?;
        Ok(Self { literal, first })
    }

    #[must_use]
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// First character of the literal
    #[must_use]
    pub const fn first_char(&self) -> char {
        self.first
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.literal.replace('\'', "\\'"))
    }
}

/// Named character class that matches a single input character.
///
/// Two special symbols are equal when their names are equal.
#[derive(Clone)]
pub struct SpecialSymbol {
    name: CompactString,
    predicate: CharPredicate,
}

impl SpecialSymbol {
    /// Create a special symbol from a predicate over the lookahead
    pub fn new<F>(name: impl Into<CompactString>, predicate: F) -> Self
    where
        F: Fn(Option<char>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Create a special symbol from a predicate over actual characters
    pub fn from_char_fn<F>(name: impl Into<CompactString>, predicate: F) -> Self
    where
        F: Fn(char) -> bool + Send + Sync + 'static,
    {
        Self::new(name, move |c| c.is_some_and(&predicate))
    }

    /// Matches any ASCII digit
    #[must_use]
    pub fn digit() -> Self {
        Self::from_char_fn("digit", |c| c.is_ascii_digit())
    }

    /// Matches any alphabetic character
    #[must_use]
    pub fn letter() -> Self {
        Self::from_char_fn("letter", char::is_alphabetic)
    }

    /// Matches any whitespace character
    #[must_use]
    pub fn whitespace() -> Self {
        Self::from_char_fn("whitespace", char::is_whitespace)
    }

    /// Matches any alphanumeric character
    #[must_use]
    pub fn alphanumeric() -> Self {
        Self::from_char_fn("alphanumeric", char::is_alphanumeric)
    }

    /// Matches every character
    #[must_use]
    pub fn any() -> Self {
        Self::new("any", |c| c.is_some())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the symbol accepts this lookahead
    ///
    /// End of input is never accepted: a special symbol always consumes a character.
    #[must_use]
    pub fn matches(&self, lookahead: Option<char>) -> bool {
        lookahead.is_some() && (self.predicate)(lookahead)
    }
}

impl Not for SpecialSymbol {
    type Output = Self;

    fn not(self) -> Self {
        !&self
    }
}

impl Not for &SpecialSymbol {
    type Output = SpecialSymbol;

    fn not(self) -> SpecialSymbol {
        let predicate = Arc::clone(&self.predicate);
        SpecialSymbol {
            name: compact_str::format_compact!("!{}", self.name),
            predicate: Arc::new(move |c| !predicate(c)),
        }
    }
}

impl PartialEq for SpecialSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for SpecialSymbol {}

impl Hash for SpecialSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for SpecialSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpecialSymbol").field(&self.name).finish()
    }
}

impl fmt::Display for SpecialSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Atom of a grammar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Reference to another rule
    NonTerminal(NonTerminal),
    /// Literal text
    Terminal(Terminal),
    /// Character class
    Special(SpecialSymbol),
    /// End of input
    EndOfFile,
}

impl Symbol {
    /// The referenced rule, if this symbol is a non-terminal
    #[must_use]
    pub const fn as_non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Self::NonTerminal(nt) => Some(nt),
            _ => None,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonTerminal(nt) => fmt::Display::fmt(nt, f),
            Self::Terminal(t) => fmt::Display::fmt(t, f),
            Self::Special(s) => fmt::Display::fmt(s, f),
            Self::EndOfFile => f.write_str("EOF"),
        }
    }
}

impl From<NonTerminal> for Symbol {
    fn from(nt: NonTerminal) -> Self {
        Self::NonTerminal(nt)
    }
}

impl From<Terminal> for Symbol {
    fn from(t: Terminal) -> Self {
        Self::Terminal(t)
    }
}

impl From<SpecialSymbol> for Symbol {
    fn from(s: SpecialSymbol) -> Self {
        Self::Special(s)
    }
}

/// Right-hand side of an extended grammar rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    /// A single symbol
    Symbol(Symbol),
    /// All parts in order
    Sequence(Vec<Expression>),
    /// Any one of the variants
    Choice(Vec<Expression>),
    /// Zero or more repetitions
    Repeat(Box<Expression>),
    /// Zero or one occurrence
    Maybe(Box<Expression>),
}

impl Expression {
    /// Create a sequence expression
    pub fn seq<I, E>(parts: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::Sequence(parts.into_iter().map(Into::into).collect())
    }

    /// Create a choice expression
    pub fn choice<I, E>(variants: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::Choice(variants.into_iter().map(Into::into).collect())
    }

    /// Create a repetition `{ inner }`
    pub fn repeat(inner: impl Into<Self>) -> Self {
        Self::Repeat(Box::new(inner.into()))
    }

    /// Create an optional expression `[ inner ]`
    pub fn maybe(inner: impl Into<Self>) -> Self {
        Self::Maybe(Box::new(inner.into()))
    }

    /// End of input
    #[must_use]
    pub const fn eof() -> Self {
        Self::Symbol(Symbol::EndOfFile)
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Self::Symbol(symbol) => fmt::Display::fmt(symbol, f),
            Self::Sequence(parts) => {
                if nested && parts.len() != 1 {
                    f.write_str("( ")?;
                }
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    part.fmt_nested(f, true)?;
                }
                if nested && parts.len() != 1 {
                    f.write_str(" )")?;
                }
                Ok(())
            }
            Self::Choice(variants) => {
                if nested {
                    f.write_str("( ")?;
                }
                for (i, variant) in variants.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    variant.fmt_nested(f, false)?;
                }
                if nested {
                    f.write_str(" )")?;
                }
                Ok(())
            }
            Self::Repeat(inner) => {
                f.write_str("{ ")?;
                inner.fmt_nested(f, false)?;
                f.write_str(" }")
            }
            Self::Maybe(inner) => {
                f.write_str("[ ")?;
                inner.fmt_nested(f, false)?;
                f.write_str(" ]")
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, false)
    }
}

impl From<Symbol> for Expression {
    fn from(symbol: Symbol) -> Self {
        Self::Symbol(symbol)
    }
}

impl From<NonTerminal> for Expression {
    fn from(nt: NonTerminal) -> Self {
        Self::Symbol(nt.into())
    }
}

impl From<&NonTerminal> for Expression {
    fn from(nt: &NonTerminal) -> Self {
        Self::Symbol(nt.clone().into())
    }
}

impl From<Terminal> for Expression {
    fn from(t: Terminal) -> Self {
        Self::Symbol(t.into())
    }
}

impl From<SpecialSymbol> for Expression {
    fn from(s: SpecialSymbol) -> Self {
        Self::Symbol(s.into())
    }
}

impl From<&SpecialSymbol> for Expression {
    fn from(s: &SpecialSymbol) -> Self {
        Self::Symbol(s.clone().into())
    }
}
