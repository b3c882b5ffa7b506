//! # Error Types
//!
//! Error types for grammar construction, forkable handles, and parsing.
//!
//! ## Overview
//!
//! Errors fall into four groups:
//!
//! - **Construction errors**: an empty [`Terminal`](crate::grammar::Terminal) literal
//!   or a duplicated rule ([`GrammarError`])
//! - **Grammar analysis errors**: left recursion, references to undefined
//!   non-terminals, synthetic name clashes ([`GrammarError`])
//! - **Handle misuse**: touching a forkable handle after it was forked ([`ForkError`])
//! - **Internal invariants**: a broken parse tree inside the state machine ([`InternalError`])
//!
//! Grammar errors surface when a parser is assembled, before any input is read.
//! Rejected input is *not* an error: [`Parser::parse_str`](crate::Parser::parse_str)
//! returns `Ok(None)` for it. [`ParseError`] only covers a failing character
//! source and internal invariant violations.
//!
//! ## Usage
//!
//! ```rust
//! use forkparse::error::GrammarError;
//! use forkparse::grammar::Terminal;
//!
//! assert_eq!(Terminal::new("").unwrap_err(), GrammarError::EmptyTerminal);
//! ```
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors derive
//! [`miette::Diagnostic`] with stable error codes.

use crate::grammar::NonTerminal;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Errors raised while building or analysing a grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error("Empty terminals are not allowed")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::empty_terminal)))]
    EmptyTerminal,

    #[error("Left recursion found when checking non-terminal {0}")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::left_recursion),
            help("rewrite the rule with Repeat or Maybe so that input is consumed first")
        )
    )]
    LeftRecursion(NonTerminal),

    #[error("No rule found for non-terminal {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::missing_rule)))]
    MissingRule(NonTerminal),

    #[error("Duplicate rule for non-terminal {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::duplicate_rule)))]
    DuplicateRule(NonTerminal),

    #[error("Synthetic non-terminal {0} clashes with a rule of the same name")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::name_clash),
            help("names of the form `<rule>_<n>` are reserved for generated rules")
        )
    )]
    NameClash(NonTerminal),
}

impl GrammarError {
    /// The non-terminal this error is about, if any
    #[must_use]
    pub const fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Self::EmptyTerminal => None,
            Self::LeftRecursion(nt)
            | Self::MissingRule(nt)
            | Self::DuplicateRule(nt)
            | Self::NameClash(nt) => Some(nt),
        }
    }
}

/// Misuse of a forkable handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ForkError {
    #[error("Cannot use a forkable handle after it was forked")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(forkable::already_forked)))]
    AlreadyForked,
}

/// Broken invariants of the parsing state machine.
///
/// These always indicate a bug in the parser itself, never a problem with the
/// grammar or the input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum InternalError {
    #[error("Parse tree marker points at a leaf")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(internal::marker_on_leaf)))]
    MarkerOnLeaf,

    #[error("Branch has {children} children but its rule only has {symbols} symbols")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(internal::child_overflow)))]
    ChildOverflow { children: usize, symbols: usize },

    #[error("Special symbol leaf without a captured character")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(internal::empty_special_leaf)))]
    EmptySpecialLeaf,

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(internal::fork)))]
    Fork(#[from] ForkError),
}

/// Errors returned by the `parse_*` operations of [`Parser`](crate::Parser).
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    #[error("Failed to read input: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::source)))]
    Source(#[from] std::io::Error),

    #[error("Input is not valid UTF-8: {bytes:02x?}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::invalid_utf8)))]
    InvalidUtf8 { bytes: Vec<u8> },

    #[error("Internal parser error: {0}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::internal)))]
    Internal(#[from] InternalError),
}

impl ParseError {
    /// Whether this error comes from a broken parser invariant rather than the input source
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

impl From<ForkError> for ParseError {
    fn from(error: ForkError) -> Self {
        Self::Internal(InternalError::Fork(error))
    }
}
