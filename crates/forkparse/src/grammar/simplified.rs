use super::builder::Grammar;
use super::expr::{Expression, NonTerminal, Symbol};
use super::first::FirstCharacter;
use crate::error::GrammarError;
use hashbrown::HashMap;
use std::fmt;
use std::sync::Arc;

/// Flat rule: a plain sequence of symbols, empty for the epsilon rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SimplifiedRule {
    symbols: Arc<[Symbol]>,
}

impl SimplifiedRule {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// The rule deriving the empty string
    #[must_use]
    pub fn epsilon() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[must_use]
    pub fn is_epsilon(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl fmt::Display for SimplifiedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbols.is_empty() {
            return f.write_str("_");
        }
        for (i, symbol) in self.symbols.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            fmt::Display::fmt(symbol, f)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    non_terminal: NonTerminal,
    rules: Vec<SimplifiedRule>,
    rule_firsts: Vec<FirstCharacter>,
    first: FirstCharacter,
    nullable: bool,
    synthetic: bool,
}

/// Grammar of flat rules with nullability and FIRST-sets.
///
/// Immutable once built. Every non-terminal referenced by a rule is defined,
/// and no non-terminal is left recursive.
#[derive(Debug, Clone)]
pub struct SimplifiedGrammar {
    entries: Vec<Entry>,
    index: HashMap<NonTerminal, usize>,
}

impl SimplifiedGrammar {
    /// Build and analyse a grammar from hand-written flat rules
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::DuplicateRule`] if a non-terminal is listed twice,
    /// and the analysis errors of [`simplify`](super::simplify) otherwise.
    pub fn new<I>(rules: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (NonTerminal, Vec<SimplifiedRule>)>,
    {
        Self::analyse(rules.into_iter().map(|(nt, rules)| (nt, rules, false)))
    }

    /// Build the tables and run nullability and FIRST-set analysis.
    pub(crate) fn analyse<I>(rules: I) -> Result<Self, GrammarError>
    where
        I: IntoIterator<Item = (NonTerminal, Vec<SimplifiedRule>, bool)>,
    {
        let mut entries: Vec<Entry> = Vec::new();
        let mut index = HashMap::new();
        for (non_terminal, rules, synthetic) in rules {
            if let Some(previous) = index.insert(non_terminal.clone(), entries.len()) {
                let clash = synthetic || entries.get(previous).is_some_and(|e| e.synthetic);
                return Err(if clash {
                    GrammarError::NameClash(non_terminal)
                } else {
                    GrammarError::DuplicateRule(non_terminal)
                });
            }
            entries.push(Entry {
                non_terminal,
                rules,
                rule_firsts: Vec::new(),
                first: FirstCharacter::empty(),
                nullable: false,
                synthetic,
            });
        }
        let mut grammar = Self { entries, index };
        grammar.check_references()?;
        grammar.compute_nullable();
        grammar.compute_first_sets()?;
        Ok(grammar)
    }

    fn check_references(&self) -> Result<(), GrammarError> {
        let undefined = self
            .entries
            .iter()
            .flat_map(|entry| &entry.rules)
            .flat_map(SimplifiedRule::symbols)
            .filter_map(Symbol::as_non_terminal)
            .find(|nt| !self.index.contains_key(*nt));
        match undefined {
            Some(nt) => Err(GrammarError::MissingRule(nt.clone())),
            None => Ok(()),
        }
    }

    fn position(&self, symbol: &Symbol) -> Option<usize> {
        symbol
            .as_non_terminal()
            .and_then(|nt| self.index.get(nt).copied())
    }

    fn compute_nullable(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for i in 0..self.entries.len() {
                if self.entries[i].nullable {
                    continue;
                }
                let nullable = self.entries[i].rules.iter().any(|rule| {
                    rule.symbols().iter().all(|symbol| {
                        self.position(symbol)
                            .is_some_and(|j| self.entries[j].nullable)
                    })
                });
                if nullable {
                    self.entries[i].nullable = true;
                    changed = true;
                }
            }
        }
    }

    fn compute_first_sets(&mut self) -> Result<(), GrammarError> {
        let mut done: Vec<Option<(Vec<FirstCharacter>, FirstCharacter)>> =
            vec![None; self.entries.len()];
        let mut in_progress = vec![false; self.entries.len()];
        for i in 0..self.entries.len() {
            self.visit(i, &mut in_progress, &mut done)?;
        }
        for (entry, first) in self.entries.iter_mut().zip(done) {
            if let Some((rule_firsts, first)) = first {
                entry.rule_firsts = rule_firsts;
                entry.first = first;
            }
        }
        Ok(())
    }

    fn visit(
        &self,
        i: usize,
        in_progress: &mut [bool],
        done: &mut [Option<(Vec<FirstCharacter>, FirstCharacter)>],
    ) -> Result<(), GrammarError> {
        let entry = &self.entries[i];
        if in_progress[i] {
            return Err(GrammarError::LeftRecursion(entry.non_terminal.clone()));
        }
        if done[i].is_some() {
            return Ok(());
        }
        in_progress[i] = true;
        let mut rule_firsts = Vec::with_capacity(entry.rules.len());
        for rule in &entry.rules {
            let mut first = FirstCharacter::empty();
            for symbol in rule.symbols() {
                match symbol {
                    Symbol::Terminal(terminal) => {
                        first = first + FirstCharacter::from(terminal);
                        break;
                    }
                    Symbol::Special(special) => {
                        first = first + FirstCharacter::from(special);
                        break;
                    }
                    Symbol::EndOfFile => {}
                    Symbol::NonTerminal(nt) => {
                        let j = self
                            .index
                            .get(nt)
                            .copied()
                            .ok_or_else(|| GrammarError::MissingRule(nt.clone()))?;
                        self.visit(j, in_progress, done)?;
                        if let Some((_, nested)) = &done[j] {
                            first = first + nested.clone();
                        }
                        if !self.entries[j].nullable {
                            break;
                        }
                    }
                }
            }
            rule_firsts.push(first);
        }
        let first = rule_firsts.iter().cloned().sum();
        done[i] = Some((rule_firsts, first));
        in_progress[i] = false;
        Ok(())
    }

    fn entry(&self, non_terminal: &NonTerminal) -> Option<&Entry> {
        self.index.get(non_terminal).map(|&i| &self.entries[i])
    }

    /// Rules of `non_terminal` that can start with `lookahead`, in rule order,
    /// followed by the epsilon rule if `non_terminal` is nullable
    #[must_use]
    pub fn possible_rules(
        &self,
        non_terminal: &NonTerminal,
        lookahead: Option<char>,
    ) -> Vec<SimplifiedRule> {
        let Some(entry) = self.entry(non_terminal) else {
            return Vec::new();
        };
        let mut rules: Vec<_> = entry
            .rules
            .iter()
            .zip(&entry.rule_firsts)
            .filter(|(_, first)| first.admits(lookahead))
            .map(|(rule, _)| rule.clone())
            .collect();
        if entry.nullable {
            rules.push(SimplifiedRule::epsilon());
        }
        rules
    }

    #[must_use]
    pub fn rules(&self, non_terminal: &NonTerminal) -> Option<&[SimplifiedRule]> {
        self.entry(non_terminal).map(|entry| entry.rules.as_slice())
    }

    #[must_use]
    pub fn first_set(&self, non_terminal: &NonTerminal) -> Option<&FirstCharacter> {
        self.entry(non_terminal).map(|entry| &entry.first)
    }

    /// FIRST-set of each rule of `non_terminal`, parallel to [`rules`](Self::rules)
    #[must_use]
    pub fn rule_first_sets(&self, non_terminal: &NonTerminal) -> Option<&[FirstCharacter]> {
        self.entry(non_terminal)
            .map(|entry| entry.rule_firsts.as_slice())
    }

    #[must_use]
    pub fn is_nullable(&self, non_terminal: &NonTerminal) -> bool {
        self.entry(non_terminal).is_some_and(|entry| entry.nullable)
    }

    #[must_use]
    pub fn contains(&self, non_terminal: &NonTerminal) -> bool {
        self.index.contains_key(non_terminal)
    }

    /// Whether `non_terminal` was introduced by simplification
    #[must_use]
    pub fn is_synthetic(&self, non_terminal: &NonTerminal) -> bool {
        self.entry(non_terminal).is_some_and(|entry| entry.synthetic)
    }

    pub fn non_terminals(&self) -> impl ExactSizeIterator<Item = &NonTerminal> {
        self.entries.iter().map(|entry| &entry.non_terminal)
    }

    pub fn synthetic_non_terminals(&self) -> impl Iterator<Item = &NonTerminal> {
        self.entries
            .iter()
            .filter(|entry| entry.synthetic)
            .map(|entry| &entry.non_terminal)
    }

    /// All rules as `(non_terminal, rule)` pairs
    pub fn all_rules(&self) -> impl Iterator<Item = (&NonTerminal, &SimplifiedRule)> {
        self.entries
            .iter()
            .flat_map(|entry| entry.rules.iter().map(move |rule| (&entry.non_terminal, rule)))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert back into an extended grammar of `Choice(Sequence(..))` rules
    #[must_use]
    pub fn to_grammar(&self) -> Grammar {
        Grammar::from_unique(
            self.entries
                .iter()
                .map(|entry| {
                    let variants = entry
                        .rules
                        .iter()
                        .map(|rule| Expression::seq(rule.symbols().iter().cloned()))
                        .collect();
                    (entry.non_terminal.clone(), Expression::Choice(variants))
                })
                .collect(),
        )
    }
}

impl fmt::Display for SimplifiedGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (nt, rule) in self.all_rules() {
            writeln!(f, "{nt} = {rule}")?;
        }
        Ok(())
    }
}
