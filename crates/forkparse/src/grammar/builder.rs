use super::expr::{Expression, NonTerminal};
use super::simplified::SimplifiedGrammar;
use crate::error::GrammarError;
use hashbrown::HashMap;
use std::fmt;

/// Extended grammar: one expression per non-terminal.
///
/// Rules keep the order in which they were added, which makes simplification
/// and rendering deterministic.
///
/// # Example
///
/// ```rust
/// use forkparse::grammar::{Expression, Grammar, NonTerminal, SpecialSymbol};
///
/// let number = NonTerminal::new("Number");
/// let grammar = Grammar::builder()
///     .rule(
///         number.clone(),
///         Expression::seq([
///             Expression::from(SpecialSymbol::digit()),
///             Expression::repeat(SpecialSymbol::digit()),
///         ]),
///     )
///     .build()?;
///
/// assert!(grammar.contains(&number));
/// assert_eq!(grammar.to_string(), "Number = digit { digit }\n");
/// # Ok::<(), forkparse::error::GrammarError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    rules: Vec<(NonTerminal, Expression)>,
    index: HashMap<NonTerminal, usize>,
}

impl Grammar {
    #[must_use]
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    #[must_use]
    pub fn get(&self, non_terminal: &NonTerminal) -> Option<&Expression> {
        self.index.get(non_terminal).map(|&i| &self.rules[i].1)
    }

    #[must_use]
    pub fn contains(&self, non_terminal: &NonTerminal) -> bool {
        self.index.contains_key(non_terminal)
    }

    /// Rules in insertion order
    pub fn rules(&self) -> impl ExactSizeIterator<Item = (&NonTerminal, &Expression)> {
        self.rules.iter().map(|(nt, expr)| (nt, expr))
    }

    pub fn non_terminals(&self) -> impl ExactSizeIterator<Item = &NonTerminal> {
        self.rules.iter().map(|(nt, _)| nt)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Lower this grammar into flat rules and analyse it
    ///
    /// # Errors
    ///
    /// See [`simplify`](super::simplify).
    pub fn simplify(&self) -> Result<SimplifiedGrammar, GrammarError> {
        super::simplify(self)
    }

    pub(crate) fn from_unique(rules: Vec<(NonTerminal, Expression)>) -> Self {
        let index = rules
            .iter()
            .enumerate()
            .map(|(i, (nt, _))| (nt.clone(), i))
            .collect();
        Self { rules, index }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (nt, expr) in &self.rules {
            writeln!(f, "{nt} = {expr}")?;
        }
        Ok(())
    }
}

/// Builder for [`Grammar`]
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<(NonTerminal, Expression)>,
}

impl GrammarBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the rule `non_terminal = expression`
    #[must_use]
    pub fn rule(mut self, non_terminal: NonTerminal, expression: impl Into<Expression>) -> Self {
        self.rules.push((non_terminal, expression.into()));
        self
    }

    /// Build the grammar
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::DuplicateRule`] if a non-terminal was given two rules.
    pub fn build(self) -> Result<Grammar, GrammarError> {
        let mut index = HashMap::with_capacity(self.rules.len());
        for (i, (nt, _)) in self.rules.iter().enumerate() {
            if index.insert(nt.clone(), i).is_some() {
                return Err(GrammarError::DuplicateRule(nt.clone()));
            }
        }
        Ok(Grammar {
            rules: self.rules,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Terminal;

    #[test]
    fn test_duplicate_rule_rejected() {
        let a = NonTerminal::new("A");
        let result = Grammar::builder()
            .rule(a.clone(), Terminal::new("x").unwrap())
            .rule(a.clone(), Terminal::new("y").unwrap())
            .build();
        assert_eq!(result.unwrap_err(), GrammarError::DuplicateRule(a));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let names = ["Zeta", "Alpha", "Mid"];
        let grammar = names
            .iter()
            .fold(Grammar::builder(), |builder, name| {
                builder.rule(NonTerminal::new(*name), Expression::eof())
            })
            .build()
            .unwrap();
        let order: Vec<_> = grammar.non_terminals().map(NonTerminal::name).collect();
        assert_eq!(order, names);
        assert_eq!(grammar.len(), 3);
        assert_eq!(grammar.get(&NonTerminal::new("Mid")), Some(&Expression::eof()));
        assert!(grammar.get(&NonTerminal::new("Other")).is_none());
    }
}
