//! Lowering of extended grammars into flat rules
//!
//! Every top-level rule is lowered independently. Sub-expressions that are
//! not plain symbols are moved into synthetic non-terminals named
//! `{parent}_{i}`, where `i` counts the names minted under that parent.

use super::builder::Grammar;
use super::expr::{Expression, NonTerminal, Symbol};
use super::simplified::{SimplifiedGrammar, SimplifiedRule};
use crate::error::GrammarError;
use compact_str::format_compact;
use hashbrown::HashMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Flat rules produced from one top-level rule; the first target is the
/// top-level non-terminal, the rest are synthetic.
#[derive(Debug, Default)]
struct Lowering {
    targets: Vec<(NonTerminal, Vec<SimplifiedRule>)>,
    slots: HashMap<NonTerminal, usize>,
    counters: HashMap<NonTerminal, usize>,
}

impl Lowering {
    fn run(non_terminal: &NonTerminal, expression: &Expression) -> Self {
        let mut lowering = Self::default();
        lowering.slot(non_terminal);
        lowering.lower(non_terminal, expression);
        lowering
    }

    fn slot(&mut self, non_terminal: &NonTerminal) -> usize {
        if let Some(&slot) = self.slots.get(non_terminal) {
            return slot;
        }
        let slot = self.targets.len();
        self.targets.push((non_terminal.clone(), Vec::new()));
        self.slots.insert(non_terminal.clone(), slot);
        slot
    }

    fn emit(&mut self, target: &NonTerminal, rule: SimplifiedRule) {
        let slot = self.slot(target);
        self.targets[slot].1.push(rule);
    }

    fn fresh(&mut self, parent: &NonTerminal) -> NonTerminal {
        let counter = self.counters.entry(parent.clone()).or_default();
        let name = NonTerminal::new(format_compact!("{parent}_{counter}"));
        *counter += 1;
        self.slot(&name);
        name
    }

    fn lower(&mut self, target: &NonTerminal, expression: &Expression) {
        match expression {
            Expression::Symbol(symbol) => {
                self.emit(target, SimplifiedRule::new([symbol.clone()]));
            }
            Expression::Choice(variants) => {
                for variant in variants {
                    if matches!(variant, Expression::Repeat(_) | Expression::Maybe(_)) {
                        let fresh = self.fresh(target);
                        self.lower(&fresh, variant);
                        self.emit(target, SimplifiedRule::new([fresh]));
                    } else {
                        self.lower(target, variant);
                    }
                }
            }
            Expression::Repeat(inner) => {
                let looped = Expression::Sequence(vec![(**inner).clone(), target.into()]);
                self.lower(target, &looped);
                self.emit(target, SimplifiedRule::epsilon());
            }
            Expression::Maybe(inner) => {
                self.lower(target, inner);
                self.emit(target, SimplifiedRule::epsilon());
            }
            Expression::Sequence(parts) => {
                let mut symbols: Vec<Symbol> = Vec::with_capacity(parts.len());
                for part in parts {
                    if let Expression::Symbol(symbol) = part {
                        symbols.push(symbol.clone());
                    } else {
                        let fresh = self.fresh(target);
                        self.lower(&fresh, part);
                        symbols.push(fresh.into());
                    }
                }
                self.emit(target, SimplifiedRule::new(symbols));
            }
        }
    }
}

/// Lower an extended grammar into flat rules and analyse the result.
///
/// The result contains the rules of every non-terminal of `grammar` in
/// grammar order, each followed by the synthetic non-terminals created
/// while lowering it.
///
/// # Errors
///
/// - [`GrammarError::MissingRule`] if a rule references an undefined non-terminal
/// - [`GrammarError::LeftRecursion`] if a non-terminal can derive itself
///   without consuming input
/// - [`GrammarError::NameClash`] if a synthetic name is already used by the grammar
///
/// # Example
///
/// ```rust
/// use forkparse::grammar::{simplify, Expression, Grammar, NonTerminal, Terminal};
///
/// let list = NonTerminal::new("List");
/// let grammar = Grammar::builder()
///     .rule(list.clone(), Expression::repeat(Terminal::new("a")?))
///     .build()?;
///
/// let simplified = simplify(&grammar)?;
/// assert_eq!(simplified.to_string(), "List = 'a' List\nList = _\n");
/// assert!(simplified.is_nullable(&list));
/// # Ok::<(), forkparse::error::GrammarError>(())
/// ```
pub fn simplify(grammar: &Grammar) -> Result<SimplifiedGrammar, GrammarError> {
    let pairs: Vec<_> = grammar.rules().collect();

    #[cfg(feature = "parallel")]
    let lowered: Vec<Lowering> = pairs
        .par_iter()
        .map(|(nt, expr)| Lowering::run(nt, expr))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let lowered: Vec<Lowering> = pairs
        .iter()
        .map(|(nt, expr)| Lowering::run(nt, expr))
        .collect();

    let mut rules = Vec::new();
    for lowering in lowered {
        for (i, (nt, nt_rules)) in lowering.targets.into_iter().enumerate() {
            let synthetic = i > 0;
            if synthetic && grammar.contains(&nt) {
                return Err(GrammarError::NameClash(nt));
            }
            rules.push((nt, nt_rules, synthetic));
        }
    }
    let simplified = SimplifiedGrammar::analyse(rules)?;
    tracing::debug!(
        rules = grammar.len(),
        non_terminals = simplified.len(),
        "simplified grammar"
    );
    Ok(simplified)
}
