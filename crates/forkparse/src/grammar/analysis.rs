//! # Grammar Analysis
//!
//! Metrics describing the shape of a simplified grammar. The maximal number of
//! rules under one non-terminal bounds how many branches a single parsing
//! step can fork into.

use super::simplified::SimplifiedGrammar;

/// Metrics about a grammar's complexity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarMetrics {
    /// Total number of flat rules
    pub rule_count: usize,
    /// Number of non-terminals, synthetic ones included
    pub non_terminal_count: usize,
    /// Number of non-terminals introduced by simplification
    pub synthetic_count: usize,
    /// Number of nullable non-terminals
    pub nullable_count: usize,
    /// Number of epsilon rules
    pub epsilon_rule_count: usize,
    /// Most rules under a single non-terminal
    pub max_alternatives: usize,
    /// Length of the longest rule
    pub max_rule_length: usize,
}

impl GrammarMetrics {
    /// Compute metrics for a grammar
    #[must_use]
    pub fn compute(grammar: &SimplifiedGrammar) -> Self {
        let mut metrics = Self {
            non_terminal_count: grammar.len(),
            ..Self::default()
        };
        for nt in grammar.non_terminals() {
            let rules = grammar.rules(nt).unwrap_or_default();
            metrics.rule_count += rules.len();
            metrics.max_alternatives = metrics.max_alternatives.max(rules.len());
            if grammar.is_synthetic(nt) {
                metrics.synthetic_count += 1;
            }
            if grammar.is_nullable(nt) {
                metrics.nullable_count += 1;
            }
            for rule in rules {
                if rule.is_epsilon() {
                    metrics.epsilon_rule_count += 1;
                }
                metrics.max_rule_length = metrics.max_rule_length.max(rule.len());
            }
        }
        metrics
    }
}

/// Get a summary of grammar characteristics
#[must_use]
pub fn grammar_summary(grammar: &SimplifiedGrammar) -> String {
    let metrics = GrammarMetrics::compute(grammar);
    format!(
        "Grammar summary: {} rules, {} non-terminals ({} synthetic), {} nullable, {} epsilon rules, max {} alternatives, max rule length {}",
        metrics.rule_count,
        metrics.non_terminal_count,
        metrics.synthetic_count,
        metrics.nullable_count,
        metrics.epsilon_rule_count,
        metrics.max_alternatives,
        metrics.max_rule_length
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Expression, Grammar, NonTerminal, Terminal};

    fn grammar() -> SimplifiedGrammar {
        let t = |s: &str| Expression::from(Terminal::new(s).unwrap());
        Grammar::builder()
            .rule(
                NonTerminal::new("Expr"),
                Expression::choice([
                    t("x"),
                    Expression::seq([t("("), NonTerminal::new("Expr").into(), t(")")]),
                    Expression::maybe(t("?")),
                ]),
            )
            .build()
            .unwrap()
            .simplify()
            .unwrap()
    }

    #[test]
    fn test_grammar_metrics() {
        let metrics = GrammarMetrics::compute(&grammar());
        assert_eq!(
            metrics,
            GrammarMetrics {
                rule_count: 5,
                non_terminal_count: 2,
                synthetic_count: 1,
                nullable_count: 2,
                epsilon_rule_count: 1,
                max_alternatives: 3,
                max_rule_length: 3,
            }
        );
    }

    #[test]
    fn test_grammar_summary() {
        let summary = grammar_summary(&grammar());
        assert!(summary.contains("5 rules"));
        assert!(summary.contains("(1 synthetic)"));
    }
}
