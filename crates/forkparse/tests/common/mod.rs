//! Grammars shared by the integration tests

#![allow(dead_code)]

use forkparse::ast::{RemoveEmpties, StringifyNonTerminals};
use forkparse::grammar::{Expression, Grammar, NonTerminal, SpecialSymbol, Terminal};
use forkparse::{ExecutionStrategy, Node, Parser};

pub fn t(literal: &str) -> Expression {
    Terminal::new(literal).unwrap().into()
}

pub fn nt(name: &str) -> NonTerminal {
    NonTerminal::new(name)
}

/// Sums of numbers in parentheses with optional whitespace:
///
/// ```text
/// Number = digit {digit}
/// Spaces = {whitespace}
/// Expr   = Number | '(' Spaces Expr Spaces {'+' Spaces Expr} Spaces ')'
/// Main   = Expr EOF
/// ```
pub fn arithmetic() -> Grammar {
    let digit = SpecialSymbol::digit();
    Grammar::builder()
        .rule(nt("Number"), Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]))
        .rule(nt("Spaces"), Expression::repeat(SpecialSymbol::whitespace()))
        .rule(
            nt("Expr"),
            Expression::choice([
                nt("Number").into(),
                Expression::seq([
                    t("("),
                    nt("Spaces").into(),
                    nt("Expr").into(),
                    nt("Spaces").into(),
                    Expression::repeat(Expression::seq([t("+"), nt("Spaces").into(), nt("Expr").into()])),
                    nt("Spaces").into(),
                    t(")"),
                ]),
            ]),
        )
        .rule(nt("Main"), Expression::seq([nt("Expr").into(), Expression::eof()]))
        .build()
        .unwrap()
}

/// Whitespace-free sums with exactly one parse per sentence:
///
/// ```text
/// Number = digit {digit}
/// Expr   = Number | '(' Expr '+' Expr ')'
/// Main   = Expr EOF
/// ```
pub fn strict_arithmetic() -> Grammar {
    let digit = SpecialSymbol::digit();
    Grammar::builder()
        .rule(nt("Number"), Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]))
        .rule(
            nt("Expr"),
            Expression::choice([
                nt("Number").into(),
                Expression::seq([t("("), nt("Expr").into(), t("+"), nt("Expr").into(), t(")")]),
            ]),
        )
        .rule(nt("Main"), Expression::seq([nt("Expr").into(), Expression::eof()]))
        .build()
        .unwrap()
}

/// Parser for `grammar` from `Main` that drops empty nodes and collapses numbers
pub fn number_parser(grammar: Grammar, strategy: ExecutionStrategy) -> Parser {
    Parser::builder(grammar, nt("Main"))
        .strategy(strategy)
        .processor(RemoveEmpties)
        .processor(StringifyNonTerminals::new([nt("Number")]))
        .build()
        .unwrap()
}

/// Values of all compound leaves, in document order
pub fn compounds(node: &Node) -> Vec<String> {
    let mut found = Vec::new();
    collect_compounds(node, &mut found);
    found
}

fn collect_compounds(node: &Node, found: &mut Vec<String>) {
    match node {
        Node::Branch(branch) => {
            for child in &branch.children {
                collect_compounds(child, found);
            }
        }
        Node::Leaf(forkparse::Leaf::Compound { value, .. }) => found.push(value.to_string()),
        Node::Leaf(_) => {}
    }
}
