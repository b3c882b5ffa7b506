//! # forkparse
//!
//! A backtracking top-down parser for context-free grammars extended with
//! repetition, optionality and choice.
//!
//! ## Overview
//!
//! Instead of restricting grammars to LL(1), forkparse explores every
//! alternative that is consistent with the next input character and drops
//! the ones that run into a mismatch:
//!
//! - **Grammar simplification**: extended grammars are lowered into flat
//!   rules with nullability and FIRST-sets; left recursion is rejected up front
//! - **Forkable structures**: parse attempts share their parse tree and input
//!   through persistent handles, so branching costs O(1)
//! - **Nondeterministic automata**: attempts advance either generation by
//!   generation on one thread or as tasks on a thread pool
//! - **AST processing**: the winning parse tree is turned into an [`Ast`]
//!   and rewritten by configurable passes
//!
//! ## Quick Start
//!
//! ```rust
//! use forkparse::grammar::{Expression, Grammar, NonTerminal, SpecialSymbol, Terminal};
//! use forkparse::{ExecutionStrategy, Parser};
//!
//! let digit = SpecialSymbol::digit();
//! let number = NonTerminal::new("Number");
//! let expr = NonTerminal::new("Expr");
//! let main = NonTerminal::new("Main");
//!
//! // Expr = Number | '(' Expr '+' Expr ')'
//! let grammar = Grammar::builder()
//!     .rule(number.clone(), Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]))
//!     .rule(
//!         expr.clone(),
//!         Expression::choice([
//!             Expression::from(&number),
//!             Expression::seq([
//!                 Terminal::new("(")?.into(),
//!                 Expression::from(&expr),
//!                 Terminal::new("+")?.into(),
//!                 Expression::from(&expr),
//!                 Terminal::new(")")?.into(),
//!             ]),
//!         ]),
//!     )
//!     .rule(main.clone(), Expression::seq([Expression::from(&expr), Expression::eof()]))
//!     .build()?;
//!
//! let parser = Parser::builder(grammar, main)
//!     .strategy(ExecutionStrategy::Sequential)
//!     .build()?;
//!
//! let ast = parser.parse_str("(1+2)")?.expect("valid input");
//! assert_eq!(ast.text(), "(1+2)");
//! assert!(parser.parse_str("(1+2")?.is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`grammar`] - Extended grammars, simplification and FIRST-sets
//! - [`forkable`] - Persistent stack, stream and tree handles
//! - [`automaton`] - Sequential and concurrent nondeterministic executors
//! - [`parser`] - The parsing state machine and [`Parser`]
//! - [`ast`] - Syntax trees and post-processing passes
//! - [`config`] - Parser configuration
//! - [`error`] - Error types
//!
//! ## Features
//!
//! - `parallel` (default): concurrent executor and parallel simplification via rayon
//! - `serialize`: serde support for configuration and names
//! - `diagnostics`: miette diagnostics for error types

pub mod ast;
pub mod automaton;
pub mod config;
pub mod error;
pub mod forkable;
pub mod grammar;
pub mod parser;

// Re-export commonly used types
pub use ast::{Ast, AstProcessor, Leaf, Node};
pub use config::{ExecutionStrategy, ParserConfig};
pub use error::{ForkError, GrammarError, InternalError, ParseError};
pub use grammar::{
    Expression, FollowSets, Grammar, GrammarBuilder, NonTerminal, SimplifiedGrammar,
    SimplifiedRule, SpecialSymbol, Symbol, Terminal,
};
pub use parser::{ParseStats, Parser, ParserBuilder};
