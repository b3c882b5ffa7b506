//! # Grammar Module
//!
//! Extended context-free grammars and their flat, analysed form.
//!
//! ## Overview
//!
//! - **Symbols**: [`NonTerminal`], [`Terminal`], [`SpecialSymbol`] and end of file
//! - **Expressions**: sequence, choice, repetition `{ }` and optionality `[ ]`
//! - **Simplification**: [`simplify`] lowers a [`Grammar`] into a
//!   [`SimplifiedGrammar`] of flat rules, computes nullability and FIRST-sets
//!   and rejects left recursion
//! - **FIRST-sets**: [`FirstCharacter`], closed under union
//! - **FOLLOW-sets**: [`FollowSets`] for one start symbol
//! - **Metrics**: [`GrammarMetrics`] and [`grammar_summary`]
//!
//! ## Usage
//!
//! ```rust
//! use forkparse::grammar::{Expression, Grammar, NonTerminal, SpecialSymbol, Terminal};
//!
//! let expr = NonTerminal::new("Expr");
//! let number = NonTerminal::new("Number");
//! let digit = SpecialSymbol::digit();
//!
//! let grammar = Grammar::builder()
//!     .rule(
//!         number.clone(),
//!         Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]),
//!     )
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
//!     .build()?;
//!
//! let simplified = grammar.simplify()?;
//! assert_eq!(simplified.possible_rules(&expr, Some('(')).len(), 1);
//! assert!(simplified.possible_rules(&expr, Some('+')).is_empty());
//! # Ok::<(), forkparse::error::GrammarError>(())
//! ```

mod analysis;
mod builder;
mod expr;
mod first;
mod follow;
mod simplified;
mod simplify;

pub use analysis::{GrammarMetrics, grammar_summary};
pub use builder::{Grammar, GrammarBuilder};
pub use expr::{CharPredicate, Expression, NonTerminal, SpecialSymbol, Symbol, Terminal};
pub use first::{CharSet, FirstCharacter};
pub use follow::FollowSets;
pub use simplified::{SimplifiedGrammar, SimplifiedRule};
pub use simplify::simplify;
