//! # Parser Module
//!
//! Backtracking top-down parsing of a simplified grammar.
//!
//! ## Overview
//!
//! A [`Parser`] runs the parsing state machine ([`ParsingState`]) on one of
//! the [`automaton`](crate::automaton) executors. Every parse attempt owns a
//! forkable parse tree and a forkable cursor into the input. When the next
//! non-terminal can be expanded by several rules whose FIRST-sets admit the
//! lookahead, the attempt forks into one attempt per rule; attempts that run
//! into a mismatch are dropped. The first attempt to complete the start
//! symbol wins; its parse tree becomes an [`Ast`], which then goes through the
//! configured [`AstProcessor`]s in order.
//!
//! Rejected input is not an error: the `parse_*` operations return `Ok(None)`.
//!
//! ## Usage
//!
//! ```rust
//! use forkparse::grammar::{Expression, Grammar, NonTerminal, SpecialSymbol};
//! use forkparse::ast::{RemoveEmpties, StringifyNonTerminals};
//! use forkparse::Parser;
//!
//! let digit = SpecialSymbol::digit();
//! let number = NonTerminal::new("Number");
//! let main = NonTerminal::new("Main");
//! let grammar = Grammar::builder()
//!     .rule(number.clone(), Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]))
//!     .rule(main.clone(), Expression::seq([Expression::from(&number), Expression::eof()]))
//!     .build()?;
//!
//! let parser = Parser::builder(grammar, main)
//!     .processor(RemoveEmpties)
//!     .processor(StringifyNonTerminals::new([number]))
//!     .build()?;
//!
//! let ast = parser.parse_str("42")?.expect("accepted");
//! assert_eq!(ast.to_string(), "Main\n|'42'\n");
//! assert!(parser.parse_str("4a")?.is_none());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod source;
mod state;

pub use source::{SourceError, reader_stream, str_stream};
pub use state::{BranchData, LeafData, ParseCounters, ParseTree, ParsingState, RegularState};

use crate::ast::{Ast, AstProcessor, UnfoldNonTerminals};
#[cfg(feature = "parallel")]
use crate::automaton::ConcurrentAutomaton;
use crate::automaton::{Automaton, SequentialAutomaton};
use crate::config::{ExecutionStrategy, ParserConfig};
use crate::error::{GrammarError, InternalError, ParseError};
use crate::forkable::ForkableStream;
use crate::grammar::{FollowSets, Grammar, SimplifiedGrammar, Symbol, simplify};
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

type Transition = fn(ParsingState) -> Result<Vec<ParsingState>, InternalError>;

/// The executor a parser was built with
enum Executor {
    Sequential(SequentialAutomaton<Transition>),
    #[cfg(feature = "parallel")]
    Concurrent(ConcurrentAutomaton<Transition>),
}

impl Executor {
    fn new(strategy: ExecutionStrategy) -> Self {
        let transition: Transition = ParsingState::transition;
        match strategy {
            ExecutionStrategy::Sequential => Self::Sequential(SequentialAutomaton::new(transition)),
            #[cfg(feature = "parallel")]
            ExecutionStrategy::Concurrent { threads } => {
                Self::Concurrent(ConcurrentAutomaton::new(transition, threads))
            }
            #[cfg(not(feature = "parallel"))]
            ExecutionStrategy::Concurrent { .. } => {
                tracing::warn!("concurrent execution needs the `parallel` feature, running sequentially");
                Self::Sequential(SequentialAutomaton::new(transition))
            }
        }
    }

    fn run(&self, start: ParsingState) -> Result<Option<ParsingState>, InternalError> {
        match self {
            Self::Sequential(automaton) => automaton.run(start),
            #[cfg(feature = "parallel")]
            Self::Concurrent(automaton) => automaton.run(start),
        }
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::Sequential(_) => "sequential",
            #[cfg(feature = "parallel")]
            Self::Concurrent(_) => "concurrent",
        }
    }
}

/// Figures about one parse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseStats {
    /// Transitions applied across all attempts
    pub transitions: usize,
    /// Number of times an attempt forked
    pub forks: usize,
    /// Wall-clock time of the parse, processors included
    pub elapsed: Duration,
    /// Whether the input was accepted
    pub accepted: bool,
}

/// A parser for one grammar and start symbol.
///
/// Build it with [`Parser::builder`] or [`Parser::from_simplified`]. A parser
/// is immutable and can be shared between threads; every `parse_*` call is an
/// independent run.
pub struct Parser {
    grammar: Arc<SimplifiedGrammar>,
    follow: Arc<FollowSets>,
    start: Symbol,
    config: ParserConfig,
    processors: Vec<Box<dyn AstProcessor>>,
    executor: Executor,
}

impl Parser {
    /// Start building a parser for an extended grammar
    pub fn builder(grammar: Grammar, start: impl Into<Symbol>) -> ParserBuilder {
        ParserBuilder::new(GrammarSource::Extended(grammar), start.into())
    }

    /// Start building a parser for an already simplified grammar
    pub fn from_simplified(
        grammar: impl Into<Arc<SimplifiedGrammar>>,
        start: impl Into<Symbol>,
    ) -> ParserBuilder {
        ParserBuilder::new(GrammarSource::Simplified(grammar.into()), start.into())
    }

    #[must_use]
    pub fn grammar(&self) -> &SimplifiedGrammar {
        &self.grammar
    }

    #[must_use]
    pub const fn start(&self) -> &Symbol {
        &self.start
    }

    #[must_use]
    pub const fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a string
    ///
    /// Returns `Ok(None)` if the grammar rejects the input.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Internal`] if a parser invariant is broken.
    pub fn parse_str(&self, input: &str) -> Result<Option<Ast>, ParseError> {
        self.parse_with_stats(input).map(|(ast, _)| ast)
    }

    /// Parse a string and report what the parse cost
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Internal`] if a parser invariant is broken.
    pub fn parse_with_stats(&self, input: &str) -> Result<(Option<Ast>, ParseStats), ParseError> {
        self.run(str_stream(input), None)
    }

    /// Parse a sequence of characters
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Internal`] if a parser invariant is broken.
    pub fn parse_chars<I>(&self, input: I) -> Result<Option<Ast>, ParseError>
    where
        I: IntoIterator<Item = char>,
        I::IntoIter: Send + 'static,
    {
        self.run(ForkableStream::from_iter(input), None)
            .map(|(ast, _)| ast)
    }

    /// Parse UTF-8 text from a reader
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Source`] if reading fails,
    /// [`ParseError::InvalidUtf8`] for malformed input, and
    /// [`ParseError::Internal`] if a parser invariant is broken.
    pub fn parse_reader<R>(&self, reader: R) -> Result<Option<Ast>, ParseError>
    where
        R: Read + Send + 'static,
    {
        let (stream, error) = reader_stream(reader);
        self.run(stream, Some(&error)).map(|(ast, _)| ast)
    }

    fn run(
        &self,
        input: ForkableStream<char>,
        source_error: Option<&SourceError>,
    ) -> Result<(Option<Ast>, ParseStats), ParseError> {
        let started = Instant::now();
        let counters = Arc::new(ParseCounters::default());
        debug!(strategy = self.executor.name(), start = %self.start, "parse started");

        let initial = RegularState::new(
            Arc::clone(&self.grammar),
            Arc::clone(&self.follow),
            self.start.clone(),
            input,
            Arc::clone(&counters),
        )?;
        let outcome = self.executor.run(ParsingState::Regular(initial))?;
        if let Some(error) = source_error.and_then(SourceError::take) {
            return Err(error);
        }
        let ast = match outcome {
            Some(state) => state.into_ast()?,
            None => None,
        };
        let ast = ast.map(|ast| {
            self.processors
                .iter()
                .fold(ast, |ast, processor| processor.process(ast))
        });

        let stats = ParseStats {
            transitions: counters.transitions(),
            forks: counters.forks(),
            elapsed: started.elapsed(),
            accepted: ast.is_some(),
        };
        debug!(
            strategy = self.executor.name(),
            accepted = stats.accepted,
            transitions = stats.transitions,
            forks = stats.forks,
            elapsed = ?stats.elapsed,
            "parse finished"
        );
        Ok((ast, stats))
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("start", &self.start)
            .field("config", &self.config)
            .field("rules", &self.grammar.all_rules().count())
            .field("processors", &self.processors.len())
            .finish_non_exhaustive()
    }
}

enum GrammarSource {
    Extended(Grammar),
    Simplified(Arc<SimplifiedGrammar>),
}

/// Builder for [`Parser`]
pub struct ParserBuilder {
    source: GrammarSource,
    start: Symbol,
    config: ParserConfig,
    processors: Vec<Box<dyn AstProcessor>>,
}

impl ParserBuilder {
    fn new(source: GrammarSource, start: Symbol) -> Self {
        Self {
            source,
            start,
            config: ParserConfig::default(),
            processors: Vec::new(),
        }
    }

    /// Replace the configuration
    #[must_use]
    pub fn config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the execution strategy
    #[must_use]
    pub const fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Append a processor; processors run in the order they were added
    #[must_use]
    pub fn processor(mut self, processor: impl AstProcessor + 'static) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Simplify the grammar and build the parser
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] if the grammar cannot be simplified or the
    /// start symbol is a non-terminal without rules.
    pub fn build(self) -> Result<Parser, GrammarError> {
        let grammar = match self.source {
            GrammarSource::Extended(grammar) => Arc::new(simplify(&grammar)?),
            GrammarSource::Simplified(grammar) => grammar,
        };
        if let Symbol::NonTerminal(start) = &self.start
            && !grammar.contains(start)
        {
            return Err(GrammarError::MissingRule(start.clone()));
        }

        let mut processors: Vec<Box<dyn AstProcessor>> = Vec::with_capacity(self.processors.len() + 1);
        if self.config.unfold_synthetic {
            let unfold = UnfoldNonTerminals::new(grammar.synthetic_non_terminals().cloned());
            if !unfold.is_empty() {
                processors.push(Box::new(unfold));
            }
        }
        processors.extend(self.processors);

        debug!(
            non_terminals = grammar.len(),
            rules = grammar.all_rules().count(),
            synthetic = grammar.synthetic_non_terminals().count(),
            processors = processors.len(),
            strategy = ?self.config.strategy,
            "parser built"
        );
        Ok(Parser {
            executor: Executor::new(self.config.strategy),
            follow: Arc::new(FollowSets::compute(&grammar, &self.start)),
            grammar,
            start: self.start,
            config: self.config,
            processors,
        })
    }
}

impl fmt::Debug for ParserBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserBuilder")
            .field("start", &self.start)
            .field("config", &self.config)
            .field("processors", &self.processors.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{RemoveEmpties, StringifyNonTerminals};
    use crate::grammar::{Expression, NonTerminal, SimplifiedRule, SpecialSymbol, Terminal};

    fn t(literal: &str) -> Expression {
        Terminal::new(literal).unwrap().into()
    }

    fn number_grammar() -> (Grammar, NonTerminal, NonTerminal) {
        let digit = SpecialSymbol::digit();
        let number = NonTerminal::new("Number");
        let main = NonTerminal::new("Main");
        let grammar = Grammar::builder()
            .rule(number.clone(), Expression::seq([Expression::from(&digit), Expression::repeat(&digit)]))
            .rule(main.clone(), Expression::seq([Expression::from(&number), Expression::eof()]))
            .build()
            .unwrap();
        (grammar, number, main)
    }

    #[test]
    fn test_parse_number() {
        let (grammar, number, main) = number_grammar();
        let parser = Parser::builder(grammar, main)
            .processor(RemoveEmpties)
            .processor(StringifyNonTerminals::new([number]))
            .build()
            .unwrap();
        let ast = parser.parse_str("42").unwrap().unwrap();
        assert_eq!(ast.to_string(), "Main\n|'42'\n");
        assert!(parser.parse_str("4a").unwrap().is_none());
        assert!(parser.parse_str("").unwrap().is_none());
    }

    #[test]
    fn test_synthetic_branches_are_unfolded() {
        let (grammar, _, main) = number_grammar();
        let parser = Parser::builder(grammar.clone(), main.clone()).build().unwrap();
        let ast = parser.parse_str("123").unwrap().unwrap();
        assert_eq!(ast.to_string(), "Main\n|Number\n||'1'\n||'2'\n||'3'\n||''\n|''\n");

        let raw = Parser::builder(grammar, main)
            .config(ParserConfig::new().with_unfold_synthetic(false))
            .build()
            .unwrap();
        let ast = raw.parse_str("1").unwrap().unwrap();
        assert_eq!(ast.to_string(), "Main\n|Number\n||'1'\n||''\n|''\n");
    }

    #[test]
    fn test_missing_start_rule() {
        let (grammar, _, _) = number_grammar();
        let error = Parser::builder(grammar, NonTerminal::new("Nope")).build().unwrap_err();
        assert_eq!(error, GrammarError::MissingRule(NonTerminal::new("Nope")));
    }

    #[test]
    fn test_grammar_errors_surface_at_build() {
        let x = NonTerminal::new("X");
        let grammar = Grammar::builder()
            .rule(x.clone(), Expression::seq([Expression::from(&x), t("a")]))
            .build()
            .unwrap();
        assert_eq!(
            Parser::builder(grammar, x.clone()).build().unwrap_err(),
            GrammarError::LeftRecursion(x)
        );
    }

    #[test]
    fn test_terminal_start_symbol() {
        let grammar = SimplifiedGrammar::new(Vec::<(NonTerminal, Vec<SimplifiedRule>)>::new()).unwrap();
        let parser = Parser::from_simplified(grammar, Terminal::new("ok").unwrap()).build().unwrap();
        assert_eq!(parser.parse_str("ok").unwrap().unwrap().to_string(), "'ok'\n");
        assert!(parser.parse_str("no").unwrap().is_none());
    }

    #[test]
    fn test_parse_sources() {
        let (grammar, _, main) = number_grammar();
        let parser = Parser::builder(grammar, main).build().unwrap();
        assert!(parser.parse_chars("2024".chars().collect::<Vec<_>>()).unwrap().is_some());
        assert!(parser.parse_reader(std::io::Cursor::new(b"77".to_vec())).unwrap().is_some());
        let error = parser
            .parse_reader(std::io::Cursor::new(vec![b'7', 0xc3]))
            .unwrap_err();
        assert!(matches!(error, ParseError::InvalidUtf8 { .. }));
    }

    #[test]
    fn test_stats() {
        let (grammar, number, main) = number_grammar();
        // Anything may follow the start symbol, so each further digit forks.
        let parser = Parser::builder(grammar.clone(), number).build().unwrap();
        let (ast, stats) = parser.parse_with_stats("12").unwrap();
        assert!(ast.is_some());
        assert!(stats.accepted);
        assert_eq!(stats.forks, 1);
        assert!(stats.transitions > stats.forks);

        // Only the end of input follows the repetition in `Main`.
        let parser = Parser::builder(grammar, main).build().unwrap();
        let (ast, stats) = parser.parse_with_stats("12").unwrap();
        assert!(ast.is_some());
        assert_eq!(stats.forks, 0);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_concurrent_strategy() {
        let (grammar, number, main) = number_grammar();
        let parser = Parser::builder(grammar, main)
            .strategy(ExecutionStrategy::Concurrent { threads: 2 })
            .processor(RemoveEmpties)
            .processor(StringifyNonTerminals::new([number]))
            .build()
            .unwrap();
        assert_eq!(parser.parse_str("905").unwrap().unwrap().to_string(), "Main\n|'905'\n");
        assert!(parser.parse_str("9x").unwrap().is_none());
    }
}
