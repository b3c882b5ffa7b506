//! # Nondeterministic Automata
//!
//! Generic executors for state machines whose transition function may branch
//! into any number of successor states.
//!
//! ## Overview
//!
//! A state reports its [`StateKind`]. The transition maps an unfinished state
//! to its successors: none, one, or many. An executor keeps applying the
//! transition until a successful state shows up or every branch failed.
//!
//! - [`SequentialAutomaton`]: advances all live states one generation at a
//!   time on the calling thread; the shallowest success wins
//! - [`ConcurrentAutomaton`]: runs every branch as a task on a rayon thread
//!   pool and stops at the first success reported (feature `parallel`)
//!
//! Both implement [`Automaton`], so callers can swap strategies freely.
//!
//! ## Usage
//!
//! ```rust
//! use forkparse::automaton::{Automaton, MachineState, SequentialAutomaton, StateKind};
//! use std::convert::Infallible;
//!
//! // Search for a sum of 3s and 5s equal to 11.
//! #[derive(Debug)]
//! struct Sum(u32);
//!
//! impl MachineState for Sum {
//!     fn kind(&self) -> StateKind {
//!         match self.0 {
//!             11 => StateKind::Success,
//!             n if n > 11 => StateKind::Fail,
//!             _ => StateKind::Unfinished,
//!         }
//!     }
//! }
//!
//! let automaton = SequentialAutomaton::new(|Sum(n)| Ok::<_, Infallible>(vec![Sum(n + 3), Sum(n + 5)]));
//! let found = automaton.run(Sum(0)).unwrap();
//! assert_eq!(found.map(|Sum(n)| n), Some(11));
//! ```

mod sequential;
pub use sequential::SequentialAutomaton;

#[cfg(feature = "parallel")]
mod concurrent;
#[cfg(feature = "parallel")]
pub use concurrent::ConcurrentAutomaton;

/// Classification of an automaton state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// The state has successors still to be computed
    Unfinished,
    /// Dead end
    Fail,
    /// Accepting state
    Success,
}

/// A state of a nondeterministic automaton
pub trait MachineState {
    fn kind(&self) -> StateKind;
}

/// Executor driving a state machine from a start state to success or exhaustion.
///
/// The transition function may fail with `E`; an error aborts the whole run.
pub trait Automaton<S: MachineState, E> {
    /// Run the machine and return a successful state, `None` if every branch failed
    ///
    /// # Errors
    ///
    /// Returns the first error raised by the transition function.
    fn run(&self, start: S) -> Result<Option<S>, E>;
}
