//! # Forkable Structures
//!
//! Persistent containers that can split one handle into several independent
//! handles in O(1), sharing everything that was built before the split.
//!
//! ## Overview
//!
//! Every container here implements [`Forkable`]:
//!
//! - [`ForkableStack`]: a linked stack whose prefix is shared between forks
//! - [`ForkableStream`]: a memoized, lazily produced sequence read through
//!   independent cursors
//! - [`ForkableTree`]: a tree whose nodes are shared, while each fork only sees
//!   the children added by itself and its ancestors
//!
//! Forking is the only way to get a second handle. Once [`Forkable::fork`] was
//! called on a handle, the handle is blocked for good and every further
//! operation on it returns [`ForkError::AlreadyForked`]. This single-writer
//! rule is what makes sharing safe: no two live handles can ever write to the
//! same position.
//!
//! ## Example
//!
//! ```rust
//! use forkparse::forkable::{Forkable, ForkableStack};
//! use forkparse::error::ForkError;
//!
//! let mut stack = ForkableStack::new();
//! stack.push(1)?;
//!
//! let mut forks = stack.fork(2)?;
//! forks[0].push(2)?;
//!
//! assert_eq!(forks[0].peek()?, Some(&2));
//! assert_eq!(forks[1].peek()?, Some(&1));
//! assert_eq!(stack.peek(), Err(ForkError::AlreadyForked));
//! # Ok::<(), ForkError>(())
//! ```

mod stack;
mod stream;
mod tree;

pub use stack::*;
pub use stream::*;
pub use tree::*;

use crate::error::ForkError;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A handle that can split into several independent handles.
pub trait Forkable: Sized {
    /// Split this handle into `count` independent handles.
    ///
    /// Afterwards this handle is blocked: [`is_blocked`](Self::is_blocked)
    /// returns `true` and every other operation fails.
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was already forked.
    fn fork(&mut self, count: usize) -> Result<Vec<Self>, ForkError>;

    /// Whether [`fork`](Self::fork) was already called on this handle
    fn is_blocked(&self) -> bool;

    /// Fail with [`ForkError::AlreadyForked`] if this handle is blocked
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was already forked.
    #[inline]
    fn ensure_unblocked(&self) -> Result<(), ForkError> {
        if self.is_blocked() {
            Err(ForkError::AlreadyForked)
        } else {
            Ok(())
        }
    }
}

/// Lock a node-local mutex, recovering the data if another branch panicked
/// while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
