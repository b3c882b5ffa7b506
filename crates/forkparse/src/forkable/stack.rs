//! Forkable stack
//!
//! The stack is a chain of immutable nodes shared via `Arc`. Pushing prepends
//! a node and moves the handle forward, so forking only has to copy the
//! pointer to the current node.

use super::Forkable;
use crate::error::ForkError;
use std::sync::Arc;

#[derive(Debug)]
struct StackNode<T> {
    data: T,
    parent: Option<Arc<StackNode<T>>>,
    depth: usize,
}

impl<T> StackNode<T> {
    fn new(data: T, parent: Option<Arc<Self>>) -> Arc<Self> {
        let depth = parent.as_ref().map_or(1, |p| p.depth + 1);
        Arc::new(Self {
            data,
            parent,
            depth,
        })
    }
}

impl<T> Drop for StackNode<T> {
    // Unlink iteratively so long chains do not overflow the call stack.
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(node) = parent {
            match Arc::into_inner(node) {
                Some(mut node) => parent = node.parent.take(),
                None => break,
            }
        }
    }
}

/// Stack whose handles can be forked in O(1).
///
/// # Examples
///
/// ```
/// use forkparse::forkable::{Forkable, ForkableStack};
///
/// let mut stack = ForkableStack::new();
/// stack.push('a').unwrap();
/// stack.push('b').unwrap();
///
/// let mut forks = stack.fork(2).unwrap();
/// assert_eq!(forks[0].pull().unwrap(), Some('b'));
/// assert_eq!(forks[1].len().unwrap(), 2);
/// assert!(stack.is_blocked());
/// ```
#[derive(Debug)]
pub struct ForkableStack<T> {
    head: Option<Arc<StackNode<T>>>,
    blocked: bool,
}

impl<T> ForkableStack<T> {
    /// Create a new empty stack
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: None,
            blocked: false,
        }
    }

    /// Push an element on top of the stack
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn push(&mut self, element: T) -> Result<(), ForkError> {
        self.ensure_unblocked()?;
        let parent = self.head.take();
        self.head = Some(StackNode::new(element, parent));
        Ok(())
    }

    /// Look at the top element, `None` if the stack is empty
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn peek(&self) -> Result<Option<&T>, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.head.as_ref().map(|node| &node.data))
    }

    /// Get the number of elements on the stack
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn len(&self) -> Result<usize, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.head.as_ref().map_or(0, |node| node.depth))
    }

    /// Check if the stack is empty
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn is_empty(&self) -> Result<bool, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.head.is_none())
    }

    /// Check whether two handles point at the very same node
    ///
    /// Forks of one stack are identical until one of them is modified.
    #[must_use]
    pub fn is_identical(&self, other: &Self) -> bool {
        match (&self.head, &other.head) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: Clone> ForkableStack<T> {
    /// Remove the top element and return it, `None` if the stack is empty
    ///
    /// Other handles sharing the node still see the element.
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn pull(&mut self) -> Result<Option<T>, ForkError> {
        self.ensure_unblocked()?;
        let Some(node) = self.head.take() else {
            return Ok(None);
        };
        let data = node.data.clone();
        self.head.clone_from(&node.parent);
        Ok(Some(data))
    }
}

impl<T> Forkable for ForkableStack<T> {
    fn fork(&mut self, count: usize) -> Result<Vec<Self>, ForkError> {
        self.ensure_unblocked()?;
        let forks = (0..count)
            .map(|_| Self {
                head: self.head.clone(),
                blocked: false,
            })
            .collect();
        self.blocked = true;
        Ok(forks)
    }

    fn is_blocked(&self) -> bool {
        self.blocked
    }
}

impl<T> Default for ForkableStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
