//! Forkable stream
//!
//! Elements are pulled from a generator closure and memoized in a forward
//! linked chain of fixed-size chunks. A handle is a cursor `(chunk, index)`;
//! forks are cursors at the same position. Each chunk computes its successor
//! at most once, no matter how many cursors ask for it concurrently.

use super::{Forkable, lock};
use crate::error::ForkError;
use smallvec::SmallVec;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

/// Number of elements stored per chunk
pub const CHUNK_SIZE: usize = 10;

type Producer<T> = Box<dyn FnMut() -> Option<T> + Send>;

struct Source<T> {
    producer: Producer<T>,
    exhausted: bool,
}

impl<T> Source<T> {
    fn produce(&mut self) -> Option<T> {
        if self.exhausted {
            return None;
        }
        let item = (self.producer)();
        self.exhausted = item.is_none();
        item
    }
}

struct Chunk<T> {
    items: SmallVec<[Option<T>; CHUNK_SIZE]>,
    next: OnceLock<Arc<Chunk<T>>>,
}

impl<T> Chunk<T> {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            items: SmallVec::new(),
            next: OnceLock::new(),
        })
    }

    fn next_chunk(&self, source: &Mutex<Source<T>>) -> Arc<Self> {
        self.next
            .get_or_init(|| {
                let mut source = lock(source);
                let items = (0..CHUNK_SIZE).map(|_| source.produce()).collect();
                Arc::new(Self {
                    items,
                    next: OnceLock::new(),
                })
            })
            .clone()
    }
}

impl<T> Drop for Chunk<T> {
    // Unlink iteratively so long inputs do not overflow the call stack.
    fn drop(&mut self) {
        let mut next = self.next.take();
        while let Some(chunk) = next {
            match Arc::into_inner(chunk) {
                Some(mut chunk) => next = chunk.next.take(),
                None => break,
            }
        }
    }
}

/// Lazily produced sequence whose cursors can be forked.
///
/// Reading through one handle never changes what another handle reads: all
/// handles observe the same memoized sequence, each from its own position.
///
/// # Examples
///
/// ```
/// use forkparse::forkable::{Forkable, ForkableStream};
///
/// let mut stream = ForkableStream::from_iter("abc".chars());
/// assert_eq!(stream.next().unwrap(), Some('a'));
///
/// let mut forks = stream.fork(2).unwrap();
/// assert_eq!(forks[0].next().unwrap(), Some('b'));
/// assert_eq!(forks[0].next().unwrap(), Some('c'));
/// assert_eq!(forks[0].next().unwrap(), None);
/// assert_eq!(forks[1].next().unwrap(), Some('b'));
/// ```
pub struct ForkableStream<T> {
    chunk: Arc<Chunk<T>>,
    index: usize,
    position: usize,
    source: Arc<Mutex<Source<T>>>,
    blocked: bool,
}

impl<T> ForkableStream<T> {
    /// Create a stream over the values returned by `producer`
    ///
    /// `None` marks the end of the stream; the producer is not called again
    /// after it returned `None`.
    pub fn new<F>(producer: F) -> Self
    where
        F: FnMut() -> Option<T> + Send + 'static,
    {
        Self {
            chunk: Chunk::empty(),
            index: 0,
            position: 0,
            source: Arc::new(Mutex::new(Source {
                producer: Box::new(producer),
                exhausted: false,
            })),
            blocked: false,
        }
    }

    /// Create a stream over the items of an iterator
    #[allow(clippy::should_implement_trait)]
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        let mut iter = iter.into_iter();
        Self::new(move || iter.next())
    }

    /// Number of elements this handle has consumed so far
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn position(&self) -> Result<usize, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.position)
    }
}

impl<T: Clone> ForkableStream<T> {
    /// Advance the cursor and return the element, `None` past the end
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn next(&mut self) -> Result<Option<T>, ForkError> {
        self.ensure_unblocked()?;
        if self.index >= self.chunk.items.len() {
            self.chunk = self.chunk.next_chunk(&self.source);
            self.index = 0;
        }
        let item = self.chunk.items.get(self.index).cloned().flatten();
        self.index += 1;
        if item.is_some() {
            self.position += 1;
        }
        Ok(item)
    }
}

impl<T> Forkable for ForkableStream<T> {
    fn fork(&mut self, count: usize) -> Result<Vec<Self>, ForkError> {
        self.ensure_unblocked()?;
        let forks = (0..count)
            .map(|_| Self {
                chunk: Arc::clone(&self.chunk),
                index: self.index,
                position: self.position,
                source: Arc::clone(&self.source),
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

impl<T> fmt::Debug for ForkableStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkableStream")
            .field("position", &self.position)
            .field("blocked", &self.blocked)
            .finish_non_exhaustive()
    }
}
