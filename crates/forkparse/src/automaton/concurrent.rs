use super::{Automaton, MachineState, StateKind};
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{trace, warn};

/// Message from a branch to the coordinator
enum Report<S, E> {
    /// The reporting branch handed off to this many additional branches
    Started(usize),
    /// The reporting branch ended without a successor
    Failed,
    /// A successful state was found
    Succeeded(S),
    /// The transition function failed
    Aborted(E),
}

/// Executor running every branch as a task on a rayon thread pool.
///
/// A coordinator on the calling thread consumes the reports of all branches
/// and keeps the number of live branches. The run ends with the first
/// success, when no branch is left, or when a transition fails. Branches
/// that have not started by then are skipped.
///
/// Among several successful states, whichever is reported first wins.
pub struct ConcurrentAutomaton<F> {
    transition: F,
    pool: Option<ThreadPool>,
}

impl<F> ConcurrentAutomaton<F> {
    /// Create an executor with its own pool of `threads` workers
    ///
    /// With `threads == 0`, or if the pool cannot be created, branches run on
    /// rayon's global pool.
    pub fn new(transition: F, threads: usize) -> Self {
        let pool = if threads == 0 {
            None
        } else {
            ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("forkparse-branch-{i}"))
                .build()
                .inspect_err(|error| warn!(%error, threads, "falling back to the global thread pool"))
                .ok()
        };
        Self { transition, pool }
    }

    /// Number of worker threads branches run on
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or_else(rayon::current_num_threads, ThreadPool::current_num_threads)
    }

    fn in_scope<'scope, R>(&self, op: impl FnOnce(&Scope<'scope>) -> R) -> R {
        match &self.pool {
            Some(pool) => pool.in_place_scope(op),
            None => rayon::in_place_scope(op),
        }
    }
}

impl<S, E, F> Automaton<S, E> for ConcurrentAutomaton<F>
where
    S: MachineState + Send,
    E: Send,
    F: Fn(S) -> Result<Vec<S>, E> + Sync,
{
    fn run(&self, start: S) -> Result<Option<S>, E> {
        match start.kind() {
            StateKind::Success => return Ok(Some(start)),
            StateKind::Fail => return Ok(None),
            StateKind::Unfinished => {}
        }
        let (reports, inbox) = mpsc::channel();
        let cancelled = AtomicBool::new(false);
        let branches = Branches {
            transition: &self.transition,
            cancelled: &cancelled,
        };
        self.in_scope(|scope| {
            scope.spawn(move |scope| branches.explore(scope, start, reports));
            let outcome = coordinate(&inbox);
            cancelled.store(true, Ordering::Release);
            outcome
        })
    }
}

/// Consume reports until the run is decided.
fn coordinate<S, E>(inbox: &Receiver<Report<S, E>>) -> Result<Option<S>, E> {
    let mut active = 1usize;
    for report in inbox {
        match report {
            Report::Started(count) => active += count,
            Report::Failed => {
                active = active.saturating_sub(1);
                if active == 0 {
                    trace!("all branches failed");
                    return Ok(None);
                }
            }
            Report::Succeeded(state) => {
                trace!(active, "success reported");
                return Ok(Some(state));
            }
            Report::Aborted(error) => return Err(error),
        }
    }
    // Every sender is gone: the remaining branches unwound.
    Ok(None)
}

/// Shared context of the branches of one run
struct Branches<'a, F> {
    transition: &'a F,
    cancelled: &'a AtomicBool,
}

impl<F> Clone for Branches<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F> Copy for Branches<'_, F> {}

impl<'a, F> Branches<'a, F> {
    /// Follow one branch; forks are spawned as new tasks while this task
    /// continues with the first successor.
    fn explore<S, E>(self, scope: &Scope<'a>, start: S, reports: Sender<Report<S, E>>)
    where
        S: MachineState + Send + 'a,
        E: Send + 'a,
        F: Fn(S) -> Result<Vec<S>, E> + Sync,
    {
        let mut state = start;
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                return;
            }
            let successors = match (self.transition)(state) {
                Ok(successors) => successors,
                Err(error) => {
                    let _ = reports.send(Report::Aborted(error));
                    return;
                }
            };
            let mut pending = Vec::with_capacity(successors.len());
            for successor in successors {
                match successor.kind() {
                    StateKind::Success => {
                        let _ = reports.send(Report::Succeeded(successor));
                        return;
                    }
                    StateKind::Fail => {}
                    StateKind::Unfinished => pending.push(successor),
                }
            }
            let mut pending = pending.into_iter();
            let Some(first) = pending.next() else {
                let _ = reports.send(Report::Failed);
                return;
            };
            if pending.len() > 0 {
                let _ = reports.send(Report::Started(pending.len()));
                for successor in pending {
                    let reports = reports.clone();
                    scope.spawn(move |scope| self.explore(scope, successor, reports));
                }
            }
            state = first;
        }
    }
}

impl<F> fmt::Debug for ConcurrentAutomaton<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcurrentAutomaton")
            .field("threads", &self.threads())
            .finish_non_exhaustive()
    }
}
