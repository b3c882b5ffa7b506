use super::{Automaton, MachineState, StateKind};
use std::fmt;
use tracing::trace;

/// Breadth-first executor running on the calling thread.
///
/// Each step applies the transition to every state of the current generation
/// and concatenates the successors in order. Failed states are dropped; the
/// first successful state in that order ends the run.
pub struct SequentialAutomaton<F> {
    transition: F,
}

impl<F> SequentialAutomaton<F> {
    pub const fn new(transition: F) -> Self {
        Self { transition }
    }
}

impl<S, E, F> Automaton<S, E> for SequentialAutomaton<F>
where
    S: MachineState,
    F: Fn(S) -> Result<Vec<S>, E>,
{
    fn run(&self, start: S) -> Result<Option<S>, E> {
        match start.kind() {
            StateKind::Success => return Ok(Some(start)),
            StateKind::Fail => return Ok(None),
            StateKind::Unfinished => {}
        }
        let mut generation = vec![start];
        let mut depth = 0usize;
        loop {
            let mut next = Vec::with_capacity(generation.len());
            for state in generation {
                for successor in (self.transition)(state)? {
                    match successor.kind() {
                        StateKind::Success => {
                            trace!(depth, "success");
                            return Ok(Some(successor));
                        }
                        StateKind::Fail => {}
                        StateKind::Unfinished => next.push(successor),
                    }
                }
            }
            if next.is_empty() {
                trace!(depth, "all branches failed");
                return Ok(None);
            }
            depth += 1;
            trace!(depth, states = next.len(), "next generation");
            generation = next;
        }
    }
}

impl<F> fmt::Debug for SequentialAutomaton<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialAutomaton").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::convert::Infallible;

    #[derive(Debug, Clone, PartialEq)]
    enum Node {
        Open(&'static str),
        Dead,
        Done(&'static str),
    }

    impl MachineState for Node {
        fn kind(&self) -> StateKind {
            match self {
                Self::Open(_) => StateKind::Unfinished,
                Self::Dead => StateKind::Fail,
                Self::Done(_) => StateKind::Success,
            }
        }
    }

    fn tree(node: Node) -> Result<Vec<Node>, Infallible> {
        Ok(match node {
            Node::Open("root") => vec![Node::Open("a"), Node::Dead, Node::Open("b")],
            Node::Open("a") => vec![Node::Open("a1")],
            Node::Open("b") => vec![Node::Done("b-done"), Node::Done("b-other")],
            Node::Open("a1") => vec![Node::Done("a-deep")],
            _ => vec![Node::Dead],
        })
    }

    #[test]
    fn test_shallowest_success_wins() {
        let automaton = SequentialAutomaton::new(tree);
        let result = automaton.run(Node::Open("root")).unwrap();
        assert_eq!(result, Some(Node::Done("b-done")));
    }

    #[test]
    fn test_all_branches_fail() {
        let automaton = SequentialAutomaton::new(|_: Node| Ok::<_, Infallible>(vec![Node::Dead, Node::Dead]));
        assert_eq!(automaton.run(Node::Open("x")).unwrap(), None);

        let empty = SequentialAutomaton::new(|_: Node| Ok::<_, Infallible>(Vec::new()));
        assert_eq!(empty.run(Node::Open("x")).unwrap(), None);
    }

    #[test]
    fn test_terminal_start_state() {
        let calls = RefCell::new(0);
        let automaton = SequentialAutomaton::new(|node: Node| {
            *calls.borrow_mut() += 1;
            tree(node)
        });
        assert_eq!(automaton.run(Node::Done("now")).unwrap(), Some(Node::Done("now")));
        assert_eq!(automaton.run(Node::Dead).unwrap(), None);
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_transition_error_aborts() {
        let automaton = SequentialAutomaton::new(|node: Node| match node {
            Node::Open("root") => Ok(vec![Node::Open("ok"), Node::Open("bad")]),
            Node::Open("bad") => Err("broken"),
            _ => Ok(vec![Node::Open("ok")]),
        });
        assert_eq!(automaton.run(Node::Open("root")), Err("broken"));
    }
}
