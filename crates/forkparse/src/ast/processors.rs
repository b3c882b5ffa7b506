//! # AST Processors
//!
//! Rewriting passes applied to an [`Ast`] after a successful parse.
//!
//! Most passes follow one pattern: select ("tag") some nodes and replace each
//! of them by a list of nodes that is spliced into the parent. [`TaggedSet`]
//! implements that pattern for arbitrary predicates; the standard passes are
//! built on the same traversal:
//!
//! - [`StringifyNonTerminals`]: collapse branches into compound leaves holding
//!   their text
//! - [`UnfoldNonTerminals`]: replace branches by their children
//! - [`RemoveEmpties`]: drop leaves without text and branches without children
//!
//! ## Usage
//!
//! ```rust
//! use forkparse::ast::{Ast, AstBranch, AstProcessor, Leaf, Node, StringifyNonTerminals};
//! use forkparse::grammar::{NonTerminal, SimplifiedRule, Terminal};
//!
//! let word = NonTerminal::new("Word");
//! let leaf = |s: &str| Node::from(Leaf::Terminal(Terminal::new(s).unwrap()));
//! let ast = Ast::new(AstBranch::new(word.clone(), SimplifiedRule::epsilon(), vec![leaf("a"), leaf("b")]).into());
//!
//! let ast = StringifyNonTerminals::new([word]).process(ast);
//! assert_eq!(ast.to_string(), "'ab'\n");
//! ```

use super::{Ast, AstBranch, Leaf, Node, drop_nodes};
use crate::grammar::{NonTerminal, SimplifiedRule};
use compact_str::CompactString;
use hashbrown::HashSet;
use std::fmt;
use std::mem;
use std::vec;

/// A pass over a finished [`Ast`]
pub trait AstProcessor: Send + Sync {
    fn process(&self, ast: Ast) -> Ast;
}

/// Order in which tagged nodes are rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingDirection {
    /// Rewrite a tagged node as a whole, without looking at its descendants
    RootFirst,
    /// Rewrite the children of a node first, then the node itself
    RootLast,
}

type Predicate = Box<dyn Fn(&Node) -> bool + Send + Sync>;
type Rewrite = Box<dyn Fn(Node) -> Vec<Node> + Send + Sync>;

/// Rewrite every node selected by a predicate into a list of nodes.
///
/// The replacement nodes take the place of the tagged node in its parent. If
/// the root is replaced by nothing, the result is a tree consisting of a
/// single [`Leaf::Empty`]; if it is replaced by several nodes, the first one
/// becomes the new root.
pub struct TaggedSet {
    predicate: Predicate,
    rewrite: Rewrite,
    direction: ProcessingDirection,
}

impl TaggedSet {
    pub fn new<P, R>(predicate: P, rewrite: R, direction: ProcessingDirection) -> Self
    where
        P: Fn(&Node) -> bool + Send + Sync + 'static,
        R: Fn(Node) -> Vec<Node> + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
            rewrite: Box::new(rewrite),
            direction,
        }
    }

    /// Tag the branches of the given non-terminals
    pub fn for_non_terminals<I, R>(non_terminals: I, rewrite: R, direction: ProcessingDirection) -> Self
    where
        I: IntoIterator<Item = NonTerminal>,
        R: Fn(Node) -> Vec<Node> + Send + Sync + 'static,
    {
        let tagged: HashSet<NonTerminal> = non_terminals.into_iter().collect();
        Self::new(move |node: &Node| is_branch_of(node, &tagged), rewrite, direction)
    }

    /// Tag the branches expanded with one of the given rules
    pub fn for_rules<I, R>(rules: I, rewrite: R, direction: ProcessingDirection) -> Self
    where
        I: IntoIterator<Item = SimplifiedRule>,
        R: Fn(Node) -> Vec<Node> + Send + Sync + 'static,
    {
        let tagged: HashSet<SimplifiedRule> = rules.into_iter().collect();
        Self::new(
            move |node: &Node| node.as_branch().is_some_and(|branch| tagged.contains(&branch.rule)),
            rewrite,
            direction,
        )
    }

    #[must_use]
    pub const fn direction(&self) -> ProcessingDirection {
        self.direction
    }
}

impl AstProcessor for TaggedSet {
    fn process(&self, ast: Ast) -> Ast {
        rewrite_tree(ast, self.direction, &*self.predicate, &*self.rewrite)
    }
}

impl fmt::Debug for TaggedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedSet")
            .field("direction", &self.direction)
            .finish_non_exhaustive()
    }
}

fn rewrite_tree(
    ast: Ast,
    direction: ProcessingDirection,
    tagged: &dyn Fn(&Node) -> bool,
    rewrite: &dyn Fn(Node) -> Vec<Node>,
) -> Ast {
    let walker = Walker { tagged, rewrite };
    let nodes = match direction {
        ProcessingDirection::RootFirst => walker.root_first(ast.into_root()),
        ProcessingDirection::RootLast => walker.root_last(ast.into_root()),
    };
    Ast::new(nodes.into_iter().next().unwrap_or(Node::Leaf(Leaf::Empty)))
}

struct Walker<'a> {
    tagged: &'a dyn Fn(&Node) -> bool,
    rewrite: &'a dyn Fn(Node) -> Vec<Node>,
}

/// A branch whose children are being rewritten
struct WalkFrame {
    branch: AstBranch,
    pending: vec::IntoIter<Node>,
    done: Vec<Node>,
}

impl WalkFrame {
    fn open(mut branch: AstBranch) -> (Self, Option<Node>) {
        let mut pending = mem::take(&mut branch.children).into_iter();
        let first = pending.next();
        let frame = Self {
            done: Vec::with_capacity(pending.len() + 1),
            branch,
            pending,
        };
        (frame, first)
    }

    fn push(&mut self, mut nodes: Vec<Node>) {
        if self.done.is_empty() {
            self.done = nodes;
        } else {
            self.done.append(&mut nodes);
        }
    }

    fn close(mut self) -> Node {
        self.branch.children = self.done;
        Node::Branch(self.branch)
    }
}

// Both walks keep their own stack of open branches instead of recursing.
impl Walker<'_> {
    fn root_first(&self, mut node: Node) -> Vec<Node> {
        let mut frames: Vec<WalkFrame> = Vec::new();
        loop {
            let mut done = loop {
                if (self.tagged)(&node) {
                    break (self.rewrite)(node);
                }
                match node {
                    Node::Branch(branch) => match WalkFrame::open(branch) {
                        (frame, Some(first)) => {
                            frames.push(frame);
                            node = first;
                        }
                        (frame, None) => break vec![frame.close()],
                    },
                    leaf @ Node::Leaf(_) => break vec![leaf],
                }
            };
            loop {
                let Some(mut frame) = frames.pop() else {
                    return done;
                };
                frame.push(done);
                if let Some(sibling) = frame.pending.next() {
                    frames.push(frame);
                    node = sibling;
                    break;
                }
                done = vec![frame.close()];
            }
        }
    }

    fn root_last(&self, mut node: Node) -> Vec<Node> {
        let mut frames: Vec<WalkFrame> = Vec::new();
        loop {
            let mut done = loop {
                match node {
                    Node::Branch(branch) => match WalkFrame::open(branch) {
                        (frame, Some(first)) => {
                            frames.push(frame);
                            node = first;
                        }
                        (frame, None) => break self.finish(frame.close()),
                    },
                    leaf @ Node::Leaf(_) => break self.finish(leaf),
                }
            };
            loop {
                let Some(mut frame) = frames.pop() else {
                    return done;
                };
                frame.push(done);
                if let Some(sibling) = frame.pending.next() {
                    frames.push(frame);
                    node = sibling;
                    break;
                }
                done = self.finish(frame.close());
            }
        }
    }

    fn finish(&self, node: Node) -> Vec<Node> {
        if (self.tagged)(&node) {
            (self.rewrite)(node)
        } else {
            vec![node]
        }
    }
}

/// Replace every branch selected by `unfolded` by its children, bottom-up.
///
/// Children of an unfolded branch go straight to the nearest kept ancestor,
/// so a chain of unfolded branches is flattened in linear time.
fn unfold_tree(ast: Ast, unfolded: &dyn Fn(&AstBranch) -> bool) -> Ast {
    struct Frame {
        kept: Option<AstBranch>,
        pending: vec::IntoIter<Node>,
    }

    // The first list collects the new roots; every kept branch still open owns one more.
    let mut outputs: Vec<Vec<Node>> = vec![Vec::new()];
    let mut frames: Vec<Frame> = Vec::new();
    let mut next = Some(ast.into_root());
    loop {
        match next.take() {
            Some(Node::Branch(mut branch)) => {
                let pending = mem::take(&mut branch.children).into_iter();
                let kept = if unfolded(&branch) {
                    None
                } else {
                    outputs.push(Vec::with_capacity(pending.len()));
                    Some(branch)
                };
                frames.push(Frame { kept, pending });
            }
            Some(leaf @ Node::Leaf(_)) => {
                if let Some(output) = outputs.last_mut() {
                    output.push(leaf);
                }
            }
            None => {}
        }
        loop {
            let Some(frame) = frames.last_mut() else {
                let roots = outputs.pop().unwrap_or_default();
                return Ast::new(roots.into_iter().next().unwrap_or(Node::Leaf(Leaf::Empty)));
            };
            if let Some(child) = frame.pending.next() {
                next = Some(child);
                break;
            }
            if let Some(Frame {
                kept: Some(mut branch),
                ..
            }) = frames.pop()
            {
                branch.children = outputs.pop().unwrap_or_default();
                if let Some(output) = outputs.last_mut() {
                    output.push(Node::Branch(branch));
                }
            }
        }
    }
}

fn is_branch_of(node: &Node, non_terminals: &HashSet<NonTerminal>) -> bool {
    node.as_branch()
        .is_some_and(|branch| non_terminals.contains(&branch.non_terminal))
}

/// Replace branches of the given non-terminals by a [`Leaf::Compound`] holding their text
#[derive(Debug, Clone, Default)]
pub struct StringifyNonTerminals {
    non_terminals: HashSet<NonTerminal>,
}

impl StringifyNonTerminals {
    pub fn new<I: IntoIterator<Item = NonTerminal>>(non_terminals: I) -> Self {
        Self {
            non_terminals: non_terminals.into_iter().collect(),
        }
    }
}

impl AstProcessor for StringifyNonTerminals {
    fn process(&self, ast: Ast) -> Ast {
        rewrite_tree(
            ast,
            ProcessingDirection::RootFirst,
            &|node: &Node| is_branch_of(node, &self.non_terminals),
            &|node: Node| match node {
                Node::Branch(branch) => {
                    let value = CompactString::from(branch.text());
                    let AstBranch {
                        non_terminal,
                        children,
                        ..
                    } = branch;
                    drop_nodes(children);
                    vec![Node::Leaf(Leaf::Compound {
                        non_terminal,
                        value,
                    })]
                }
                leaf @ Node::Leaf(_) => vec![leaf],
            },
        )
    }
}

/// Splice the children of branches of the given non-terminals into their parents
#[derive(Debug, Clone, Default)]
pub struct UnfoldNonTerminals {
    non_terminals: HashSet<NonTerminal>,
}

impl UnfoldNonTerminals {
    pub fn new<I: IntoIterator<Item = NonTerminal>>(non_terminals: I) -> Self {
        Self {
            non_terminals: non_terminals.into_iter().collect(),
        }
    }

    /// Whether no branch would be unfolded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.non_terminals.is_empty()
    }
}

impl AstProcessor for UnfoldNonTerminals {
    fn process(&self, ast: Ast) -> Ast {
        unfold_tree(ast, &|branch: &AstBranch| {
            self.non_terminals.contains(&branch.non_terminal)
        })
    }
}

/// Drop leaves without text and branches left without children
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveEmpties;

impl AstProcessor for RemoveEmpties {
    fn process(&self, ast: Ast) -> Ast {
        rewrite_tree(
            ast,
            ProcessingDirection::RootLast,
            &|node: &Node| match node {
                Node::Branch(branch) => branch.children.is_empty(),
                Node::Leaf(leaf) => leaf.is_empty(),
            },
            &|_: Node| Vec::new(),
        )
    }
}
