//! Parsing state machine
//!
//! A [`RegularState`] is one parse attempt: a parse tree under construction,
//! a cursor into the input, and the next unconsumed character. Each
//! transition handles the next symbol of the rule at the tree's marker.
//! Expanding a non-terminal with several candidate rules is the only place
//! where an attempt forks.

use crate::ast::{Ast, AstBranch, Leaf, Node};
use crate::automaton::{MachineState, StateKind};
use crate::error::InternalError;
use crate::forkable::{BranchNode, Forkable, ForkableStream, ForkableTree, TreeNode};
use crate::grammar::{FollowSets, NonTerminal, SimplifiedGrammar, SimplifiedRule, Symbol};
use compact_str::CompactString;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// Payload of a parse tree branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchData {
    pub non_terminal: NonTerminal,
    pub rule: SimplifiedRule,
}

/// Payload of a parse tree leaf: the symbol and the text it consumed
///
/// Terminal and end of file leaves keep no text; the text of a terminal is its
/// literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafData {
    pub symbol: Symbol,
    pub value: CompactString,
}

pub type ParseTree = ForkableTree<BranchData, LeafData>;

/// Work done by all branches of one parse
#[derive(Debug, Default)]
pub struct ParseCounters {
    transitions: AtomicUsize,
    forks: AtomicUsize,
}

impl ParseCounters {
    /// Number of transitions applied so far
    #[must_use]
    pub fn transitions(&self) -> usize {
        self.transitions.load(Ordering::Relaxed)
    }

    /// Number of times a parse attempt forked
    #[must_use]
    pub fn forks(&self) -> usize {
        self.forks.load(Ordering::Relaxed)
    }
}

/// State of the parsing automaton
#[derive(Debug)]
pub enum ParsingState {
    /// A parse attempt in progress
    Regular(RegularState),
    /// A finished parse
    Success(RegularState),
    /// A rejected parse attempt
    Failed,
}

impl ParsingState {
    /// Apply one step of the parsing automaton
    ///
    /// Finished states are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an [`InternalError`] if the parse tree is inconsistent.
    pub fn transition(self) -> Result<Vec<Self>, InternalError> {
        match self {
            Self::Regular(state) => state.step(),
            done => Ok(vec![done]),
        }
    }

    /// The tree of a finished parse, `None` for any other state
    ///
    /// # Errors
    ///
    /// Returns an [`InternalError`] if the parse tree is inconsistent.
    pub fn into_ast(self) -> Result<Option<Ast>, InternalError> {
        match self {
            Self::Success(state) => state.to_ast().map(Some),
            Self::Regular(_) | Self::Failed => Ok(None),
        }
    }
}

impl MachineState for ParsingState {
    fn kind(&self) -> StateKind {
        match self {
            Self::Regular(_) => StateKind::Unfinished,
            Self::Success(_) => StateKind::Success,
            Self::Failed => StateKind::Fail,
        }
    }
}

/// One parse attempt
pub struct RegularState {
    grammar: Arc<SimplifiedGrammar>,
    follow: Arc<FollowSets>,
    tree: ParseTree,
    input: ForkableStream<char>,
    lookahead: Option<char>,
    counters: Arc<ParseCounters>,
}

impl RegularState {
    /// Start parsing `input` as `start`
    ///
    /// The tree root is a nameless branch whose only rule is `[start]`.
    /// `follow` must have been computed for `start`.
    ///
    /// # Errors
    ///
    /// Returns an [`InternalError`] if `input` was already forked.
    pub fn new(
        grammar: Arc<SimplifiedGrammar>,
        follow: Arc<FollowSets>,
        start: Symbol,
        mut input: ForkableStream<char>,
        counters: Arc<ParseCounters>,
    ) -> Result<Self, InternalError> {
        let lookahead = input.next()?;
        let tree = ParseTree::branch_tree(BranchData {
            non_terminal: NonTerminal::new(""),
            rule: SimplifiedRule::new([start]),
        });
        Ok(Self {
            grammar,
            follow,
            tree,
            input,
            lookahead,
            counters,
        })
    }

    /// The next unconsumed character, `None` at the end of the input
    #[must_use]
    pub const fn lookahead(&self) -> Option<char> {
        self.lookahead
    }

    #[must_use]
    pub const fn tree(&self) -> &ParseTree {
        &self.tree
    }

    fn step(mut self) -> Result<Vec<ParsingState>, InternalError> {
        self.counters.transitions.fetch_add(1, Ordering::Relaxed);
        let marker = self.tree.marker()?;
        let branch = marker.as_branch().cloned().ok_or(InternalError::MarkerOnLeaf)?;
        let symbols = branch.data().rule.symbols();
        let children = self.tree.child_count(&branch)?;

        if children > symbols.len() {
            return Err(InternalError::ChildOverflow {
                children,
                symbols: symbols.len(),
            });
        }
        if children == symbols.len() {
            return match self.tree.parent(&marker)? {
                Some(parent) => {
                    self.tree.set_marker(TreeNode::Branch(parent))?;
                    Ok(vec![ParsingState::Regular(self)])
                }
                None => Ok(vec![ParsingState::Success(self)]),
            };
        }

        let symbol = &symbols[children];
        match symbol {
            Symbol::EndOfFile => {
                if self.lookahead.is_some() {
                    return Ok(vec![ParsingState::Failed]);
                }
                self.tree.add_leaf_child(&branch, LeafData::new(symbol.clone()))?;
                Ok(vec![ParsingState::Regular(self)])
            }
            Symbol::Special(special) => {
                let Some(value) = self.lookahead.filter(|&c| special.matches(Some(c))) else {
                    return Ok(vec![ParsingState::Failed]);
                };
                let mut text = CompactString::default();
                text.push(value);
                self.tree.add_leaf_child(
                    &branch,
                    LeafData {
                        symbol: symbol.clone(),
                        value: text,
                    },
                )?;
                self.lookahead = self.input.next()?;
                Ok(vec![ParsingState::Regular(self)])
            }
            Symbol::Terminal(terminal) => {
                let mut current = self.lookahead;
                for expected in terminal.literal().chars() {
                    if current != Some(expected) {
                        return Ok(vec![ParsingState::Failed]);
                    }
                    current = self.input.next()?;
                }
                self.tree.add_leaf_child(&branch, LeafData::new(symbol.clone()))?;
                self.lookahead = current;
                Ok(vec![ParsingState::Regular(self)])
            }
            Symbol::NonTerminal(non_terminal) => self.expand(&branch, non_terminal),
        }
    }

    /// Add a branch for every rule of `non_terminal` that fits the lookahead
    ///
    /// The epsilon rule is skipped when the lookahead cannot follow
    /// `non_terminal`.
    fn expand(
        mut self,
        branch: &Arc<BranchNode<BranchData, LeafData>>,
        non_terminal: &NonTerminal,
    ) -> Result<Vec<ParsingState>, InternalError> {
        let mut candidates = self.grammar.possible_rules(non_terminal, self.lookahead);
        if !self.follow.admits(non_terminal, self.lookahead) {
            candidates.retain(|rule| !rule.is_epsilon());
        }
        match candidates.len() {
            0 => Ok(vec![ParsingState::Failed]),
            1 => {
                let rule = candidates.swap_remove(0);
                self.descend(branch, non_terminal, rule)?;
                Ok(vec![ParsingState::Regular(self)])
            }
            count => {
                trace!(%non_terminal, count, lookahead = ?self.lookahead, "fork");
                self.counters.forks.fetch_add(1, Ordering::Relaxed);
                let trees = self.tree.fork(count)?;
                let inputs = self.input.fork(count)?;
                trees
                    .into_iter()
                    .zip(inputs)
                    .zip(candidates)
                    .map(|((tree, input), rule)| {
                        let mut state = Self {
                            grammar: Arc::clone(&self.grammar),
                            follow: Arc::clone(&self.follow),
                            tree,
                            input,
                            lookahead: self.lookahead,
                            counters: Arc::clone(&self.counters),
                        };
                        state.descend(branch, non_terminal, rule)?;
                        Ok(ParsingState::Regular(state))
                    })
                    .collect()
            }
        }
    }

    fn descend(
        &mut self,
        branch: &Arc<BranchNode<BranchData, LeafData>>,
        non_terminal: &NonTerminal,
        rule: SimplifiedRule,
    ) -> Result<(), InternalError> {
        let child = self.tree.add_branch_child(
            branch,
            BranchData {
                non_terminal: non_terminal.clone(),
                rule,
            },
        )?;
        self.tree.set_marker(TreeNode::Branch(child))?;
        Ok(())
    }

    /// Convert the parse tree, starting at the root's first child
    fn to_ast(&self) -> Result<Ast, InternalError> {
        let root = self.tree.root()?;
        let Some(root) = root.as_branch() else {
            return Err(InternalError::MarkerOnLeaf);
        };
        let first = self.tree.children(root)?.into_iter().next();
        let node = match first {
            Some(node) => self.convert(node)?,
            None => Node::Leaf(Leaf::Empty),
        };
        Ok(Ast::new(node))
    }

    /// Convert a subtree without recursion; right-recursive rules nest once
    /// per input character.
    fn convert(&self, mut node: TreeNode<BranchData, LeafData>) -> Result<Node, InternalError> {
        let mut frames: Vec<Frame> = Vec::new();
        loop {
            let mut done = loop {
                match node {
                    TreeNode::Leaf(leaf) => break Node::Leaf(leaf.data().to_leaf()?),
                    TreeNode::Branch(branch) => {
                        let mut pending = self.tree.children(&branch)?.into_iter();
                        let Some(first) = pending.next() else {
                            break Node::Leaf(Leaf::Empty);
                        };
                        frames.push(Frame {
                            converted: Vec::with_capacity(pending.len() + 1),
                            branch,
                            pending,
                        });
                        node = first;
                    }
                }
            };
            loop {
                let Some(mut frame) = frames.pop() else {
                    return Ok(done);
                };
                frame.converted.push(done);
                if let Some(sibling) = frame.pending.next() {
                    frames.push(frame);
                    node = sibling;
                    break;
                }
                done = frame.into_node();
            }
        }
    }
}

/// A parse tree branch whose children are being converted
struct Frame {
    branch: Arc<BranchNode<BranchData, LeafData>>,
    pending: std::vec::IntoIter<TreeNode<BranchData, LeafData>>,
    converted: Vec<Node>,
}

impl Frame {
    fn into_node(self) -> Node {
        let data = self.branch.data();
        Node::Branch(AstBranch::new(
            data.non_terminal.clone(),
            data.rule.clone(),
            self.converted,
        ))
    }
}

impl LeafData {
    /// A leaf for `symbol` without captured text
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            value: CompactString::default(),
        }
    }

    fn to_leaf(&self) -> Result<Leaf, InternalError> {
        Ok(match &self.symbol {
            Symbol::Terminal(terminal) => Leaf::Terminal(terminal.clone()),
            Symbol::Special(symbol) => {
                let value = self.value.chars().next().ok_or(InternalError::EmptySpecialLeaf)?;
                Leaf::Special {
                    symbol: symbol.clone(),
                    value,
                }
            }
            Symbol::EndOfFile => Leaf::EndOfFile,
            Symbol::NonTerminal(_) if self.value.is_empty() => Leaf::Empty,
            Symbol::NonTerminal(non_terminal) => Leaf::Compound {
                non_terminal: non_terminal.clone(),
                value: self.value.clone(),
            },
        })
    }
}

impl fmt::Debug for RegularState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegularState")
            .field("tree", &self.tree)
            .field("lookahead", &self.lookahead)
            .finish_non_exhaustive()
    }
}
