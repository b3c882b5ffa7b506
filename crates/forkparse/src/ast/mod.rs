//! # Abstract Syntax Trees
//!
//! Immutable trees produced by a successful parse.
//!
//! ## Overview
//!
//! - [`Ast`]: owns the root [`Node`]
//! - [`AstBranch`]: a node derived from a [`NonTerminal`] by one of its rules
//! - [`Leaf`]: matched terminals, captured characters, end of file, empty
//!   leaves and leaves collapsed from whole subtrees
//!
//! Concatenating the text of all leaves from left to right gives back the
//! input that was consumed, see [`Node::text`].
//!
//! The [`Display`](std::fmt::Display) form prints one node per line. Each line
//! starts with one `|` per level of depth; branches show their non-terminal,
//! leaves their quoted text:
//!
//! ```text
//! Main
//! |Number
//! ||'4'
//! ||'2'
//! |''
//! ```
//!
//! Trees are rewritten after parsing by the [`processors`] module.

pub mod processors;

pub use processors::{
    AstProcessor, ProcessingDirection, RemoveEmpties, StringifyNonTerminals, TaggedSet,
    UnfoldNonTerminals,
};

use crate::grammar::{NonTerminal, SimplifiedRule, SpecialSymbol, Terminal};
use compact_str::CompactString;
use std::fmt::{self, Write};
use std::mem;

/// Parse result: a tree with a single root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast {
    root: Node,
}

impl Ast {
    #[must_use]
    pub const fn new(root: Node) -> Self {
        Self { root }
    }

    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    #[must_use]
    pub fn into_root(mut self) -> Node {
        mem::replace(&mut self.root, Node::Leaf(Leaf::Empty))
    }

    /// Text of all leaves, left to right
    #[must_use]
    pub fn text(&self) -> String {
        self.root.text()
    }
}

impl From<Node> for Ast {
    fn from(root: Node) -> Self {
        Self::new(root)
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.render(f)
    }
}

impl Drop for Ast {
    fn drop(&mut self) {
        if let Node::Branch(branch) = &mut self.root {
            drop_nodes(mem::take(&mut branch.children));
        }
    }
}

/// Drop a forest without recursing into deep branches
pub(crate) fn drop_nodes(nodes: Vec<Node>) {
    let mut pending = nodes;
    while let Some(node) = pending.pop() {
        if let Node::Branch(mut branch) = node {
            pending.append(&mut branch.children);
        }
    }
}

/// A node of an [`Ast`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Branch(AstBranch),
    Leaf(Leaf),
}

impl Node {
    /// Text of all leaves below this node, left to right
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            match node {
                Self::Branch(branch) => pending.extend(branch.children.iter().rev()),
                Self::Leaf(leaf) => leaf.push_text(out),
            }
        }
    }

    #[must_use]
    pub const fn as_branch(&self) -> Option<&AstBranch> {
        match self {
            Self::Branch(branch) => Some(branch),
            Self::Leaf(_) => None,
        }
    }

    #[must_use]
    pub const fn as_leaf(&self) -> Option<&Leaf> {
        match self {
            Self::Branch(_) => None,
            Self::Leaf(leaf) => Some(leaf),
        }
    }

    /// The non-terminal of a branch or a compound leaf
    #[must_use]
    pub const fn non_terminal(&self) -> Option<&NonTerminal> {
        match self {
            Self::Branch(branch) => Some(&branch.non_terminal),
            Self::Leaf(Leaf::Compound { non_terminal, .. }) => Some(non_terminal),
            Self::Leaf(_) => None,
        }
    }

    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![(self, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            for _ in 0..depth {
                f.write_char('|')?;
            }
            match node {
                Self::Branch(branch) => {
                    writeln!(f, "{}", branch.non_terminal)?;
                    pending.extend(branch.children.iter().rev().map(|child| (child, depth + 1)));
                }
                Self::Leaf(leaf) => writeln!(f, "'{}'", leaf.text())?,
            }
        }
        Ok(())
    }
}

impl From<AstBranch> for Node {
    fn from(branch: AstBranch) -> Self {
        Self::Branch(branch)
    }
}

impl From<Leaf> for Node {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

/// Inner node: a non-terminal and the rule it was expanded with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstBranch {
    pub non_terminal: NonTerminal,
    pub rule: SimplifiedRule,
    pub children: Vec<Node>,
}

impl AstBranch {
    #[must_use]
    pub const fn new(non_terminal: NonTerminal, rule: SimplifiedRule, children: Vec<Node>) -> Self {
        Self {
            non_terminal,
            rule,
            children,
        }
    }

    /// Text of all leaves below this branch, left to right
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = String::new();
        for child in &self.children {
            child.collect_text(&mut text);
        }
        text
    }
}

/// Leaf of an [`Ast`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leaf {
    /// A matched terminal; its text is the literal
    Terminal(Terminal),
    /// A character accepted by a special symbol
    Special { symbol: SpecialSymbol, value: char },
    /// The end of the input
    EndOfFile,
    /// Placeholder without text, e.g. for an epsilon rule
    Empty,
    /// A subtree collapsed into its text
    Compound {
        non_terminal: NonTerminal,
        value: CompactString,
    },
}

impl Leaf {
    /// Text this leaf stands for
    #[must_use]
    pub fn text(&self) -> CompactString {
        let mut text = String::new();
        self.push_text(&mut text);
        text.into()
    }

    /// Whether the leaf has no text
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Terminal(_) | Self::Special { .. } => false,
            Self::EndOfFile | Self::Empty => true,
            Self::Compound { value, .. } => value.is_empty(),
        }
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Self::Terminal(terminal) => out.push_str(terminal.literal()),
            Self::Special { value, .. } => out.push(*value),
            Self::EndOfFile | Self::Empty => {}
            Self::Compound { value, .. } => out.push_str(value),
        }
    }
}
