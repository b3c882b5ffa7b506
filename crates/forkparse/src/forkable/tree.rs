//! Forkable tree
//!
//! Branch nodes are canonical and shared by every handle that can reach them.
//! Instead of a single child list, a branch keeps one child list per *owner*:
//! the identity of the tree handle that appended those children. A handle
//! sees the lists written by itself and by every handle in its fork lineage,
//! oldest ancestor first, but never the lists of its siblings.
//!
//! Owners are reference counted. A fork holds its parent owner alive, so the
//! children an ancestor appended stay visible to all of its descendants. Once
//! an owner is unreachable it removes its child lists from every branch it
//! wrote to.
//!
//! Each child list is keyed by its owner's id and depth in the fork lineage.
//! Owners carry skip links laid out as skew-binary jumps, so finding the
//! ancestor at a given depth takes a logarithmic number of steps however long
//! the lineage grows.

use super::{Forkable, lock};
use crate::error::ForkError;
use smallvec::SmallVec;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// Stable identity of a tree handle
pub type OwnerId = u64;

static NEXT_OWNER: AtomicU64 = AtomicU64::new(0);

type ChildLists<B, L> = SmallVec<[(OwnerKey, Vec<TreeNode<B, L>>); 2]>;

/// Position of an owner in the fork lineage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OwnerKey {
    id: OwnerId,
    depth: usize,
}

/// A node of a [`ForkableTree`]
pub enum TreeNode<B, L> {
    /// Inner node with per-owner children
    Branch(Arc<BranchNode<B, L>>),
    /// Terminal node
    Leaf(Arc<LeafNode<B, L>>),
}

impl<B, L> TreeNode<B, L> {
    /// The branch behind this node, if it is one
    #[must_use]
    pub const fn as_branch(&self) -> Option<&Arc<BranchNode<B, L>>> {
        match self {
            Self::Branch(branch) => Some(branch),
            Self::Leaf(_) => None,
        }
    }

    /// The leaf behind this node, if it is one
    #[must_use]
    pub const fn as_leaf(&self) -> Option<&Arc<LeafNode<B, L>>> {
        match self {
            Self::Branch(_) => None,
            Self::Leaf(leaf) => Some(leaf),
        }
    }

    /// Check whether two nodes are the same canonical node
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Branch(a), Self::Branch(b)) => Arc::ptr_eq(a, b),
            (Self::Leaf(a), Self::Leaf(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn parent_link(&self) -> Option<&Weak<BranchNode<B, L>>> {
        match self {
            Self::Branch(branch) => branch.parent.as_ref(),
            Self::Leaf(leaf) => leaf.parent.as_ref(),
        }
    }
}

impl<B, L> Clone for TreeNode<B, L> {
    fn clone(&self) -> Self {
        match self {
            Self::Branch(branch) => Self::Branch(Arc::clone(branch)),
            Self::Leaf(leaf) => Self::Leaf(Arc::clone(leaf)),
        }
    }
}

impl<B: fmt::Debug, L: fmt::Debug> fmt::Debug for TreeNode<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch(branch) => f.debug_tuple("Branch").field(&branch.data).finish(),
            Self::Leaf(leaf) => f.debug_tuple("Leaf").field(&leaf.data).finish(),
        }
    }
}

/// Canonical branch node shared between tree handles
pub struct BranchNode<B, L> {
    data: B,
    parent: Option<Weak<BranchNode<B, L>>>,
    children: Mutex<ChildLists<B, L>>,
}

impl<B, L> BranchNode<B, L> {
    fn new(data: B, parent: Option<Weak<Self>>) -> Arc<Self> {
        Arc::new(Self {
            data,
            parent,
            children: Mutex::new(SmallVec::new()),
        })
    }

    /// The payload of this branch
    #[must_use]
    pub const fn data(&self) -> &B {
        &self.data
    }

    /// Number of owners holding a child list here, visible or not
    #[must_use]
    pub fn owner_count(&self) -> usize {
        lock(&self.children).len()
    }

    fn release(&self, owner: OwnerId) {
        let removed = {
            let mut lists = lock(&self.children);
            lists
                .iter()
                .position(|(key, _)| key.id == owner)
                .map(|index| lists.remove(index))
        };
        // Dropped outside the lock: children may release their own lists.
        drop(removed);
    }
}

impl<B, L> Drop for BranchNode<B, L> {
    fn drop(&mut self) {
        // Subtrees can be as deep as the input; take them apart iteratively.
        let mut pending = take_children(&mut self.children);
        while let Some(node) = pending.pop() {
            if let TreeNode::Branch(branch) = node
                && let Some(mut branch) = Arc::into_inner(branch)
            {
                pending.extend(take_children(&mut branch.children));
            }
        }
    }
}

fn take_children<B, L>(children: &mut Mutex<ChildLists<B, L>>) -> Vec<TreeNode<B, L>> {
    let lists = mem::take(children.get_mut().unwrap_or_else(PoisonError::into_inner));
    lists.into_iter().flat_map(|(_, nodes)| nodes).collect()
}

/// Leaf node of a tree
pub struct LeafNode<B, L> {
    data: L,
    parent: Option<Weak<BranchNode<B, L>>>,
}

impl<B, L> LeafNode<B, L> {
    /// The payload of this leaf
    #[must_use]
    pub const fn data(&self) -> &L {
        &self.data
    }
}

/// Identity of a tree handle and link to the handle it was forked from.
struct Owner<B, L> {
    id: OwnerId,
    depth: usize,
    parent: Option<Arc<Owner<B, L>>>,
    /// Ancestor to jump to when looking further up; `None` at the root
    skip: Option<Weak<Owner<B, L>>>,
    written: Mutex<Vec<Weak<BranchNode<B, L>>>>,
}

impl<B, L> Owner<B, L> {
    fn new(parent: Option<Arc<Self>>) -> Arc<Self> {
        let (depth, skip) = match &parent {
            None => (0, None),
            Some(parent) => {
                let first = parent.skip_target();
                let second = first.skip_target();
                let target = if parent.depth - first.depth == first.depth - second.depth {
                    second
                } else {
                    Arc::clone(parent)
                };
                (parent.depth + 1, Some(Arc::downgrade(&target)))
            }
        };
        Arc::new(Self {
            id: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
            depth,
            parent,
            skip,
            written: Mutex::new(Vec::new()),
        })
    }

    const fn key(&self) -> OwnerKey {
        OwnerKey {
            id: self.id,
            depth: self.depth,
        }
    }

    /// The root skips to itself.
    fn skip_target(self: &Arc<Self>) -> Arc<Self> {
        self.skip
            .as_ref()
            .and_then(Weak::upgrade)
            .unwrap_or_else(|| Arc::clone(self))
    }

    /// The ancestor at `depth`, this owner included
    fn ancestor_at(self: &Arc<Self>, depth: usize) -> Option<Arc<Self>> {
        if depth > self.depth {
            return None;
        }
        let mut current = Arc::clone(self);
        while current.depth > depth {
            let next = match current.skip.as_ref().and_then(Weak::upgrade) {
                Some(skip) if skip.depth >= depth => skip,
                _ => Arc::clone(current.parent.as_ref()?),
            };
            current = next;
        }
        Some(current)
    }

    /// Whether the list keyed by `key` was written by this owner or an ancestor
    fn in_lineage(self: &Arc<Self>, key: OwnerKey) -> bool {
        self.ancestor_at(key.depth)
            .is_some_and(|owner| owner.id == key.id)
    }
}

impl<B, L> Drop for Owner<B, L> {
    fn drop(&mut self) {
        let written = mem::take(
            self.written
                .get_mut()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for node in written {
            if let Some(node) = node.upgrade() {
                node.release(self.id);
            }
        }
        // Unlink the lineage iteratively; deep fork chains are common.
        let mut parent = self.parent.take();
        while let Some(owner) = parent {
            match Arc::into_inner(owner) {
                Some(mut owner) => parent = owner.parent.take(),
                None => break,
            }
        }
    }
}

/// Tree with shared nodes and per-handle visibility of children.
///
/// # Examples
///
/// ```
/// use forkparse::forkable::{Forkable, ForkableTree};
///
/// let mut tree: ForkableTree<&str, char> = ForkableTree::branch_tree("root");
/// let root = tree.root_branch().unwrap().unwrap();
/// tree.add_leaf_child(&root, 'a').unwrap();
///
/// let mut forks = tree.fork(2).unwrap();
/// forks[0].add_leaf_child(&root, 'b').unwrap();
/// forks[1].add_leaf_child(&root, 'c').unwrap();
///
/// let seen = |tree: &ForkableTree<&'static str, char>| -> String {
///     tree.children(&root)
///         .unwrap()
///         .iter()
///         .filter_map(|node| node.as_leaf().map(|leaf| *leaf.data()))
///         .collect()
/// };
/// assert_eq!(seen(&forks[0]), "ab");
/// assert_eq!(seen(&forks[1]), "ac");
/// ```
pub struct ForkableTree<B, L> {
    root: TreeNode<B, L>,
    marker: TreeNode<B, L>,
    owner: Arc<Owner<B, L>>,
    blocked: bool,
}

impl<B, L> ForkableTree<B, L> {
    /// Create a tree whose root is a branch carrying `data`
    #[must_use]
    pub fn branch_tree(data: B) -> Self {
        Self::with_root(TreeNode::Branch(BranchNode::new(data, None)))
    }

    /// Create a tree consisting of a single leaf carrying `data`
    #[must_use]
    pub fn leaf_tree(data: L) -> Self {
        Self::with_root(TreeNode::Leaf(Arc::new(LeafNode { data, parent: None })))
    }

    fn with_root(root: TreeNode<B, L>) -> Self {
        Self {
            marker: root.clone(),
            root,
            owner: Owner::new(None),
            blocked: false,
        }
    }

    /// Identity of this handle
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        self.owner.id
    }

    /// Get the root node
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn root(&self) -> Result<TreeNode<B, L>, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.root.clone())
    }

    /// Get the root node if it is a branch
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn root_branch(&self) -> Result<Option<Arc<BranchNode<B, L>>>, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.root.as_branch().cloned())
    }

    /// Get the marked node; the root unless [`set_marker`](Self::set_marker) was called
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn marker(&self) -> Result<TreeNode<B, L>, ForkError> {
        self.ensure_unblocked()?;
        Ok(self.marker.clone())
    }

    /// Mark a node
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn set_marker(&mut self, node: TreeNode<B, L>) -> Result<(), ForkError> {
        self.ensure_unblocked()?;
        self.marker = node;
        Ok(())
    }

    /// Get the parent of a node, `None` for the root
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn parent(&self, node: &TreeNode<B, L>) -> Result<Option<Arc<BranchNode<B, L>>>, ForkError> {
        self.ensure_unblocked()?;
        Ok(node.parent_link().and_then(Weak::upgrade))
    }

    /// Children of `branch` visible to this handle, in insertion order
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn children(&self, branch: &BranchNode<B, L>) -> Result<Vec<TreeNode<B, L>>, ForkError> {
        self.ensure_unblocked()?;
        let lists = lock(&branch.children);
        Ok(lists
            .iter()
            .filter(|(key, _)| self.owner.in_lineage(*key))
            .flat_map(|(_, children)| children.iter().cloned())
            .collect())
    }

    /// Number of children of `branch` visible to this handle
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn child_count(&self, branch: &BranchNode<B, L>) -> Result<usize, ForkError> {
        self.ensure_unblocked()?;
        let lists = lock(&branch.children);
        Ok(lists
            .iter()
            .filter(|(key, _)| self.owner.in_lineage(*key))
            .map(|(_, children)| children.len())
            .sum())
    }

    /// Append a branch child visible to this handle and its future forks
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn add_branch_child(
        &mut self,
        branch: &Arc<BranchNode<B, L>>,
        data: B,
    ) -> Result<Arc<BranchNode<B, L>>, ForkError> {
        self.ensure_unblocked()?;
        let child = BranchNode::new(data, Some(Arc::downgrade(branch)));
        self.append(branch, TreeNode::Branch(Arc::clone(&child)));
        Ok(child)
    }

    /// Append a leaf child visible to this handle and its future forks
    ///
    /// # Errors
    ///
    /// Returns [`ForkError::AlreadyForked`] if this handle was forked.
    pub fn add_leaf_child(
        &mut self,
        branch: &Arc<BranchNode<B, L>>,
        data: L,
    ) -> Result<Arc<LeafNode<B, L>>, ForkError> {
        self.ensure_unblocked()?;
        let leaf = Arc::new(LeafNode {
            data,
            parent: Some(Arc::downgrade(branch)),
        });
        self.append(branch, TreeNode::Leaf(Arc::clone(&leaf)));
        Ok(leaf)
    }

    fn append(&self, branch: &Arc<BranchNode<B, L>>, child: TreeNode<B, L>) {
        let key = self.owner.key();
        let mut lists = lock(&branch.children);
        if let Some((_, children)) = lists.iter_mut().find(|(owner, _)| *owner == key) {
            children.push(child);
            return;
        }
        lists.push((key, vec![child]));
        drop(lists);
        lock(&self.owner.written).push(Arc::downgrade(branch));
    }
}

impl<B, L> Forkable for ForkableTree<B, L> {
    fn fork(&mut self, count: usize) -> Result<Vec<Self>, ForkError> {
        self.ensure_unblocked()?;
        let forks = (0..count)
            .map(|_| Self {
                root: self.root.clone(),
                marker: self.marker.clone(),
                owner: Owner::new(Some(Arc::clone(&self.owner))),
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

impl<B, L> fmt::Debug for ForkableTree<B, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkableTree")
            .field("owner", &self.owner.id)
            .field("blocked", &self.blocked)
            .finish_non_exhaustive()
    }
}
