//! Tests for forkable handles shared across threads

use forkparse::error::ForkError;
use forkparse::forkable::{Forkable, ForkableStack, ForkableStream, ForkableTree, TreeNode};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

#[test]
fn test_stack_forks_are_independent_across_threads() {
    let mut stack = ForkableStack::new();
    for i in 0..3 {
        stack.push(i).unwrap();
    }
    let forks = stack.fork(4).unwrap();

    let drained: Vec<Vec<usize>> = thread::scope(|scope| {
        let handles: Vec<_> = forks
            .into_iter()
            .enumerate()
            .map(|(i, mut fork)| {
                scope.spawn(move || {
                    fork.push(100 + i).unwrap();
                    let mut seen = Vec::new();
                    while let Some(value) = fork.pull().unwrap() {
                        seen.push(value);
                    }
                    seen
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (i, seen) in drained.iter().enumerate() {
        assert_eq!(*seen, [100 + i, 2, 1, 0]);
    }
    assert_eq!(stack.push(9), Err(ForkError::AlreadyForked));
}

#[test]
fn test_stream_produces_each_element_once() {
    let produced = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&produced);
    let mut next = 0;
    let mut stream = ForkableStream::new(move || {
        if next == 50 {
            return None;
        }
        counter.fetch_add(1, Ordering::SeqCst);
        next += 1;
        Some(next)
    });
    assert_eq!(stream.next().unwrap(), Some(1));

    let forks = stream.fork(8).unwrap();
    let sums: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = forks
            .into_iter()
            .map(|mut fork| {
                scope.spawn(move || {
                    let mut sum = 0;
                    while let Some(value) = fork.next().unwrap() {
                        sum += value;
                    }
                    assert_eq!(fork.position().unwrap(), 50);
                    sum
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let expected: usize = (2..=50).sum();
    assert!(sums.iter().all(|&sum| sum == expected));
    assert_eq!(produced.load(Ordering::SeqCst), 50);
}

#[test]
fn test_stream_forks_start_at_parent_position() {
    let mut stream = ForkableStream::from_iter("abcdef".chars().collect::<Vec<_>>());
    stream.next().unwrap();
    stream.next().unwrap();

    let mut forks = stream.fork(2).unwrap();
    assert_eq!(forks[0].next().unwrap(), Some('c'));
    assert_eq!(forks[0].next().unwrap(), Some('d'));
    assert_eq!(forks[1].next().unwrap(), Some('c'));

    let mut nested = forks[0].fork(1).unwrap();
    assert_eq!(nested[0].position().unwrap(), 4);
    assert_eq!(nested[0].next().unwrap(), Some('e'));
    assert!(forks[0].is_blocked());
    assert_eq!(forks[0].next(), Err(ForkError::AlreadyForked));
}

#[test]
fn test_tree_lineage_visibility() {
    let mut tree: ForkableTree<&str, u32> = ForkableTree::branch_tree("root");
    let root = tree.root_branch().unwrap().unwrap();
    let shared = tree.add_branch_child(&root, "shared").unwrap();
    tree.add_leaf_child(&shared, 1).unwrap();

    let mut forks = tree.fork(2).unwrap();
    forks[0].add_leaf_child(&shared, 2).unwrap();
    let mut grandchildren = forks[1].fork(2).unwrap();
    grandchildren[0].add_leaf_child(&shared, 3).unwrap();

    let leaves = |tree: &ForkableTree<&'static str, u32>| -> Vec<u32> {
        tree.children(&shared)
            .unwrap()
            .iter()
            .filter_map(|node| node.as_leaf().map(|leaf| *leaf.data()))
            .collect()
    };
    assert_eq!(leaves(&forks[0]), [1, 2]);
    assert_eq!(leaves(&grandchildren[0]), [1, 3]);
    assert_eq!(leaves(&grandchildren[1]), [1]);
    assert!(matches!(forks[1].children(&shared), Err(ForkError::AlreadyForked)));
}

#[test]
fn test_tree_forks_grow_in_parallel() {
    let mut tree: ForkableTree<String, usize> = ForkableTree::branch_tree("root".to_owned());
    let root = tree.root_branch().unwrap().unwrap();
    let forks = tree.fork(6).unwrap();

    let counts: Vec<usize> = thread::scope(|scope| {
        let handles: Vec<_> = forks
            .into_iter()
            .enumerate()
            .map(|(i, mut fork)| {
                let root = Arc::clone(&root);
                scope.spawn(move || {
                    let branch = fork.add_branch_child(&root, format!("fork-{i}")).unwrap();
                    for j in 0..=i {
                        fork.add_leaf_child(&branch, j).unwrap();
                    }
                    assert_eq!(fork.child_count(&root).unwrap(), 1);
                    fork.child_count(&branch).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(counts, [1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_tree_releases_children_of_dropped_forks() {
    let mut tree: ForkableTree<&str, char> = ForkableTree::branch_tree("root");
    let root = tree.root_branch().unwrap().unwrap();
    tree.add_leaf_child(&root, 'a').unwrap();

    let mut forks = tree.fork(3).unwrap();
    for (fork, c) in forks.iter_mut().zip(['x', 'y', 'z']) {
        fork.add_leaf_child(&root, c).unwrap();
    }
    assert_eq!(root.owner_count(), 4);

    forks.truncate(1);
    assert_eq!(root.owner_count(), 2);
    assert_eq!(forks[0].child_count(&root).unwrap(), 2);
}

#[test]
fn test_parent_of_marked_node() {
    let mut tree: ForkableTree<&str, char> = ForkableTree::branch_tree("root");
    let root = tree.root_branch().unwrap().unwrap();
    let child = tree.add_branch_child(&root, "child").unwrap();
    tree.set_marker(TreeNode::Branch(Arc::clone(&child))).unwrap();

    let marker = tree.marker().unwrap();
    let parent = tree.parent(&marker).unwrap().unwrap();
    assert!(Arc::ptr_eq(&parent, &root));
    assert!(tree.parent(&tree.root().unwrap()).unwrap().is_none());
}
