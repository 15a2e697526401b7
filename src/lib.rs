//! An intrusive AVL tree over ordered keys, and [`IntTree`], an AVL-balanced
//! search tree of `i32` keys built on top of it.

// Conventions used in comments:
// - The height of a node `x` is denoted `h(x)`; a missing child has height -1,
//   so leaves have height 0.
// - The balance factor of `x` is `bf(x) = h(right(x)) - h(left(x))`.
//
// The fundamental invariants of an AVL tree are:
// 1. `bf(x)` is -1, 0 or +1 for every node `x`; +-2 occurs only transiently,
//    between a mutation and the rotation that repairs it.
// 2. The cached height of `x` is exactly `1 + max(h(left(x)), h(right(x)))`.
//
// Corollaries:
// 3. The height of a tree holding `n` nodes is O(log n), which bounds the
//    recursion depth of every traversal and the length of every rebalancing
//    walk, including on adversarial insertion orders.
// 4. Keys compare with `<=` on the way down, so an equal key always descends
//    left at insertion time. A rotation may later move an equal key into a
//    right subtree, so the order invariant is `left <= node <= right`; the
//    in-order sequence stays non-decreasing either way.

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomPinned, mem, ops::Not, pin::Pin,
    ptr::NonNull,
};
use std::{borrow::Borrow, collections::VecDeque};

use cordyceps::Linked;

mod debug;
mod int_tree;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
#[cfg(test)]
mod tests;

pub use int_tree::{Error, IntTree};
pub use iter::Iter;

/// A node that can be linked into an [`AvlTree`].
pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// The tree stores nodes in binary-search order and repairs the AVL balance
/// invariant after every insertion and branch removal, so its height stays
/// logarithmic in the number of nodes. Duplicate keys are allowed; an equal
/// key descends into the left subtree of the first equal node on its search
/// path.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    height: i8,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let mut count = 0;

        if let Some(root) = self.root {
            unsafe {
                assert!(
                    T::links(root).as_ref().parent().is_none(),
                    "root must not have a parent"
                );
                self.assert_invariants_at(root, None, None, &mut count);
            }
        }

        assert_eq!(count, self.len, "len must count every reachable node");
    }

    // Checks search order, cached heights, balance factors and parent links
    // for the subtree at `node`; returns the subtree height.
    //
    // `min` and `max` are inclusive bounds on keys in the subtree; both are
    // inclusive because rotations may park duplicates on either side of an
    // equal ancestor.
    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(
        &self,
        node: NonNull<T>,
        min: Option<&T::Key>,
        max: Option<&T::Key>,
        count: &mut usize,
    ) -> i8 {
        unsafe {
            *count += 1;
            let key = node.as_ref().key();

            if let Some(min) = min {
                assert!(key >= min, "key {key:?} must sort after ancestor {min:?}");
            }

            if let Some(max) = max {
                assert!(key <= max, "key {key:?} must sort before ancestor {max:?}");
            }

            let mut heights = [-1_i8; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent, "child parent pointer must point here");

                    heights[dir as usize] = match dir {
                        Dir::Left => self.assert_invariants_at(child, min, Some(key), count),
                        Dir::Right => self.assert_invariants_at(child, Some(key), max, count),
                    };
                }
            }

            let [left, right] = heights;
            let height = 1 + left.max(right);

            assert_eq!(
                T::links(node).as_ref().height(),
                height,
                "cached height of {key:?} is stale"
            );
            assert!(
                (right - left).abs() <= 1,
                "balance factor of {key:?} is out of range"
            );

            height
        }
    }

    /// Returns a reference to the first node found whose key equals `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns `true` if the tree contains a node whose key equals `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = T::links(cur).as_ref().left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = T::links(cur).as_ref().right(),
                }
            }
        }
    }

    /// Returns a reference to the root node, or `None` if the tree is empty.
    pub fn root(&self) -> Option<Pin<&T>> {
        self.root
            .map(|root| unsafe { Pin::new_unchecked(root.as_ref()) })
    }

    /// Returns the height of the tree, or `None` if the tree is empty.
    ///
    /// The height is the level of the deepest node, which is also the level
    /// of the last node visited by [`level_order`](AvlTree::level_order):
    /// breadth-first visitation reaches deeper levels later, so the final
    /// node is always one of maximum depth. A single-node tree has height 0.
    pub fn height(&self) -> Option<usize> {
        self.root
            .map(|root| unsafe { T::links(root).as_ref().height() as usize })
    }

    // Returns the number of parent-link hops between `node` and the root.
    pub(crate) unsafe fn level_of(&self, node: NonNull<T>) -> usize {
        let mut level = 0;
        let mut cur = node;

        while let Some(parent) = unsafe { T::links(cur).as_ref().parent() } {
            level += 1;
            cur = parent;
        }

        level
    }

    unsafe fn maybe_set_parent(&mut self, opt_node: Link<T>, parent: Link<T>) {
        let Some(node) = opt_node else {
            return;
        };

        unsafe { T::links(node).as_mut().set_parent(parent) };
    }

    #[inline]
    unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        match parent {
            Some(parent) => unsafe { self.replace_child(parent, old_child, new_child) },
            None => self.root = new_child,
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with
    // `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    #[cfg(not(debug_assertions))]
    #[inline]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Option<NonNull<T>>,
    ) {
        unsafe {
            if T::links(parent).as_ref().child(Dir::Left) == Some(old_child) {
                T::links(parent).as_mut().set_child(Dir::Left, new_child);
            } else {
                T::links(parent).as_mut().set_child(Dir::Right, new_child);
            }
        }
    }

    // Replaces the child pointer of `parent` pointing at `old_child` with
    // `new_child`.
    //
    // `new_child`'s parent pointer is not updated.
    //
    // # Safety
    //
    // The caller must ensure that the following conditions hold:
    // - `old_child` is a child node of `parent`.
    // - `new_child` is not a child node of `parent`.
    #[cfg(debug_assertions)]
    unsafe fn replace_child(
        &mut self,
        parent: NonNull<T>,
        old_child: NonNull<T>,
        new_child: Option<NonNull<T>>,
    ) {
        unsafe {
            if T::links(parent).as_ref().child(Dir::Left) == Some(old_child) {
                if let Some(new_child) = new_child {
                    assert_ne!(
                        T::links(parent).as_ref().child(Dir::Right),
                        Some(new_child),
                        "`new_child` must not be a child of `parent`"
                    );
                }

                T::links(parent).as_mut().set_child(Dir::Left, new_child);
            } else if T::links(parent).as_ref().child(Dir::Right) == Some(old_child) {
                if let Some(new_child) = new_child {
                    assert_ne!(
                        T::links(parent).as_ref().child(Dir::Left),
                        Some(new_child),
                        "`new_child` must not be a child of `parent`"
                    );
                }

                T::links(parent).as_mut().set_child(Dir::Right, new_child);
            } else {
                unreachable!("`old_child` must be a child of `parent`");
            }
        }
    }

    // Returns the height cached at the pointed-to node, or -1 for a missing
    // node.
    unsafe fn height_of(&self, node: Link<T>) -> i8 {
        node.map(|n| unsafe { T::links(n).as_ref().height() })
            .unwrap_or(-1)
    }

    unsafe fn balance_factor(&self, node: NonNull<T>) -> i8 {
        unsafe {
            let links = T::links(node).as_ref();
            self.height_of(links.right()) - self.height_of(links.left())
        }
    }

    unsafe fn update_height(&mut self, node: NonNull<T>) {
        unsafe {
            let links = T::links(node).as_ref();
            let height = 1 + self.height_of(links.left()).max(self.height_of(links.right()));
            T::links(node).as_mut().set_height(height);
        }
    }

    // Performs a rotation, moving `up` up and its parent `down` down.
    //
    // Only the two pivots change subtree height; their cached heights are
    // recomputed bottom-up, `down` before `up`. Subtrees that merely moved
    // are not revisited.
    fn rotate_at(&mut self, down: NonNull<T>, up: NonNull<T>) {
        unsafe {
            // - `down` becomes the `dir` child of `up`.
            // - `across` goes from the `dir` child of `up` to the `!dir`
            //   child of `down`.
            let dir = if T::links(down).as_ref().right() == Some(up) {
                Dir::Left
            } else {
                Dir::Right
            };

            let across = T::links(up).as_ref().child(dir);
            T::links(down).as_mut().set_child(!dir, across);
            self.maybe_set_parent(across, Some(down));

            T::links(up).as_mut().set_child(dir, Some(down));
            let parent = T::links(down).as_mut().set_parent(Some(up));
            T::links(up).as_mut().set_parent(parent);

            self.replace_child_or_set_root(parent, down, Some(up));

            self.update_height(down);
            self.update_height(up);
        }
    }

    // Walks from `start` up to the root, refreshing cached heights and
    // rotating any node whose balance factor has left {-1, 0, +1}.
    //
    // After a rotation the walk continues from the node now occupying the
    // rotated subtree's former position, since its own ancestors may have
    // become unbalanced.
    fn rebalance_from(&mut self, start: Link<T>) {
        let mut cur = start;

        while let Some(node) = cur {
            unsafe {
                self.update_height(node);

                let subtree = match self.balance_factor(node) {
                    2 => {
                        let right = T::links(node)
                            .as_ref()
                            .right()
                            .expect("right-heavy node must have a right child");

                        if self.balance_factor(right) < 0 {
                            // The right child leans left: rotate it right,
                            // then rotate `node` left.
                            let pivot = T::links(right)
                                .as_ref()
                                .left()
                                .expect("left-leaning node must have a left child");
                            self.rotate_at(right, pivot);
                            self.rotate_at(node, pivot);
                            pivot
                        } else {
                            self.rotate_at(node, right);
                            right
                        }
                    }

                    -2 => {
                        let left = T::links(node)
                            .as_ref()
                            .left()
                            .expect("left-heavy node must have a left child");

                        if self.balance_factor(left) > 0 {
                            // The left child leans right: rotate it left,
                            // then rotate `node` right.
                            let pivot = T::links(left)
                                .as_ref()
                                .right()
                                .expect("right-leaning node must have a right child");
                            self.rotate_at(left, pivot);
                            self.rotate_at(node, pivot);
                            pivot
                        } else {
                            self.rotate_at(node, left);
                            left
                        }
                    }

                    _ => node,
                };

                cur = T::links(subtree).as_ref().parent();
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) {
        let ptr = T::into_ptr(item);

        let root = match self.root {
            Some(root) => root,
            None => {
                // Tree is empty. Set `item` as the root and return.
                unsafe {
                    let links = T::links(ptr).as_mut();
                    links.set_parent(None);
                    links.set_left(None);
                    links.set_right(None);
                    links.set_height(0);
                }

                self.root = Some(ptr);
                self.len += 1;
                return;
            }
        };

        let mut opt_parent = Some(root);

        // Descend the tree, looking for a vacant child slot. An equal key
        // keeps descending left.
        while let Some(parent) = opt_parent {
            let ordering = unsafe { ptr.as_ref().key().cmp(parent.as_ref().key()) };

            let dir = match ordering {
                Ordering::Less | Ordering::Equal => Dir::Left,
                Ordering::Greater => Dir::Right,
            };

            unsafe {
                let parent_links = T::links(parent).as_mut();
                match parent_links.child(dir) {
                    // Descend.
                    Some(child) => opt_parent = Some(child),

                    // Set `item` as child.
                    None => {
                        parent_links.set_child(dir, Some(ptr));

                        let links = T::links(ptr).as_mut();
                        links.set_parent(Some(parent));
                        links.set_left(None);
                        links.set_right(None);
                        links.set_height(0);
                        break;
                    }
                }
            }
        }

        self.rebalance_from(unsafe { T::links(ptr).as_ref().parent() });
        self.len += 1;
    }

    // Returns the minimum node in the subtree.
    //
    // If the subtree root is not the minimum, also returns the minimum
    // node's parent.
    #[inline]
    unsafe fn min_in_subtree(&self, root: NonNull<T>) -> (NonNull<T>, Option<NonNull<T>>) {
        let mut parent = None;
        let mut cur = root;

        while let Some(left) = unsafe { T::links(cur).as_ref().left() } {
            parent = Some(cur);
            cur = left;
        }

        (cur, parent)
    }

    /// Removes the branch rooted at the first node whose key equals `key`.
    ///
    /// The matched node and its entire subtree are detached and freed.
    /// Returns the number of nodes removed, or `None`, without mutating the
    /// tree, if no node matches.
    pub fn remove_branch<Q>(&mut self, key: &Q) -> Option<usize>
    where
        T::Key: Borrow<Q> + Ord,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        Some(unsafe { self.remove_branch_at(node) })
    }

    /// Removes the branch rooted at `node`, returning the number of nodes
    /// removed.
    ///
    /// Removing the branch rooted at the tree's root empties the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element
    /// of `self`, and not any other tree.
    pub unsafe fn remove_branch_at(&mut self, node: NonNull<T>) -> usize {
        unsafe {
            let parent = T::links(node).as_ref().parent();

            self.replace_child_or_set_root(parent, node, None);
            T::links(node).as_mut().set_parent(None);

            let removed = self.drop_subtree(node);
            debug_assert!(removed <= self.len);
            self.len -= removed;

            // The detached branch shortened the former parent's side.
            self.rebalance_from(parent);

            removed
        }
    }

    // Frees every node of the detached subtree at `root`, returning how many
    // nodes were freed.
    //
    // # Safety
    //
    // `root` must be detached: neither a child pointer nor the tree root may
    // still refer to it, and its parent pointer must be cleared.
    unsafe fn drop_subtree(&mut self, root: NonNull<T>) -> usize {
        let mut freed = 0;
        let mut opt_cur = Some(root);

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let (cur, parent) = self.min_in_subtree(cur);
                let parent = parent.or_else(|| T::links(cur).as_ref().parent());

                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                if let Some(parent) = parent {
                    self.replace_child(parent, cur, right);
                }
                self.maybe_set_parent(right, parent);

                // Drop the node.
                drop(T::from_ptr(cur));
                freed += 1;

                // If the node had no right child, climb to the parent. If the
                // node had no parent, the subtree is exhausted.
                opt_cur = right.or(parent);
            }
        }

        freed
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        if let Some(root) = self.root.take() {
            let freed = unsafe { self.drop_subtree(root) };
            debug_assert_eq!(freed, self.len);
        }

        self.len = 0;
    }

    /// Visits every node in preorder: each node before either of its
    /// subtrees, left subtree before right.
    pub fn preorder<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        if let Some(root) = self.root {
            unsafe { Self::preorder_at(root, &mut visit) };
        }
    }

    unsafe fn preorder_at<F>(node: NonNull<T>, visit: &mut F)
    where
        F: FnMut(&T),
    {
        unsafe {
            visit(node.as_ref());

            if let Some(left) = T::links(node).as_ref().left() {
                Self::preorder_at(left, visit);
            }

            if let Some(right) = T::links(node).as_ref().right() {
                Self::preorder_at(right, visit);
            }
        }
    }

    /// Visits every node in order: left subtree, then the node, then the
    /// right subtree. Keys are visited in non-decreasing order.
    pub fn inorder<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        if let Some(root) = self.root {
            unsafe { Self::inorder_at(root, &mut visit) };
        }
    }

    unsafe fn inorder_at<F>(node: NonNull<T>, visit: &mut F)
    where
        F: FnMut(&T),
    {
        unsafe {
            if let Some(left) = T::links(node).as_ref().left() {
                Self::inorder_at(left, visit);
            }

            visit(node.as_ref());

            if let Some(right) = T::links(node).as_ref().right() {
                Self::inorder_at(right, visit);
            }
        }
    }

    /// Visits every node in postorder: both subtrees before the node, left
    /// subtree before right.
    pub fn postorder<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        if let Some(root) = self.root {
            unsafe { Self::postorder_at(root, &mut visit) };
        }
    }

    unsafe fn postorder_at<F>(node: NonNull<T>, visit: &mut F)
    where
        F: FnMut(&T),
    {
        unsafe {
            if let Some(left) = T::links(node).as_ref().left() {
                Self::postorder_at(left, visit);
            }

            if let Some(right) = T::links(node).as_ref().right() {
                Self::postorder_at(right, visit);
            }

            visit(node.as_ref());
        }
    }

    /// Visits every node in breadth-first order: level by level starting at
    /// the root, left to right within each level.
    pub fn level_order<F>(&self, mut visit: F)
    where
        F: FnMut(&T),
    {
        let Some(root) = self.root else {
            return;
        };

        let mut queue = VecDeque::new();
        queue.push_back(root);

        while let Some(node) = queue.pop_front() {
            unsafe {
                if let Some(left) = T::links(node).as_ref().left() {
                    queue.push_back(left);
                }

                if let Some(right) = T::links(node).as_ref().right() {
                    queue.push_back(right);
                }

                visit(node.as_ref());
            }
        }
    }

    /// Returns an iterator visiting the tree's nodes in key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                height: 0,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn height(&self) -> i8 {
        unsafe { (*self.inner.get()).height }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }

    #[inline]
    fn set_height(&mut self, height: i8) {
        self.inner.get_mut().height = height;
    }
}
