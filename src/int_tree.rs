use core::{fmt, marker::PhantomPinned, ptr::NonNull};

use cordyceps::Linked;
use thiserror::Error;

use crate::{AvlTree, Links, TreeNode};

/// Failure to locate a key that a query requires to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The named key is not stored in the tree.
    #[error("key {0} is not present in the tree")]
    KeyNotFound(i32),
}

/// An AVL-balanced search tree of `i32` keys.
///
/// Keys are stored in binary-search order with duplicates allowed; an equal
/// key descends into the left subtree of the first equal node on its search
/// path, so duplicates are retrievable but not distinguishable from one
/// another. Every insertion and branch removal rebalances the tree, keeping
/// lookups and traversal recursion logarithmic in depth.
///
/// Queries that name a key come in two shapes: those with a natural "no
/// data" answer (`root`, the traversals, `height`) report it as an empty
/// result, while those that require the key to be present
/// ([`level`](IntTree::level), the parent/child lookups) fail with
/// [`Error::KeyNotFound`]. A found node with no parent or no child on the
/// requested side is `Ok(None)`, distinct from the key being absent.
pub struct IntTree {
    tree: AvlTree<IntNode>,
}

struct IntNode {
    links: Links<IntNode>,
    key: i32,
    _unpin: PhantomPinned,
}

impl IntNode {
    fn new(key: i32) -> Box<IntNode> {
        Box::new(IntNode {
            links: Links::new(),
            key,
            _unpin: PhantomPinned,
        })
    }
}

unsafe impl Linked<Links<IntNode>> for IntNode {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<IntNode>> {
        let ptr = ptr.as_ptr();
        NonNull::new(core::ptr::addr_of_mut!((*ptr).links)).unwrap()
    }
}

impl TreeNode<Links<IntNode>> for IntNode {
    type Key = i32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

impl IntTree {
    /// Creates a new, empty `IntTree`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the tree contains no keys.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of keys in the tree.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Inserts `key` into the tree, rebalancing as needed.
    pub fn insert(&mut self, key: i32) {
        self.tree.insert(IntNode::new(key));
    }

    /// Returns `true` if at least one stored key equals `key`.
    #[inline]
    pub fn contains(&self, key: i32) -> bool {
        self.tree.contains_key(&key)
    }

    /// Removes the branch rooted at the first node matching `key`: the node
    /// and every node below it.
    ///
    /// Returns `true` if a branch was removed, `false` (leaving the tree
    /// untouched) if the key is absent. Removing the branch at the root key
    /// empties the tree.
    pub fn remove_branch(&mut self, key: i32) -> bool {
        self.tree.remove_branch(&key).is_some()
    }

    /// Clears the tree, removing all keys.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Returns the key at the root, or `None` if the tree is empty.
    pub fn root(&self) -> Option<i32> {
        self.tree.root().map(|node| node.key)
    }

    /// Returns the height of the tree, or `None` if it is empty.
    ///
    /// A single-node tree has height 0.
    pub fn height(&self) -> Option<usize> {
        self.tree.height()
    }

    fn find(&self, key: i32) -> Result<NonNull<IntNode>, Error> {
        self.tree.get_raw(&key).ok_or(Error::KeyNotFound(key))
    }

    /// Returns the key of the matched node's parent, or `Ok(None)` if the
    /// matched node is the root.
    pub fn get_parent(&self, key: i32) -> Result<Option<i32>, Error> {
        let node = self.find(key)?;
        Ok(unsafe { IntNode::links(node).as_ref().parent().map(|p| p.as_ref().key) })
    }

    /// Returns the key of the matched node's left child, or `Ok(None)` if it
    /// has none.
    pub fn get_left(&self, key: i32) -> Result<Option<i32>, Error> {
        let node = self.find(key)?;
        Ok(unsafe { IntNode::links(node).as_ref().left().map(|c| c.as_ref().key) })
    }

    /// Returns the key of the matched node's right child, or `Ok(None)` if
    /// it has none.
    pub fn get_right(&self, key: i32) -> Result<Option<i32>, Error> {
        let node = self.find(key)?;
        Ok(unsafe { IntNode::links(node).as_ref().right().map(|c| c.as_ref().key) })
    }

    /// Returns `true` if the matched node has a left child.
    pub fn has_left(&self, key: i32) -> Result<bool, Error> {
        let node = self.find(key)?;
        Ok(unsafe { IntNode::links(node).as_ref().left().is_some() })
    }

    /// Returns `true` if the matched node has a right child.
    pub fn has_right(&self, key: i32) -> Result<bool, Error> {
        let node = self.find(key)?;
        Ok(unsafe { IntNode::links(node).as_ref().right().is_some() })
    }

    /// Returns `true` if the matched node has at least one child.
    pub fn is_internal(&self, key: i32) -> Result<bool, Error> {
        let node = self.find(key)?;
        Ok(unsafe { !IntNode::links(node).as_ref().is_leaf() })
    }

    /// Returns `true` if the matched node is a leaf.
    pub fn is_external(&self, key: i32) -> Result<bool, Error> {
        let node = self.find(key)?;
        Ok(unsafe { IntNode::links(node).as_ref().is_leaf() })
    }

    /// Returns the matched node's level: its distance in parent-link hops
    /// from the root. The root is at level 0.
    pub fn level(&self, key: i32) -> Result<usize, Error> {
        let node = self.find(key)?;
        Ok(unsafe { self.tree.level_of(node) })
    }

    /// Returns the stored keys in preorder. Empty if the tree is empty.
    pub fn preorder(&self) -> Vec<i32> {
        let mut keys = Vec::with_capacity(self.len());
        self.tree.preorder(|node| keys.push(node.key));
        keys
    }

    /// Returns the stored keys in order, i.e. sorted non-decreasingly.
    /// Empty if the tree is empty.
    pub fn inorder(&self) -> Vec<i32> {
        let mut keys = Vec::with_capacity(self.len());
        self.tree.inorder(|node| keys.push(node.key));
        keys
    }

    /// Returns the stored keys in postorder. Empty if the tree is empty.
    pub fn postorder(&self) -> Vec<i32> {
        let mut keys = Vec::with_capacity(self.len());
        self.tree.postorder(|node| keys.push(node.key));
        keys
    }

    /// Returns the stored keys level by level, left to right within each
    /// level. Empty if the tree is empty.
    pub fn level_order(&self) -> Vec<i32> {
        let mut keys = Vec::with_capacity(self.len());
        self.tree.level_order(|node| keys.push(node.key));
        keys
    }

    /// Returns an iterator over the stored keys in non-decreasing order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = i32> + '_ {
        self.tree.iter().map(|node| node.key)
    }

    /// Renders the tree as a Graphviz `digraph`.
    pub fn dotgraph<W>(&self, name: &str, w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        self.tree.dotgraph(name, w)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}
