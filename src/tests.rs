use std::ops::Range;

use proptest::prelude::*;

use super::*;

fn insert_find_all(keys: &[i32]) {
    let mut tree = IntTree::new();

    for &key in keys {
        tree.insert(key);
        tree.assert_invariants();
    }

    for &key in keys {
        assert!(tree.contains(key), "key {key} not found");
    }
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn four_elems_find() {
    insert_find_all(&[0, 1, 2, 3]);
    insert_find_all(&[0, 1, 3, 2]);
    insert_find_all(&[0, 2, 1, 3]);
    insert_find_all(&[0, 2, 3, 1]);
    insert_find_all(&[0, 3, 1, 2]);
    insert_find_all(&[0, 3, 2, 1]);

    insert_find_all(&[1, 0, 2, 3]);
    insert_find_all(&[1, 0, 3, 2]);
    insert_find_all(&[1, 2, 0, 3]);
    insert_find_all(&[1, 2, 3, 0]);
    insert_find_all(&[1, 3, 0, 2]);
    insert_find_all(&[1, 3, 2, 0]);

    insert_find_all(&[2, 0, 1, 3]);
    insert_find_all(&[2, 0, 3, 1]);
    insert_find_all(&[2, 1, 0, 3]);
    insert_find_all(&[2, 1, 3, 0]);
    insert_find_all(&[2, 3, 0, 1]);
    insert_find_all(&[2, 3, 1, 0]);

    insert_find_all(&[3, 0, 1, 2]);
    insert_find_all(&[3, 0, 2, 1]);
    insert_find_all(&[3, 1, 0, 2]);
    insert_find_all(&[3, 1, 2, 0]);
    insert_find_all(&[3, 2, 0, 1]);
    insert_find_all(&[3, 2, 1, 0]);
}

// Removes the branch at each key in turn; keys already pruned as part of an
// earlier branch are skipped. Since every node's key is in `keys`, the tree
// must drain completely.
fn remove_branch_all(keys: &[i32]) {
    let mut tree = IntTree::new();

    for &key in keys {
        tree.insert(key);
        tree.assert_invariants();
    }

    for &key in keys {
        if tree.contains(key) {
            let before = tree.len();
            assert!(tree.remove_branch(key));
            assert!(tree.len() < before);
            tree.assert_invariants();
        }
        assert!(!tree.contains(key));
    }

    assert!(tree.is_empty());
}

#[test]
fn remove_one() {
    remove_branch_all(&[0]);
}

#[test]
fn remove_two() {
    remove_branch_all(&[0, 1]);
    remove_branch_all(&[1, 0]);
}

#[test]
fn remove_three() {
    remove_branch_all(&[0, 1, 2]);
    remove_branch_all(&[0, 2, 1]);
    remove_branch_all(&[1, 0, 2]);
    remove_branch_all(&[1, 2, 0]);
    remove_branch_all(&[2, 0, 1]);
    remove_branch_all(&[2, 1, 0]);
}

#[test]
fn remove_four() {
    remove_branch_all(&[0, 1, 2, 3]);
    remove_branch_all(&[0, 1, 3, 2]);
    remove_branch_all(&[0, 2, 1, 3]);
    remove_branch_all(&[0, 2, 3, 1]);
    remove_branch_all(&[0, 3, 1, 2]);
    remove_branch_all(&[0, 3, 2, 1]);

    remove_branch_all(&[1, 0, 2, 3]);
    remove_branch_all(&[1, 0, 3, 2]);
    remove_branch_all(&[1, 2, 0, 3]);
    remove_branch_all(&[1, 2, 3, 0]);
    remove_branch_all(&[1, 3, 0, 2]);
    remove_branch_all(&[1, 3, 2, 0]);

    remove_branch_all(&[2, 0, 1, 3]);
    remove_branch_all(&[2, 0, 3, 1]);
    remove_branch_all(&[2, 1, 0, 3]);
    remove_branch_all(&[2, 1, 3, 0]);
    remove_branch_all(&[2, 3, 0, 1]);
    remove_branch_all(&[2, 3, 1, 0]);

    remove_branch_all(&[3, 0, 1, 2]);
    remove_branch_all(&[3, 0, 2, 1]);
    remove_branch_all(&[3, 1, 0, 2]);
    remove_branch_all(&[3, 1, 2, 0]);
    remove_branch_all(&[3, 2, 0, 1]);
    remove_branch_all(&[3, 2, 1, 0]);
}

// The four canonical imbalance repairs. Each sequence overweights a
// grandparent and must leave 20 at the root with 10 and 30 as children.
fn assert_rebalanced_to_20_10_30(tree: &IntTree) {
    assert_eq!(tree.root(), Some(20));
    assert_eq!(tree.get_left(20), Ok(Some(10)));
    assert_eq!(tree.get_right(20), Ok(Some(30)));
    assert_eq!(tree.height(), Some(1));
    tree.assert_invariants();
}

#[test]
fn left_left_single_right_rotation() {
    let mut tree = IntTree::new();
    for key in [30, 20, 10] {
        tree.insert(key);
    }

    assert_rebalanced_to_20_10_30(&tree);
}

#[test]
fn right_right_single_left_rotation() {
    let mut tree = IntTree::new();
    for key in [10, 20, 30] {
        tree.insert(key);
    }

    assert_rebalanced_to_20_10_30(&tree);
}

#[test]
fn left_right_double_rotation() {
    let mut tree = IntTree::new();
    for key in [30, 10, 20] {
        tree.insert(key);
    }

    assert_rebalanced_to_20_10_30(&tree);
}

#[test]
fn right_left_double_rotation() {
    let mut tree = IntTree::new();
    for key in [10, 30, 20] {
        tree.insert(key);
    }

    assert_rebalanced_to_20_10_30(&tree);
}

#[test]
fn balanced_after_every_insertion() {
    let mut tree = IntTree::new();

    for key in [40, 20, 10, 30, 60, 70, 50, 35, 33, 37] {
        tree.insert(key);
        tree.assert_invariants();
    }

    assert_eq!(tree.len(), 10);
    assert_eq!(tree.height(), Some(3));
    assert_eq!(tree.root(), Some(40));
    assert_eq!(
        tree.inorder(),
        vec![10, 20, 30, 33, 35, 37, 40, 50, 60, 70]
    );
    assert_eq!(
        tree.level_order(),
        vec![40, 33, 60, 20, 35, 50, 70, 10, 30, 37]
    );
}

#[test]
fn remove_branch_detaches_whole_subtree() {
    let mut tree = IntTree::new();

    for key in [50, 30, 70, 20, 40, 60, 80, 10, 25] {
        tree.insert(key);
        tree.assert_invariants();
    }

    // No insertion in this sequence forces a rotation, so the tree keeps
    // the insertion shape.
    assert_eq!(
        tree.level_order(),
        vec![50, 30, 70, 20, 40, 60, 80, 10, 25]
    );

    // 30's branch holds {30, 20, 40, 10, 25}.
    assert!(tree.remove_branch(30));

    assert_eq!(tree.len(), 4);
    assert_eq!(tree.inorder(), vec![50, 60, 70, 80]);
    assert_eq!(tree.root(), Some(70));
    tree.assert_invariants();
}

#[test]
fn removing_an_absent_key_is_inert() {
    let mut tree = IntTree::new();

    for key in [4, 2, 6, 1, 3, 5, 7] {
        tree.insert(key);
    }

    let preorder = tree.preorder();
    let level_order = tree.level_order();

    assert!(!tree.remove_branch(42));

    assert_eq!(tree.len(), 7);
    assert_eq!(tree.preorder(), preorder);
    assert_eq!(tree.level_order(), level_order);
    tree.assert_invariants();
}

#[test]
fn traversal_orders() {
    let mut tree = IntTree::new();

    for key in [4, 2, 6, 1, 3, 5, 7] {
        tree.insert(key);
    }

    assert_eq!(tree.preorder(), vec![4, 2, 1, 3, 6, 5, 7]);
    assert_eq!(tree.inorder(), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(tree.postorder(), vec![1, 3, 2, 5, 7, 6, 4]);
    assert_eq!(tree.level_order(), vec![4, 2, 6, 1, 3, 5, 7]);
}

#[test]
fn dotgraph_renders_every_node() {
    let mut tree = IntTree::new();

    for key in [2, 1, 3] {
        tree.insert(key);
    }

    let mut out = String::new();
    tree.dotgraph("t", &mut out).unwrap();

    for key in [1, 2, 3] {
        assert!(out.contains(&format!("\"grapht-{key}\"")));
    }
    assert!(out.starts_with("digraph \"graph-t\""));
}

#[test]
fn dotgraph_of_empty_tree() {
    let tree = IntTree::new();

    let mut out = String::new();
    tree.dotgraph("empty", &mut out).unwrap();

    assert_eq!(out, "digraph \"graph-empty\" {}");
}

// Independent of the cached heights: walks the structure through the public
// lookups only.
fn max_level(tree: &IntTree, keys: &[i32]) -> usize {
    keys.iter()
        .map(|&key| tree.level(key).expect("key was inserted"))
        .max()
        .expect("at least one key")
}

proptest::proptest! {
    #[test]
    fn inorder_is_sorted(keys in proptest::collection::vec(-1000i32..1000, 0..256)) {
        let mut tree = IntTree::new();
        for &key in &keys {
            tree.insert(key);
        }
        tree.assert_invariants();

        let mut sorted = keys.clone();
        sorted.sort_unstable();

        prop_assert_eq!(tree.inorder(), sorted);
        prop_assert_eq!(tree.len(), tree.preorder().len());
    }

    #[test]
    fn traversals_visit_the_same_keys(keys in proptest::collection::vec(-1000i32..1000, 1..256)) {
        let mut tree = IntTree::new();
        for &key in &keys {
            tree.insert(key);
        }

        let inorder = tree.inorder();

        for mut order in [tree.preorder(), tree.postorder(), tree.level_order()] {
            order.sort_unstable();
            prop_assert_eq!(&order, &inorder);
        }
    }

    // The last node of a level-order traversal sits on the deepest level,
    // so its level is the tree's height.
    #[test]
    fn height_is_level_of_last_level_order_node(
        key_set in proptest::collection::btree_set(-500i32..500, 1..128),
    ) {
        let keys: Vec<i32> = key_set.into_iter().collect();

        let mut tree = IntTree::new();
        for &key in &keys {
            tree.insert(key);
        }

        let height = tree.height().expect("tree is not empty");
        let last = *tree.level_order().last().expect("tree is not empty");

        prop_assert_eq!(tree.level(last), Ok(height));
        prop_assert_eq!(max_level(&tree, &keys), height);
    }

    #[test]
    fn absent_key_removal_preserves_traversals(
        keys in proptest::collection::vec(-1000i32..1000, 0..128),
        probe in 1000i32..2000,
    ) {
        let mut tree = IntTree::new();
        for &key in &keys {
            tree.insert(key);
        }

        let preorder = tree.preorder();

        prop_assert!(!tree.remove_branch(probe));

        prop_assert_eq!(tree.len(), keys.len());
        prop_assert_eq!(tree.preorder(), preorder);
        tree.assert_invariants();
    }
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn model_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_model(ops);
    }
}
