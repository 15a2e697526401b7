//! Randomized op-sequence checking against a sorted-multiset oracle.
//!
//! Shared between the proptest suite and the fuzz harness, which is why
//! every op implements both [`Arbitrary`] and a proptest strategy.

use arbitrary::Arbitrary;
use proptest::strategy::{Just, Strategy};

use crate::{Error, IntTree};

/// How an op picks its key: an index into the keys currently stored, or a
/// fresh (probably-absent) value.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum KeyChoice {
    Present(usize),
    Random(i32),
}

proptest::prop_compose! {
    fn present_strategy()(
        index in 0usize..1000,
    ) -> KeyChoice {
        KeyChoice::Present(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        key in -1000i32..1000,
    ) -> KeyChoice {
        KeyChoice::Random(key)
    }
}

fn key_strategy() -> impl Strategy<Value = KeyChoice> {
    proptest::prop_oneof![present_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(KeyChoice),
    Contains(KeyChoice),
    RemoveBranch(KeyChoice),
    Level(KeyChoice),
    Parent(KeyChoice),
    Traversals,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    // Insertions are weighted up so generated trees grow deep enough to
    // exercise rotation chains before a branch removal prunes them.
    proptest::prop_oneof![
        4 => key_strategy().prop_map(Op::Insert),
        1 => key_strategy().prop_map(Op::Contains),
        1 => key_strategy().prop_map(Op::RemoveBranch),
        1 => key_strategy().prop_map(Op::Level),
        1 => key_strategy().prop_map(Op::Parent),
        1 => Just(Op::Traversals),
    ]
}

fn pick(keys: &[i32], choice: KeyChoice) -> i32 {
    match choice {
        KeyChoice::Present(index) => {
            if keys.is_empty() {
                index as i32
            } else {
                keys[index % keys.len()]
            }
        }
        KeyChoice::Random(key) => key,
    }
}

// A subtree occupies one contiguous run of the in-order sequence, so a branch
// removal must excise a single block, and that block must contain the removed
// key.
fn assert_contiguous_excision(before: &[i32], after: &[i32], excised: usize, key: i32, op_id: usize) {
    assert_eq!(
        before.len(),
        after.len() + excised,
        "Op #{op_id}: length must drop by the branch size"
    );

    let prefix = before
        .iter()
        .zip(after.iter())
        .take_while(|(b, a)| b == a)
        .count();

    assert_eq!(
        &before[prefix + excised..],
        &after[prefix..],
        "Op #{op_id}: removal must excise one contiguous in-order block"
    );
    assert!(
        before[prefix..prefix + excised].contains(&key),
        "Op #{op_id}: the excised block must contain the removed key"
    );
}

pub fn run_model(ops: Vec<Op>) {
    // Sorted multiset of the keys the tree must currently hold.
    let mut keys: Vec<i32> = Vec::new();
    let mut tree = IntTree::new();

    for (op_id, op) in ops.into_iter().enumerate() {
        match op {
            Op::Insert(choice) => {
                let key = pick(&keys, choice);

                let index = keys.partition_point(|&k| k <= key);
                keys.insert(index, key);
                tree.insert(key);
            }

            Op::Contains(choice) => {
                let key = pick(&keys, choice);

                assert_eq!(
                    tree.contains(key),
                    keys.binary_search(&key).is_ok(),
                    "Op #{op_id}"
                );
            }

            Op::RemoveBranch(choice) => {
                let key = pick(&keys, choice);

                let present = keys.binary_search(&key).is_ok();
                let before = tree.inorder();
                let len_before = tree.len();

                let removed = tree.remove_branch(key);
                assert_eq!(removed, present, "Op #{op_id}");

                if removed {
                    let after = tree.inorder();
                    let excised = len_before - tree.len();

                    assert!(excised >= 1, "Op #{op_id}: at least the match is removed");
                    assert_contiguous_excision(&before, &after, excised, key, op_id);

                    keys = after;
                } else {
                    assert_eq!(tree.len(), len_before, "Op #{op_id}: no mutation");
                    assert_eq!(tree.inorder(), before, "Op #{op_id}: no mutation");
                }
            }

            Op::Level(choice) => {
                let key = pick(&keys, choice);

                match keys.binary_search(&key) {
                    Ok(_) => {
                        let level = tree.level(key).expect("present key must have a level");
                        let height = tree.height().expect("tree holding a key is not empty");
                        assert!(
                            level <= height,
                            "Op #{op_id}: level {level} exceeds height {height}"
                        );
                    }
                    Err(_) => {
                        assert_eq!(tree.level(key), Err(Error::KeyNotFound(key)), "Op #{op_id}");
                    }
                }
            }

            Op::Parent(choice) => {
                let key = pick(&keys, choice);

                match keys.binary_search(&key) {
                    Ok(_) => {
                        let parent = tree.get_parent(key).expect("present key must resolve");

                        // The root is the only node without a parent.
                        if parent.is_none() {
                            assert_eq!(tree.root(), Some(key), "Op #{op_id}");
                        }
                    }
                    Err(_) => {
                        assert_eq!(
                            tree.get_parent(key),
                            Err(Error::KeyNotFound(key)),
                            "Op #{op_id}"
                        );
                    }
                }
            }

            Op::Traversals => {
                assert_eq!(
                    tree.inorder(),
                    keys,
                    "Op #{op_id}: in-order must equal the sorted key multiset"
                );

                for mut order in [tree.preorder(), tree.postorder(), tree.level_order()] {
                    order.sort_unstable();
                    assert_eq!(
                        order, keys,
                        "Op #{op_id}: every traversal visits the same keys"
                    );
                }
            }
        }

        tree.assert_invariants();
        assert_eq!(tree.len(), keys.len(), "Op #{op_id}");
    }
}
