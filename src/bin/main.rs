use cordyceps_avl::IntTree;

fn main() {
    let mut tree = IntTree::new();

    for key in [40, 20, 10, 30, 60, 70, 50, 35, 33, 37] {
        tree.insert(key);
    }
    tree.assert_invariants();

    println!("preorder:    {:?}", tree.preorder());
    println!("postorder:   {:?}", tree.postorder());
    println!("inorder:     {:?}", tree.inorder());
    println!("level order: {:?}", tree.level_order());
    println!(
        "size: {}, root: {:?}, height: {:?}",
        tree.len(),
        tree.root(),
        tree.height()
    );

    if let Ok(level) = tree.level(35) {
        println!("level of 35: {level}");
    }

    println!("removed branch at 33: {}", tree.remove_branch(33));
    tree.assert_invariants();

    println!("level order: {:?}", tree.level_order());
    println!(
        "size: {}, root: {:?}, height: {:?}",
        tree.len(),
        tree.root(),
        tree.height()
    );
}
