//! Lattice laws for the taint domain stack, plus the widening bound.

use proptest::prelude::*;
use taintgraph_engine::{
    Environment, FeatureId, FieldId, Frame, KindId, MemoryLocation, MethodId, Path, Taint,
    TaintTree, UpdateKind,
};

fn arb_frame() -> impl Strategy<Value = Frame> {
    (
        0u32..4,
        0u32..6,
        proptest::collection::btree_set(0u32..4, 0..3),
        proptest::collection::btree_set(0u32..3, 0..2),
    )
        .prop_map(|(kind, distance, features, origins)| {
            let mut frame = Frame::with_distance(KindId(kind), distance);
            frame.add_features(features.into_iter().map(FeatureId));
            for origin in origins {
                frame.add_origin(MethodId(origin));
            }
            frame
        })
}

fn arb_taint() -> impl Strategy<Value = Taint> {
    proptest::collection::vec(arb_frame(), 0..4).prop_map(Taint::from_iter)
}

fn arb_tree() -> impl Strategy<Value = TaintTree> {
    proptest::collection::vec(
        (proptest::collection::vec(0u32..3, 0..4), arb_taint()),
        0..5,
    )
    .prop_map(|writes| {
        let mut tree = TaintTree::bottom();
        for (path, taint) in writes {
            let path: Path = path.into_iter().map(FieldId).collect();
            tree.write(&path, taint, UpdateKind::Weak);
        }
        tree
    })
}

fn arb_environment() -> impl Strategy<Value = Environment> {
    proptest::collection::vec((0u32..3, arb_tree()), 0..4).prop_map(|bindings| {
        let mut environment = Environment::bottom();
        for (location, tree) in bindings {
            environment.set(MemoryLocation(location), tree);
        }
        environment
    })
}

proptest! {
    #[test]
    fn taint_join_is_commutative(a in arb_taint(), b in arb_taint()) {
        let mut ab = a.clone();
        ab.join_with(&b);
        let mut ba = b.clone();
        ba.join_with(&a);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn taint_join_is_associative(a in arb_taint(), b in arb_taint(), c in arb_taint()) {
        let mut left = a.clone();
        left.join_with(&b);
        left.join_with(&c);

        let mut bc = b.clone();
        bc.join_with(&c);
        let mut right = a.clone();
        right.join_with(&bc);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn taint_join_is_idempotent_with_bottom_identity(a in arb_taint()) {
        let mut aa = a.clone();
        aa.join_with(&a);
        prop_assert_eq!(&aa, &a);

        let mut with_bottom = a.clone();
        with_bottom.join_with(&Taint::bottom());
        prop_assert_eq!(&with_bottom, &a);

        let mut bottom = Taint::bottom();
        bottom.join_with(&a);
        prop_assert_eq!(&bottom, &a);
    }

    #[test]
    fn taint_join_is_an_upper_bound(a in arb_taint(), b in arb_taint()) {
        let mut joined = a.clone();
        joined.join_with(&b);
        prop_assert!(a.leq(&joined));
        prop_assert!(b.leq(&joined));
    }

    #[test]
    fn tree_join_is_commutative(a in arb_tree(), b in arb_tree()) {
        let mut ab = a.clone();
        ab.join_with(&b);
        let mut ba = b.clone();
        ba.join_with(&a);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn tree_join_is_associative(a in arb_tree(), b in arb_tree(), c in arb_tree()) {
        let mut left = a.clone();
        left.join_with(&b);
        left.join_with(&c);

        let mut bc = b.clone();
        bc.join_with(&c);
        let mut right = a.clone();
        right.join_with(&bc);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn tree_join_is_idempotent_with_bottom_identity(a in arb_tree()) {
        let mut aa = a.clone();
        aa.join_with(&a);
        prop_assert_eq!(&aa, &a);

        let mut with_bottom = a.clone();
        with_bottom.join_with(&TaintTree::bottom());
        prop_assert_eq!(&with_bottom, &a);

        let mut bottom = TaintTree::bottom();
        bottom.join_with(&a);
        prop_assert_eq!(&bottom, &a);
    }

    #[test]
    fn tree_join_is_an_upper_bound(a in arb_tree(), b in arb_tree()) {
        let mut joined = a.clone();
        joined.join_with(&b);
        prop_assert!(a.leq(&joined));
        prop_assert!(b.leq(&joined));
    }

    #[test]
    fn tree_widening_is_an_upper_bound_with_bounded_height(
        a in arb_tree(),
        b in arb_tree(),
        height in 1usize..4,
    ) {
        let mut widened = a.clone();
        widened.widen_with(&b, height);
        prop_assert!(a.leq(&widened));
        prop_assert!(b.leq(&widened));
        prop_assert!(widened.height() <= height);
    }

    #[test]
    fn environment_join_is_commutative(a in arb_environment(), b in arb_environment()) {
        let mut ab = a.clone();
        ab.join_with(&b);
        let mut ba = b.clone();
        ba.join_with(&a);
        prop_assert_eq!(ab, ba);
    }

    #[test]
    fn environment_join_is_associative(
        a in arb_environment(),
        b in arb_environment(),
        c in arb_environment(),
    ) {
        let mut left = a.clone();
        left.join_with(&b);
        left.join_with(&c);

        let mut bc = b.clone();
        bc.join_with(&c);
        let mut right = a.clone();
        right.join_with(&bc);

        prop_assert_eq!(left, right);
    }

    #[test]
    fn environment_join_is_idempotent_with_bottom_identity(a in arb_environment()) {
        let mut aa = a.clone();
        aa.join_with(&a);
        prop_assert_eq!(&aa, &a);

        let mut with_bottom = a.clone();
        with_bottom.join_with(&Environment::bottom());
        prop_assert_eq!(&with_bottom, &a);

        let mut bottom = Environment::bottom();
        bottom.join_with(&a);
        prop_assert_eq!(&bottom, &a);
    }

    #[test]
    fn environment_join_is_an_upper_bound(a in arb_environment(), b in arb_environment()) {
        let mut joined = a.clone();
        joined.join_with(&b);
        prop_assert!(a.leq(&joined));
        prop_assert!(b.leq(&joined));
    }
}

/// Writing at strictly increasing depths beyond the maximum height `H`
/// yields a tree of height exactly `H`; everything written at or below
/// depth `H` is summarized on the deepest surviving node.
#[test]
fn widening_collapses_deep_writes_onto_the_cutoff_node() {
    let height = 4usize;
    let mut tree = TaintTree::bottom();

    for depth in 1..=10u32 {
        let path: Path = (0..depth).map(FieldId).collect();
        let taint = Taint::singleton(Frame::leaf(KindId(depth)));
        let mut update = TaintTree::bottom();
        update.write(&path, taint, UpdateKind::Weak);
        tree.widen_with(&update, height);
    }

    assert_eq!(tree.height(), height);

    // The node at the cutoff depth carries its own write (kind 4) plus the
    // join of every deeper write (kinds 5..=10).
    let cutoff: Path = (0..height as u32).map(FieldId).collect();
    let node_taint = tree.raw_read(&cutoff).root_elements().clone();
    assert_eq!(node_taint.len(), 7);
    for kind in 4..=10u32 {
        assert!(
            node_taint.frame(KindId(kind)).is_some(),
            "kind {} missing at the cutoff node",
            kind
        );
    }
}
