use proptest::prelude::*;

use crate::model::Bounds;

use super::support::{ChainBelief, ChainModel, Harness, settings};

proptest! {
    #[test]
    fn repeated_passes_only_tighten_root_bounds(
        go in 0.0f64..10.0,
        stop in 0.0f64..10.0,
        discount in 0.1f64..0.9,
        passes in 1usize..12,
    ) {
        // 10 / (1 - discount) dominates every achievable return.
        let upper = 10.0 / (1.0 - discount) + 1.0;
        let mut h = Harness::<ChainModel, ChainBelief>::new(
            ChainModel::new(go, stop, discount),
            Bounds::constant(upper, -1.0),
            settings(1),
        );
        h.settings.expansions_per_search = Some(1);
        let mut tree = h.tree(1);
        let root = tree.root_id();

        let mut previous = (upper, -1.0);
        for _ in 0..passes {
            tree.search(root, 0.0, &mut h.ctx()).expect("search should succeed");
            let node = tree.root().expect("root exists");
            prop_assert!(node.upper() <= previous.0);
            prop_assert!(node.lower() >= previous.1);
            prop_assert!(node.lower() <= node.upper() + 1e-6);
            previous = (node.upper(), node.lower());
        }
    }

    #[test]
    fn expanded_nodes_have_the_required_child_counts(
        branching_factor in 1usize..4,
        passes in 1usize..6,
    ) {
        let mut h = Harness::<ChainModel, ChainBelief>::new(
            ChainModel::new(1.0, 0.5, 0.5),
            Bounds::constant(10.0, -1.0),
            settings(branching_factor),
        );
        h.settings.expansions_per_search = Some(2);
        let mut tree = h.tree(1);
        let root = tree.root_id();
        for _ in 0..passes {
            tree.search(root, 0.0, &mut h.ctx()).expect("search should succeed");
        }

        for (id, _) in tree.nodes() {
            if let Ok(belief) = tree.belief_node(id) {
                let count = belief.children().len();
                prop_assert!(count == 0 || count == 2);
            } else {
                let action = tree.action_node(id).expect("action node");
                let count = action.children().len();
                prop_assert!(count == 0 || count == branching_factor);
            }
        }
        prop_assert!(tree.root().expect("root exists").is_expanded());
    }
}
