//! Property-based tests for ordering, sets and event matching.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use statecraft::core::{entry_order, exit_order, name_matches, DocumentPosition, Guard, OrderedSet};
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Node {
    position: usize,
    depth: usize,
}

impl DocumentPosition for Node {
    fn position(&self) -> usize {
        self.position
    }

    fn depth(&self) -> usize {
        self.depth
    }
}

prop_compose! {
    fn arbitrary_node()(position in 0..1000usize, depth in 0..8usize) -> Node {
        Node { position, depth }
    }
}

prop_compose! {
    /// Nodes with distinct positions, as in a real document.
    fn arbitrary_document()(positions in prop::collection::hash_set(0..1000usize, 1..30))
        (depths in prop::collection::vec(0..8usize, positions.len()), positions in Just(positions))
        -> Vec<Node>
    {
        positions
            .into_iter()
            .zip(depths)
            .map(|(position, depth)| Node { position, depth })
            .collect()
    }
}

proptest! {
    #[test]
    fn exit_order_inverts_entry_order(a in arbitrary_node(), b in arbitrary_node()) {
        prop_assert_eq!(exit_order(&a, &b), entry_order(&b, &a));
        prop_assert_eq!(exit_order(&a, &b), entry_order(&a, &b).reverse());
    }

    #[test]
    fn exit_sort_is_reversed_entry_sort(nodes in arbitrary_document()) {
        let mut entry = nodes.clone();
        entry.sort_by(|a, b| entry_order(a, b));
        let mut exit = nodes;
        exit.sort_by(|a, b| exit_order(a, b));

        entry.reverse();
        prop_assert_eq!(entry, exit);
    }

    #[test]
    fn entry_order_puts_deeper_nodes_first(nodes in arbitrary_document()) {
        let mut sorted = nodes;
        sorted.sort_by(|a, b| entry_order(a, b));

        for pair in sorted.windows(2) {
            prop_assert!(pair[0].depth >= pair[1].depth);
            if pair[0].depth == pair[1].depth {
                prop_assert!(pair[0].position > pair[1].position);
            }
        }
    }

    #[test]
    fn entry_order_only_ties_on_identical_nodes(a in arbitrary_node(), b in arbitrary_node()) {
        let tied = entry_order(&a, &b) == Ordering::Equal;
        prop_assert_eq!(tied, a == b);
    }

    #[test]
    fn ordered_set_keeps_first_insertion_order(values in prop::collection::vec(0..50u32, 0..100)) {
        let set: OrderedSet<u32> = values.iter().copied().collect();

        let mut expected = Vec::new();
        for value in &values {
            if !expected.contains(value) {
                expected.push(*value);
            }
        }
        prop_assert_eq!(set.to_list(), expected);
    }

    #[test]
    fn ordered_set_union_is_idempotent(
        left in prop::collection::vec(0..50u32, 0..40),
        right in prop::collection::vec(0..50u32, 0..40),
    ) {
        let mut once: OrderedSet<u32> = left.iter().copied().collect();
        once.union(right.iter().copied());
        let mut twice = once.clone();
        twice.union(right.iter().copied());

        prop_assert_eq!(once.to_list(), twice.to_list());
        prop_assert!(right.iter().all(|value| once.contains(value)));
    }

    #[test]
    fn intersection_is_symmetric(
        left in prop::collection::vec(0..20u32, 0..10),
        right in prop::collection::vec(0..20u32, 0..10),
    ) {
        let a: OrderedSet<u32> = left.into_iter().collect();
        let b: OrderedSet<u32> = right.into_iter().collect();
        prop_assert_eq!(a.has_intersection(&b), b.has_intersection(&a));
    }

    #[test]
    fn remove_then_contains_is_false(values in prop::collection::vec(0..50u32, 1..40), index in any::<prop::sample::Index>()) {
        let mut set: OrderedSet<u32> = values.iter().copied().collect();
        let victim = values[index.index(values.len())];

        prop_assert!(set.remove(&victim));
        prop_assert!(!set.contains(&victim));
        prop_assert!(!set.remove(&victim));
    }

    #[test]
    fn names_match_themselves_and_wildcards(name in "[a-z]{1,8}(\\.[a-z]{1,8}){0,3}") {
        prop_assert!(name_matches(&name, &name));
        prop_assert!(name_matches("*", &name));
        let wildcard = format!("{name}.*");
        prop_assert!(name_matches(&wildcard, &name));
    }

    #[test]
    fn prefixes_match_only_on_token_boundaries(
        prefix in "[a-z]{1,8}",
        suffix in "[a-z]{1,8}",
    ) {
        let dotted = format!("{prefix}.{suffix}");
        let glued = format!("{prefix}{suffix}");
        prop_assert!(name_matches(&prefix, &dotted));
        prop_assert!(!name_matches(&prefix, &glued));
    }

    #[test]
    fn guard_is_deterministic(limit in 0..100u32, value in 0..100u32) {
        let guard = Guard::new(move |count: &u32| *count < limit);
        prop_assert_eq!(guard.check(&value), guard.check(&value));
    }
}
