//! Property-based test generators using proptest.
//!
//! Provides strategies for random identifiers and random acyclic graphs.

use proptest::prelude::*;
use revsync_protocol::ObjectId;
use revsync_store::InMemoryStore;

/// Strategy for generating arbitrary object identifiers.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform20(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for generating identifier text that is not a valid identifier.
pub fn invalid_identifier_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[0-9a-f]{0,39}").expect("Invalid regex"),
        prop::string::string_regex("[0-9a-f]{41,48}").expect("Invalid regex"),
        (
            prop::string::string_regex("[0-9a-f]{40}").expect("Invalid regex"),
            0..40usize,
            prop::char::range('g', 'z'),
        )
            .prop_map(|(text, pos, bad)| {
                let mut chars: Vec<char> = text.chars().collect();
                chars[pos] = bad;
                chars.into_iter().collect()
            }),
    ]
}

/// Shape of a random acyclic graph.
///
/// Node `i` may only list parents with a smaller index, which keeps the
/// graph acyclic and lets nodes be inserted in index order.
#[derive(Debug, Clone)]
pub struct DagSpec {
    /// Parent indices per node.
    pub parents: Vec<Vec<usize>>,
}

impl DagSpec {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Inserts the graph's nodes into `store`, tagging payloads with `label`.
    ///
    /// Returns identifiers by node index.
    pub fn build(&self, store: &InMemoryStore, label: &str) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = Vec::with_capacity(self.parents.len());
        for (index, parents) in self.parents.iter().enumerate() {
            let parent_ids: Vec<ObjectId> = parents.iter().map(|&p| ids[p]).collect();
            let id = store
                .insert(&parent_ids, format!("{label}-{index}").as_bytes())
                .expect("parents precede children");
            ids.push(id);
        }
        ids
    }

    /// Inserts into `store` only the nodes in `keep` plus their ancestors.
    ///
    /// Payload labels match [`DagSpec::build`], so identifiers agree with a
    /// full build using the same label.
    pub fn build_closure(&self, store: &InMemoryStore, label: &str, keep: &[usize]) -> Vec<ObjectId> {
        let mut wanted = vec![false; self.parents.len()];
        let mut stack: Vec<usize> = keep.to_vec();
        while let Some(index) = stack.pop() {
            if !wanted[index] {
                wanted[index] = true;
                stack.extend(self.parents[index].iter().copied());
            }
        }

        let full = InMemoryStore::new();
        let ids = self.build(&full, label);
        for (index, parents) in self.parents.iter().enumerate() {
            if wanted[index] {
                let parent_ids: Vec<ObjectId> = parents.iter().map(|&p| ids[p]).collect();
                store
                    .insert(&parent_ids, format!("{label}-{index}").as_bytes())
                    .expect("ancestors are kept");
            }
        }
        ids
    }
}

/// Strategy for generating acyclic graphs of up to `max_nodes` nodes.
///
/// Every node has between zero and three parents.
pub fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = DagSpec> {
    (1..=max_nodes.max(1))
        .prop_flat_map(|len| {
            let nodes: Vec<_> = (0..len)
                .map(|index| {
                    if index == 0 {
                        Just(Vec::new()).boxed()
                    } else {
                        prop::collection::btree_set(0..index, 0..=3.min(index))
                            .prop_map(|set| set.into_iter().collect::<Vec<_>>())
                            .boxed()
                    }
                })
                .collect();
            nodes
        })
        .prop_map(|parents| DagSpec { parents })
}

/// Strategy for a graph plus two node subsets, one per side of a sync.
pub fn dag_with_sides_strategy(
    max_nodes: usize,
) -> impl Strategy<Value = (DagSpec, Vec<usize>, Vec<usize>)> {
    dag_strategy(max_nodes).prop_flat_map(|dag| {
        let len = dag.len();
        (
            Just(dag),
            prop::collection::vec(0..len, 0..=len.min(4)),
            prop::collection::vec(0..len, 0..=len.min(4)),
        )
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_store::ObjectStore;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn dag_parents_point_backwards(dag in dag_strategy(16)) {
            for (index, parents) in dag.parents.iter().enumerate() {
                prop_assert!(parents.iter().all(|&p| p < index));
            }
        }

        #[test]
        fn invalid_identifiers_do_not_parse(text in invalid_identifier_strategy()) {
            prop_assert!(ObjectId::from_hex(&text).is_err());
        }

        #[test]
        fn closure_build_keeps_ancestors((dag, keep, _) in dag_with_sides_strategy(12)) {
            let store = InMemoryStore::new();
            let ids = dag.build_closure(&store, "n", &keep);
            for index in keep {
                prop_assert!(store.contains(&ids[index]));
                for parent in store.immediate_parents(&ids[index]).unwrap() {
                    prop_assert!(store.contains(&parent));
                }
            }
        }
    }
}
