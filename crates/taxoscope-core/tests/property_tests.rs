//! # Property-Based Tests
//!
//! Invariants of the graph model and the expansion protocol under arbitrary
//! gesture/completion interleavings.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use taxoscope_core::{
    ChildQuery, Completion, Effect, Gesture, Graph, GraphModel, InteractionController, Message,
    RankHierarchy, TaxoError, TaxonEdge, TaxonId, TaxonNode,
};

/// Synthetic store: every node below species has `fanout` children whose ids
/// extend the parent's id.
fn store_children(query: &ChildQuery, fanout: usize) -> Vec<TaxonNode> {
    (0..fanout)
        .map(|i| {
            TaxonNode::new(
                format!("{}.{}", query.parent.id, i),
                format!("{} {}", query.lookup.child_rank, i),
                query.lookup.child_rank.clone(),
            )
        })
        .collect()
}

/// One step of a simulated session.
#[derive(Debug, Clone)]
enum Step {
    /// Click the n-th materialized node (modulo node count).
    Click(usize),
    /// Complete the n-th pending fetch (modulo pending count).
    Complete(usize),
    /// Fail the n-th pending fetch (modulo pending count).
    Fail(usize),
}

/// `(s, t)` with `s < t`, so edges only ever point to higher numbers.
fn forward_pair() -> impl Strategy<Value = (u32, u32)> {
    (0u32..9).prop_flat_map(|s| (Just(s), s + 1..10))
}

fn numbered_graph() -> Graph {
    let mut graph = Graph::new();
    for i in 0..10 {
        graph.add_node(TaxonNode::new(format!("n{}", i), "x", "genus"));
    }
    graph
}

fn edge(s: u32, t: u32) -> TaxonEdge {
    TaxonEdge::new(TaxonId::new(format!("n{}", s)), TaxonId::new(format!("n{}", t)))
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => any::<usize>().prop_map(Step::Click),
        3 => any::<usize>().prop_map(Step::Complete),
        1 => any::<usize>().prop_map(Step::Fail),
    ]
}

proptest! {
    /// Node count equals the number of distinct ids added.
    #[test]
    fn node_count_reflects_unique_ids(ids in vec(0u32..50, 0..100)) {
        let mut graph = Graph::new();
        for id in &ids {
            graph.add_node(TaxonNode::new(format!("n{}", id), "x", "genus"));
        }
        let unique = ids.iter().collect::<BTreeSet<_>>().len();
        prop_assert_eq!(graph.node_count(), unique);
    }

    /// Edge count equals the number of distinct pairs added.
    #[test]
    fn edge_count_reflects_unique_pairs(pairs in vec(forward_pair(), 0..100)) {
        let mut graph = numbered_graph();
        for (s, t) in &pairs {
            graph
                .add_edge(edge(*s, *t))
                .expect("forward edges never close a cycle");
        }
        let unique = pairs.iter().collect::<BTreeSet<_>>().len();
        prop_assert_eq!(graph.edge_count(), unique);
    }

    /// An edge back to any ancestor, or to the node itself, is refused and
    /// leaves the graph as it was.
    #[test]
    fn back_edges_are_rejected(
        pairs in vec(forward_pair(), 1..60),
        pick in any::<usize>(),
    ) {
        let mut graph = numbered_graph();
        for (s, t) in &pairs {
            graph.add_edge(edge(*s, *t)).expect("forward edge");
        }
        let before = graph.snapshot();

        let (s, t) = pairs[pick % pairs.len()];
        prop_assert!(matches!(graph.add_edge(edge(t, s)), Err(TaxoError::Cycle { .. })), "expected Cycle error for reverse edge");
        prop_assert!(matches!(graph.add_edge(edge(s, s)), Err(TaxoError::Cycle { .. })), "expected Cycle error for self-loop");
        prop_assert_eq!(graph.snapshot(), before);
    }

    /// Under any interleaving: never two fetches in flight for one node,
    /// no node fetched again once expanded, and the final graph is a tree.
    #[test]
    fn expansion_protocol_holds_under_interleaving(
        steps in vec(step(), 1..200),
        fanout in 1usize..4,
    ) {
        let mut controller = InteractionController::new(RankHierarchy::standard(), "Root");
        controller.dispatch(Message::Start);
        controller.dispatch(Message::Completion(Completion::RootLoaded(Ok(
            TaxonNode::new("r", "Root", "kingdom"),
        ))));

        let mut pending: VecDeque<ChildQuery> = VecDeque::new();
        let mut in_flight: BTreeSet<TaxonId> = BTreeSet::new();
        let mut successes: BTreeMap<TaxonId, usize> = BTreeMap::new();

        for step in steps {
            let message = match step {
                Step::Click(n) => {
                    let ids: Vec<TaxonId> =
                        controller.engine().graph().nodes().map(|n| n.id.clone()).collect();
                    let id = ids[n % ids.len()].clone();
                    Message::Gesture(Gesture::Click { id })
                }
                Step::Complete(n) | Step::Fail(n) if !pending.is_empty() => {
                    let idx = n % pending.len();
                    let Some(query) = pending.remove(idx) else { continue };
                    in_flight.remove(&query.parent.id);
                    let result = if matches!(step, Step::Fail(_)) {
                        Err(TaxoError::StoreUnavailable("flaky".to_string()))
                    } else {
                        *successes.entry(query.parent.id.clone()).or_default() += 1;
                        Ok(store_children(&query, fanout))
                    };
                    Message::Completion(Completion::ChildrenLoaded {
                        parent: query.parent.id.clone(),
                        result,
                    })
                }
                _ => continue,
            };

            for effect in controller.dispatch(message) {
                if let Effect::FetchChildren(query) = effect {
                    prop_assert!(
                        in_flight.insert(query.parent.id.clone()),
                        "second fetch in flight for {}",
                        query.parent.id
                    );
                    prop_assert!(!successes.contains_key(&query.parent.id));
                    pending.push_back(query);
                }
            }
        }

        let graph = controller.engine().graph();
        prop_assert_eq!(graph.edge_count() + 1, graph.node_count());
        let pairs: BTreeSet<_> = graph.edges().map(|e| (e.source.clone(), e.target.clone())).collect();
        prop_assert_eq!(pairs.len(), graph.edge_count());
        prop_assert!(successes.values().all(|&n| n == 1));
    }
}
