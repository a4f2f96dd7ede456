//! # Expansion Scenario Tests (T0-T3)
//!
//! Whole-session scenarios driven through the interaction controller, the way
//! a session driver would drive it.
//!
//! ## Tiers
//! - T0: Rank Resolution
//! - T1: Single Expansion
//! - T2: Failure and Retry
//! - T3: Hover Annotation

use taxoscope_core::{
    Completion, Effect, ErrorScope, ExpansionState, Gesture, GraphModel, HoverTicket,
    InteractionController, Message, Rank, RankHierarchy, Report, TaxoError, TaxonDetail,
    TaxonEdge, TaxonId, TaxonNode,
};

// =============================================================================
// HELPERS
// =============================================================================

fn animalia() -> TaxonNode {
    TaxonNode::new("A", "Animalia", "kingdom")
}

fn phyla() -> Vec<TaxonNode> {
    vec![
        TaxonNode::new("B", "Chordata", "phylum"),
        TaxonNode::new("C", "Arthropoda", "phylum"),
    ]
}

fn session() -> InteractionController {
    let mut controller = InteractionController::new(RankHierarchy::standard(), "Animalia");
    controller.dispatch(Message::Start);
    controller.dispatch(Message::Completion(Completion::RootLoaded(Ok(animalia()))));
    controller
}

fn gesture(g: Gesture) -> Message {
    Message::Gesture(g)
}

fn click(id: &str) -> Message {
    gesture(Gesture::Click { id: TaxonId::new(id) })
}

fn children_loaded(parent: &str, result: Result<Vec<TaxonNode>, TaxoError>) -> Message {
    Message::Completion(Completion::ChildrenLoaded {
        parent: TaxonId::new(parent),
        result,
    })
}

fn fetch_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::FetchChildren(_)))
        .count()
}

// =============================================================================
// TIER T0: RANK RESOLUTION
// =============================================================================

mod t0_rank_resolution {
    use super::*;

    /// T0.1: six steps from kingdom reach species, then the table ends.
    #[test]
    fn kingdom_to_species_in_six_steps() {
        let table = RankHierarchy::standard();
        let mut rank = Rank::new("kingdom");
        let mut steps = 0;
        while let Some(next) = table.next_rank(&rank).expect("known rank") {
            rank = next.clone();
            steps += 1;
        }
        assert_eq!(steps, 6);
        assert_eq!(rank, Rank::new("species"));
    }

    /// T0.2: a family's children come from the genus collections.
    #[test]
    fn family_children_live_in_genus_collections() {
        let table = RankHierarchy::standard();
        let genus = table
            .next_rank(&Rank::new("family"))
            .expect("known")
            .expect("child rank");

        assert_eq!(table.entity_collection(genus).expect("genus"), "genusTaxa");
        assert_eq!(table.edge_collection(genus).expect("genus"), "genusMembers");
    }

    /// T0.3: the expansion query for a click carries the resolved collections.
    #[test]
    fn click_emits_resolved_child_query() {
        let mut controller = session();
        let effects = controller.dispatch(click("A"));

        match effects.as_slice() {
            [Effect::FetchChildren(query)] => {
                assert_eq!(query.parent.id, TaxonId::new("A"));
                assert_eq!(query.lookup.edge_collection, "kingdomMembers");
                assert_eq!(query.lookup.child_collection, "phylumTaxa");
            }
            other => unreachable!("unexpected effects {:?}", other),
        }
    }
}

// =============================================================================
// TIER T1: SINGLE EXPANSION
// =============================================================================

mod t1_single_expansion {
    use super::*;

    /// T1.1: Animalia + two phyla yields exactly three nodes and two edges;
    /// clicking again fetches nothing and changes nothing.
    #[test]
    fn end_to_end_animalia() {
        let mut controller = session();

        assert_eq!(fetch_count(&controller.dispatch(click("A"))), 1);
        let effects = controller.dispatch(children_loaded("A", Ok(phyla())));
        assert!(matches!(effects.as_slice(), [Effect::Render(events)] if events.len() == 4));

        let graph = controller.engine().graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        let edges: Vec<_> = graph.edges().cloned().collect();
        assert_eq!(
            edges,
            vec![
                TaxonEdge::new(TaxonId::new("A"), TaxonId::new("B")),
                TaxonEdge::new(TaxonId::new("A"), TaxonId::new("C")),
            ]
        );

        assert!(controller.dispatch(click("A")).is_empty());
        assert_eq!(controller.engine().graph().node_count(), 3);
        assert_eq!(controller.engine().graph().edge_count(), 2);
    }

    /// T1.2: rapid double click → one fetch, same result as a single click.
    #[test]
    fn rapid_double_click_is_idempotent() {
        let mut controller = session();
        let first = controller.dispatch(click("A"));
        let second = controller.dispatch(click("A"));
        assert_eq!(fetch_count(&first) + fetch_count(&second), 1);

        controller.dispatch(children_loaded("A", Ok(phyla())));
        assert_eq!(controller.engine().graph().node_count(), 3);
        assert_eq!(controller.engine().graph().edge_count(), 2);
    }

    /// T1.3: interleaved completions of two nodes do not corrupt the graph.
    #[test]
    fn interleaved_sibling_expansions() {
        let mut controller = session();
        controller.dispatch(click("A"));
        controller.dispatch(children_loaded("A", Ok(phyla())));

        assert_eq!(fetch_count(&controller.dispatch(click("B"))), 1);
        assert_eq!(fetch_count(&controller.dispatch(click("C"))), 1);

        // C answers first.
        controller.dispatch(children_loaded(
            "C",
            Ok(vec![TaxonNode::new("C1", "Insecta", "class")]),
        ));
        controller.dispatch(children_loaded(
            "B",
            Ok(vec![
                TaxonNode::new("B1", "Mammalia", "class"),
                TaxonNode::new("B2", "Aves", "class"),
            ]),
        ));

        let graph = controller.engine().graph();
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 5);
        assert_eq!(graph.children_of(&TaxonId::new("B")).len(), 2);
        assert_eq!(graph.children_of(&TaxonId::new("C")).len(), 1);
    }

    /// T1.4: a store returning a duplicate row never duplicates a node or edge.
    #[test]
    fn duplicate_rows_are_merged() {
        let mut controller = session();
        controller.dispatch(click("A"));
        let mut rows = phyla();
        rows.push(TaxonNode::new("B", "Chordata (dup)", "phylum"));
        controller.dispatch(children_loaded("A", Ok(rows)));

        let graph = controller.engine().graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(
            graph.node(&TaxonId::new("B")).map(|n| n.name.as_str()),
            Some("Chordata")
        );
    }
}

// =============================================================================
// TIER T2: FAILURE AND RETRY
// =============================================================================

mod t2_failure_and_retry {
    use super::*;

    /// T2.1: a failed fetch leaves the graph alone and re-click fetches again.
    #[test]
    fn failed_expansion_is_retryable() {
        let mut controller = session();
        controller.dispatch(click("A"));
        let effects = controller.dispatch(children_loaded(
            "A",
            Err(TaxoError::StoreUnavailable("connection refused".to_string())),
        ));

        assert!(matches!(
            effects.as_slice(),
            [Effect::Report(Report { scope: ErrorScope::Node(id), .. })] if id == &TaxonId::new("A")
        ));
        assert!(matches!(
            controller.engine().state(&TaxonId::new("A")),
            Some(ExpansionState::Failed { .. })
        ));
        assert_eq!(controller.engine().graph().node_count(), 1);

        assert_eq!(fetch_count(&controller.dispatch(click("A"))), 1);
        controller.dispatch(children_loaded("A", Ok(phyla())));
        assert_eq!(controller.engine().graph().node_count(), 3);
    }

    /// T2.2: a stray completion with nothing in flight is only recorded.
    #[test]
    fn stray_completion_is_diagnostic() {
        let mut controller = session();
        let effects = controller.dispatch(children_loaded("A", Ok(phyla())));

        assert!(matches!(
            effects.as_slice(),
            [Effect::Report(Report {
                scope: ErrorScope::Diagnostic,
                error: TaxoError::StaleCompletion(_),
            })]
        ));
        assert_eq!(controller.engine().graph().node_count(), 1);
    }

    /// T2.3: a missing root is fatal.
    #[test]
    fn missing_root_is_fatal() {
        let mut controller = InteractionController::new(RankHierarchy::standard(), "Animalia");
        controller.dispatch(Message::Start);
        let effects = controller.dispatch(Message::Completion(Completion::RootLoaded(Err(
            TaxoError::NotFound("root taxon 'Animalia'".to_string()),
        ))));

        assert!(matches!(
            effects.as_slice(),
            [Effect::Report(Report {
                scope: ErrorScope::Fatal,
                error: TaxoError::NotFound(_),
            })]
        ));
        assert_eq!(controller.engine().graph().node_count(), 0);
    }
}

// =============================================================================
// TIER T3: HOVER ANNOTATION
// =============================================================================

mod t3_hover_annotation {
    use super::*;

    fn detail_loaded(ticket: HoverTicket) -> Message {
        Message::Completion(Completion::DetailLoaded {
            ticket,
            node: TaxonId::new("A"),
            result: Ok(TaxonDetail {
                summary: "Animals are multicellular eukaryotes.".to_string(),
                image: Some("https://upload.example/animalia.jpg".to_string()),
                url: None,
            }),
        })
    }

    fn enter_ticket(controller: &mut InteractionController) -> HoverTicket {
        let effects = controller.dispatch(gesture(Gesture::PointerEnter {
            id: TaxonId::new("A"),
        }));
        match effects.as_slice() {
            [Effect::FetchDetail { ticket, query }] => {
                assert_eq!(query.collection, "kingdomTaxa");
                *ticket
            }
            other => unreachable!("unexpected effects {:?}", other),
        }
    }

    /// T3.1: leave before the detail resolves → never shown.
    #[test]
    fn leave_before_response_suppresses_overlay() {
        let mut controller = session();
        let ticket = enter_ticket(&mut controller);
        controller.dispatch(gesture(Gesture::PointerLeave {
            id: TaxonId::new("A"),
        }));

        let effects = controller.dispatch(detail_loaded(ticket));
        assert!(
            !effects
                .iter()
                .any(|e| matches!(e, Effect::ShowOverlay(_)))
        );
        assert!(controller.overlay().current().is_none());
    }

    /// T3.2: hover, response, leave → shown then dismissed.
    #[test]
    fn hover_shows_then_leave_dismisses() {
        let mut controller = session();
        let ticket = enter_ticket(&mut controller);

        let effects = controller.dispatch(detail_loaded(ticket));
        match effects.as_slice() {
            [Effect::ShowOverlay(annotation)] => {
                assert_eq!(annotation.anchor, TaxonId::new("A"));
                assert!(annotation.body_html.starts_with("<img src="));
            }
            other => unreachable!("unexpected effects {:?}", other),
        }

        let effects = controller.dispatch(gesture(Gesture::PointerLeave {
            id: TaxonId::new("A"),
        }));
        assert_eq!(effects, vec![Effect::DismissOverlay]);
    }

    /// T3.3: hovering never touches the graph or expansion state.
    #[test]
    fn hover_does_not_expand() {
        let mut controller = session();
        let ticket = enter_ticket(&mut controller);
        controller.dispatch(detail_loaded(ticket));

        assert_eq!(
            controller.engine().state(&TaxonId::new("A")),
            Some(&ExpansionState::Unexpanded)
        );
        assert_eq!(controller.engine().graph().node_count(), 1);
    }
}
