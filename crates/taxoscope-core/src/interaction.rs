//! # Interaction Controller
//!
//! Binds user gestures and I/O completions to the expansion engine and the
//! annotation overlay through explicit message dispatch:
//!
//! ```text
//!   Message ──dispatch──▶ InteractionController ──▶ Vec<Effect>
//! ```
//!
//! The controller never performs I/O. Fetches come out as effects; their
//! results come back in as `Completion` messages. Whoever drives the
//! controller feeds every message through one control flow, so the state
//! here is never shared.
//!
//! ## Hover cancellation
//!
//! Each pointer-enter issues a fresh `HoverTicket`. Pointer-leave clears the
//! pending ticket and dismisses the overlay. A detail response whose ticket
//! is no longer pending is dropped, even though the request itself ran.

use crate::expansion::{ExpandOutcome, ExpansionEngine};
use crate::graph::{GraphEvent, GraphModel};
use crate::overlay::{Annotation, AnnotationOverlay, render_body};
use crate::query::{ChildQuery, DetailQuery, RootQuery};
use crate::rank::RankHierarchy;
use crate::{TaxoError, TaxonDetail, TaxonId, TaxonNode};
use serde::{Deserialize, Serialize};

// =============================================================================
// MESSAGES
// =============================================================================

/// Identifies one hover's detail request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HoverTicket(pub u64);

/// A user gesture on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Gesture {
    /// Click: expand the node.
    Click {
        /// Target node.
        id: TaxonId,
    },
    /// Pointer entered the node: annotate it.
    PointerEnter {
        /// Target node.
        id: TaxonId,
    },
    /// Pointer left the node: drop the annotation.
    PointerLeave {
        /// Target node.
        id: TaxonId,
    },
}

/// Result of a store fetch, fed back into the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// `FetchRoot` finished.
    RootLoaded(Result<TaxonNode, TaxoError>),
    /// `FetchChildren` for `parent` finished.
    ChildrenLoaded {
        /// The node that was being expanded.
        parent: TaxonId,
        /// Children in store order, or the failure.
        result: Result<Vec<TaxonNode>, TaxoError>,
    },
    /// `FetchDetail` finished.
    DetailLoaded {
        /// Ticket the request was issued with.
        ticket: HoverTicket,
        /// The hovered node.
        node: TaxonId,
        /// Overlay content, or the failure.
        result: Result<TaxonDetail, TaxoError>,
    },
}

/// Everything the controller reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Load the root (again, if an earlier attempt failed).
    Start,
    /// A user gesture.
    Gesture(Gesture),
    /// An I/O completion.
    Completion(Completion),
}

// =============================================================================
// EFFECTS
// =============================================================================

/// Who needs to hear about an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "node", rename_all = "snake_case")]
pub enum ErrorScope {
    /// The graph cannot be shown at all (root fetch failed).
    Fatal,
    /// Shown next to a node; the user can retry by clicking again.
    Node(TaxonId),
    /// Recorded only.
    Diagnostic,
}

/// An error together with where it must surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Where the error surfaces.
    pub scope: ErrorScope,
    /// The error itself.
    pub error: TaxoError,
}

impl Report {
    fn new(scope: ErrorScope, error: TaxoError) -> Self {
        Self { scope, error }
    }
}

/// Work the driver must carry out after a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the root lookup; answer with `Completion::RootLoaded`.
    FetchRoot(RootQuery),
    /// Run the child lookup; answer with `Completion::ChildrenLoaded`.
    FetchChildren(ChildQuery),
    /// Run the detail lookup; answer with `Completion::DetailLoaded`.
    FetchDetail {
        /// Ticket to echo back.
        ticket: HoverTicket,
        /// The lookup.
        query: DetailQuery,
    },
    /// Apply a batch of graph additions to the rendering surface.
    Render(Vec<GraphEvent>),
    /// Show (or replace) the overlay.
    ShowOverlay(Annotation),
    /// Hide the overlay.
    DismissOverlay,
    /// Surface or record an error.
    Report(Report),
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Dispatches messages to the expansion engine and the overlay.
#[derive(Debug, Clone)]
pub struct InteractionController {
    engine: ExpansionEngine,
    overlay: AnnotationOverlay,
    root_name: String,
    root_pending: bool,
    hover: Option<(HoverTicket, TaxonId)>,
    next_ticket: u64,
}

impl InteractionController {
    /// Create a controller for the taxonomy rooted at the taxon named `root_name`.
    #[must_use]
    pub fn new(hierarchy: RankHierarchy, root_name: impl Into<String>) -> Self {
        Self {
            engine: ExpansionEngine::new(hierarchy),
            overlay: AnnotationOverlay::new(),
            root_name: root_name.into(),
            root_pending: false,
            hover: None,
            next_ticket: 0,
        }
    }

    /// The expansion engine (and through it, the graph).
    #[must_use]
    pub fn engine(&self) -> &ExpansionEngine {
        &self.engine
    }

    /// The overlay.
    #[must_use]
    pub fn overlay(&self) -> &AnnotationOverlay {
        &self.overlay
    }

    /// Node whose detail request is pending or displayed.
    #[must_use]
    pub fn hovered(&self) -> Option<&TaxonId> {
        self.hover.as_ref().map(|(_, id)| id)
    }

    /// Whether a root fetch is in flight.
    #[must_use]
    pub fn root_pending(&self) -> bool {
        self.root_pending
    }

    /// Process one message.
    pub fn dispatch(&mut self, message: Message) -> Vec<Effect> {
        match message {
            Message::Start => self.on_start(),
            Message::Gesture(Gesture::Click { id }) => self.on_click(&id),
            Message::Gesture(Gesture::PointerEnter { id }) => self.on_pointer_enter(id),
            Message::Gesture(Gesture::PointerLeave { id }) => self.on_pointer_leave(&id),
            Message::Completion(Completion::RootLoaded(result)) => self.on_root_loaded(result),
            Message::Completion(Completion::ChildrenLoaded { parent, result }) => {
                self.on_children_loaded(&parent, result)
            }
            Message::Completion(Completion::DetailLoaded {
                ticket,
                node,
                result,
            }) => self.on_detail_loaded(ticket, node, result),
        }
    }

    fn on_start(&mut self) -> Vec<Effect> {
        if self.root_pending || self.engine.root().is_some() {
            return Vec::new();
        }
        self.root_pending = true;
        vec![Effect::FetchRoot(RootQuery::new(
            self.engine.hierarchy(),
            self.root_name.clone(),
        ))]
    }

    fn on_root_loaded(&mut self, result: Result<TaxonNode, TaxoError>) -> Vec<Effect> {
        self.root_pending = false;
        match result.and_then(|root| self.engine.load_root(root)) {
            Ok(events) if events.is_empty() => Vec::new(),
            Ok(events) => vec![Effect::Render(events)],
            Err(e) => vec![Effect::Report(Report::new(ErrorScope::Fatal, e))],
        }
    }

    fn on_click(&mut self, id: &TaxonId) -> Vec<Effect> {
        match self.engine.expand(id) {
            Ok(ExpandOutcome::Fetch(query)) => vec![Effect::FetchChildren(query)],
            Ok(ExpandOutcome::InFlight | ExpandOutcome::AlreadyExpanded | ExpandOutcome::Leaf) => {
                Vec::new()
            }
            Err(e @ TaxoError::InvalidGesture(_)) => {
                vec![Effect::Report(Report::new(ErrorScope::Diagnostic, e))]
            }
            Err(e) => vec![Effect::Report(Report::new(ErrorScope::Node(id.clone()), e))],
        }
    }

    fn on_children_loaded(
        &mut self,
        parent: &TaxonId,
        result: Result<Vec<TaxonNode>, TaxoError>,
    ) -> Vec<Effect> {
        match result {
            Ok(children) => match self.engine.complete(parent, children) {
                Ok(events) if events.is_empty() => Vec::new(),
                Ok(events) => vec![Effect::Render(events)],
                Err(e @ TaxoError::StaleCompletion(_)) => {
                    vec![Effect::Report(Report::new(ErrorScope::Diagnostic, e))]
                }
                Err(e) => vec![Effect::Report(Report::new(
                    ErrorScope::Node(parent.clone()),
                    e,
                ))],
            },
            Err(error) => match self.engine.fail(parent, &error) {
                Ok(()) => vec![Effect::Report(Report::new(
                    ErrorScope::Node(parent.clone()),
                    error,
                ))],
                Err(stale) => vec![
                    Effect::Report(Report::new(ErrorScope::Diagnostic, error)),
                    Effect::Report(Report::new(ErrorScope::Diagnostic, stale)),
                ],
            },
        }
    }

    fn on_pointer_enter(&mut self, id: TaxonId) -> Vec<Effect> {
        let Some(node) = self.engine.graph().node(&id) else {
            return vec![Effect::Report(Report::new(
                ErrorScope::Diagnostic,
                TaxoError::InvalidGesture(id),
            ))];
        };
        let query = match DetailQuery::resolve(self.engine.hierarchy(), node) {
            Ok(query) => query,
            Err(e) => return vec![Effect::Report(Report::new(ErrorScope::Diagnostic, e))],
        };

        let ticket = HoverTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.saturating_add(1);
        self.hover = Some((ticket, id));
        vec![Effect::FetchDetail { ticket, query }]
    }

    fn on_pointer_leave(&mut self, id: &TaxonId) -> Vec<Effect> {
        if self.hovered() == Some(id) {
            self.hover = None;
        }
        match self.overlay.dismiss() {
            Some(_) => vec![Effect::DismissOverlay],
            None => Vec::new(),
        }
    }

    fn on_detail_loaded(
        &mut self,
        ticket: HoverTicket,
        node: TaxonId,
        result: Result<TaxonDetail, TaxoError>,
    ) -> Vec<Effect> {
        let current = self.hover.as_ref().is_some_and(|(t, _)| *t == ticket);
        let detail = match result {
            Ok(detail) => detail,
            Err(e) => return vec![Effect::Report(Report::new(ErrorScope::Diagnostic, e))],
        };
        if !current {
            return Vec::new();
        }

        let title = self
            .engine
            .graph()
            .node(&node)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| node.to_string());
        self.overlay.show(node, title, render_body(&detail));
        self.overlay
            .current()
            .cloned()
            .map(Effect::ShowOverlay)
            .into_iter()
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
