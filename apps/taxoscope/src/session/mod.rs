//! # Session Driver
//!
//! Runs one `InteractionController` on a single tokio task.
//!
//! ```text
//!   SessionHandle ──Command──▶ mpsc ──▶ driver task ──dispatch──▶ controller
//!        ▲                      ▲            │
//!        │                      │            ├── spawn fetch ──▶ store
//!   broadcast<SessionEvent> ◀───┼────────────┤
//!                               └─ Complete ◀┘ (posted by the fetch task)
//! ```
//!
//! Gestures and completions reach the controller through the same channel,
//! so its state is never shared. Store fetches run on their own tasks and
//! post a `Completion` back; hover results are filtered by ticket inside the
//! controller, expansion fetches are never cancelled.

use futures::stream::{self, Stream};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use taxoscope_core::{
    Annotation, Completion, Effect, ErrorScope, ExpansionState, Gesture, GraphEvent, GraphModel,
    GraphSnapshot, InteractionController, Message, Report, TaxoError, TaxonId,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::store::TaxonomyStore;

/// Capacity of the session event channel.
pub const EVENT_CAPACITY: usize = 256;

/// Poll interval of `SessionHandle::settle`.
const SETTLE_POLL: Duration = Duration::from_millis(10);

// =============================================================================
// EVENTS & SNAPSHOTS
// =============================================================================

/// What the rendering surface is told.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Graph additions, in the order they must be drawn.
    Render { events: Vec<GraphEvent> },
    /// A node's expansion state changed.
    Expansion {
        id: TaxonId,
        #[serde(flatten)]
        state: ExpansionState,
    },
    /// The overlay appeared or was replaced.
    OverlayShown { annotation: Annotation },
    /// The overlay was hidden.
    OverlayDismissed,
    /// A fatal or node-scoped error.
    Error {
        #[serde(flatten)]
        scope: ErrorScope,
        message: String,
    },
    /// The subscriber fell behind and `skipped` events were dropped; the
    /// renderer must re-read the session graph.
    Resync { skipped: u64 },
}

/// Expansion state of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeState {
    pub id: TaxonId,
    #[serde(flatten)]
    pub state: ExpansionState,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub root: Option<TaxonId>,
    pub root_pending: bool,
    pub graph: GraphSnapshot,
    pub states: Vec<NodeState>,
    pub overlay: Option<Annotation>,
    pub hovered: Option<TaxonId>,
    /// Store fetches started and not yet completed.
    pub in_flight: usize,
}

/// Outcome of a gesture or reload accepted by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GestureAck {
    /// Store fetches the message started.
    pub fetches: usize,
}

/// Session events from `receiver` as a stream that ends with the session.
///
/// A lagging receiver yields one `Resync` in place of the dropped events.
pub fn event_stream(
    receiver: broadcast::Receiver<SessionEvent>,
) -> impl Stream<Item = SessionEvent> + Send + 'static {
    stream::unfold(receiver, |mut receiver| async move {
        match receiver.recv().await {
            Ok(event) => Some((event, receiver)),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Event subscriber lagged, {} events skipped", skipped);
                Some((SessionEvent::Resync { skipped }, receiver))
            }
            Err(RecvError::Closed) => None,
        }
    })
}

// =============================================================================
// HANDLE
// =============================================================================

type Reply = oneshot::Sender<Result<GestureAck, TaxoError>>;

enum Command {
    Dispatch { message: Message, reply: Reply },
    Complete(Completion),
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

fn closed() -> TaxoError {
    TaxoError::IoError("session task has stopped".to_string())
}

/// Cloneable front door to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Start the driver task for `controller` over `store`.
    ///
    /// The root fetch is not issued until `start` is called.
    #[must_use]
    pub fn spawn(controller: InteractionController, store: Arc<dyn TaxonomyStore>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let driver = SessionDriver {
            controller,
            store,
            commands: commands.downgrade(),
            events: events.clone(),
            in_flight: 0,
        };
        tokio::spawn(driver.run(receiver));

        Self { commands, events }
    }

    async fn dispatch(&self, message: Message) -> Result<GestureAck, TaxoError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Dispatch { message, reply })
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())?
    }

    /// Issue the root fetch, unless the root is loaded or already loading.
    pub async fn start(&self) -> Result<GestureAck, TaxoError> {
        self.dispatch(Message::Start).await
    }

    /// Apply a user gesture.
    ///
    /// Fails with `InvalidGesture` when the target node is not in the graph.
    pub async fn gesture(&self, gesture: Gesture) -> Result<GestureAck, TaxoError> {
        self.dispatch(Message::Gesture(gesture)).await
    }

    /// Current state of the session.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, TaxoError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(reply))
            .map_err(|_| closed())?;
        response.await.map_err(|_| closed())
    }

    /// Wait until no store fetch is in flight, then return the snapshot.
    pub async fn settle(&self, timeout: Duration) -> Result<SessionSnapshot, TaxoError> {
        let wait = async {
            loop {
                let snapshot = self.snapshot().await?;
                if snapshot.in_flight == 0 {
                    return Ok::<_, TaxoError>(snapshot);
                }
                tokio::time::sleep(SETTLE_POLL).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.map_err(|_| {
            TaxoError::StoreUnavailable(format!("fetches still pending after {:?}", timeout))
        })?
    }

    /// Subscribe to session events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

// =============================================================================
// DRIVER
// =============================================================================

struct SessionDriver {
    controller: InteractionController,
    store: Arc<dyn TaxonomyStore>,
    commands: mpsc::WeakUnboundedSender<Command>,
    events: broadcast::Sender<SessionEvent>,
    in_flight: usize,
}

impl SessionDriver {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!(backend = self.store.backend(), "Session started");

        while let Some(command) = receiver.recv().await {
            match command {
                Command::Dispatch { message, reply } => {
                    let ack = self.handle(message);
                    // the caller may have gone away; the message is applied anyway
                    let _ = reply.send(ack);
                }
                Command::Complete(completion) => {
                    self.in_flight = self.in_flight.saturating_sub(1);
                    if let Err(e) = self.handle(Message::Completion(completion)) {
                        tracing::debug!("Completion rejected: {}", e);
                    }
                }
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.snapshot());
                }
            }
        }

        tracing::debug!("Session stopped");
    }

    /// Dispatch one message and carry out its effects.
    fn handle(&mut self, message: Message) -> Result<GestureAck, TaxoError> {
        let watched = watched_node(&message);
        let before = watched
            .as_ref()
            .and_then(|id| self.controller.engine().state(id).cloned());

        let effects = self.controller.dispatch(message);

        let rejected = effects.iter().find_map(|effect| match effect {
            Effect::Report(Report {
                error: error @ TaxoError::InvalidGesture(_),
                ..
            }) => Some(error.clone()),
            _ => None,
        });
        let fetches = effects
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    Effect::FetchRoot(_) | Effect::FetchChildren(_) | Effect::FetchDetail { .. }
                )
            })
            .count();

        for effect in effects {
            self.execute(effect);
        }

        if let Some(id) = watched {
            let after = self.controller.engine().state(&id).cloned();
            if let Some(state) = after.filter(|after| before.as_ref() != Some(after)) {
                self.emit(SessionEvent::Expansion { id, state });
            }
        }

        match rejected {
            Some(error) => Err(error),
            None => Ok(GestureAck { fetches }),
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::FetchRoot(query) => {
                tracing::info!("Fetching root '{}' from {}", query.name, query.collection);
                let store = Arc::clone(&self.store);
                self.spawn_fetch(async move {
                    Completion::RootLoaded(store.fetch_root(&query).await)
                });
            }
            Effect::FetchChildren(query) => {
                tracing::debug!(
                    node = %query.parent.id,
                    edges = %query.lookup.edge_collection,
                    taxa = %query.lookup.child_collection,
                    "Expanding"
                );
                let store = Arc::clone(&self.store);
                self.spawn_fetch(async move {
                    let result = store.fetch_children(&query).await;
                    Completion::ChildrenLoaded {
                        parent: query.parent.id,
                        result,
                    }
                });
            }
            Effect::FetchDetail { ticket, query } => {
                let store = Arc::clone(&self.store);
                self.spawn_fetch(async move {
                    let result = store.fetch_detail(&query).await;
                    Completion::DetailLoaded {
                        ticket,
                        node: query.id,
                        result,
                    }
                });
            }
            Effect::Render(events) => {
                tracing::debug!(
                    nodes = self.controller.engine().graph().node_count(),
                    edges = self.controller.engine().graph().edge_count(),
                    "Graph grew by {} elements",
                    events.len()
                );
                self.emit(SessionEvent::Render { events });
            }
            Effect::ShowOverlay(annotation) => {
                self.emit(SessionEvent::OverlayShown { annotation });
            }
            Effect::DismissOverlay => self.emit(SessionEvent::OverlayDismissed),
            Effect::Report(report) => self.report(report),
        }
    }

    fn report(&self, report: Report) {
        match &report.scope {
            ErrorScope::Fatal => {
                tracing::error!("Taxonomy cannot be shown: {}", report.error);
            }
            ErrorScope::Node(id) => {
                tracing::warn!(node = %id, "Expansion failed: {}", report.error);
            }
            ErrorScope::Diagnostic => {
                tracing::debug!("{}", report.error);
                return;
            }
        }
        self.emit(SessionEvent::Error {
            scope: report.scope,
            message: report.error.to_string(),
        });
    }

    fn spawn_fetch<F>(&mut self, fetch: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let Some(commands) = self.commands.upgrade() else {
            tracing::debug!("Session closing, fetch dropped");
            return;
        };
        self.in_flight += 1;
        tokio::spawn(async move {
            let completion = fetch.await;
            if commands.send(Command::Complete(completion)).is_err() {
                tracing::debug!("Session closed before fetch completed");
            }
        });
    }

    fn emit(&self, event: SessionEvent) {
        // no subscribers is not an error
        let _ = self.events.send(event);
    }

    fn snapshot(&self) -> SessionSnapshot {
        let engine = self.controller.engine();
        SessionSnapshot {
            root: engine.root().cloned(),
            root_pending: self.controller.root_pending(),
            graph: engine.graph().snapshot(),
            states: engine
                .graph()
                .nodes()
                .filter_map(|node| {
                    engine.state(&node.id).map(|state| NodeState {
                        id: node.id.clone(),
                        state: state.clone(),
                    })
                })
                .collect(),
            overlay: self.controller.overlay().current().cloned(),
            hovered: self.controller.hovered().cloned(),
            in_flight: self.in_flight,
        }
    }
}

/// Node whose expansion state a message may change.
fn watched_node(message: &Message) -> Option<TaxonId> {
    match message {
        Message::Gesture(Gesture::Click { id }) => Some(id.clone()),
        Message::Completion(Completion::ChildrenLoaded { parent, .. }) => Some(parent.clone()),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
