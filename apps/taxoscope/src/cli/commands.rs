//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState};
use crate::config::Config;
use crate::session::{SessionEvent, SessionHandle, SessionSnapshot};
use crate::store::{ArangoStore, MemoryStore, TaxonRecord, TaxonomyGateway, TaxonomyStore};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use taxoscope_core::{
    ErrorScope, ExpansionState, Gesture, InteractionController, Rank, TaxoError, TaxonId,
    TaxonNode,
};

// =============================================================================
// STORE SELECTION
// =============================================================================

/// Open the fixture store if one was given, ArangoDB otherwise.
fn open_store(
    config: &Config,
    fixture: Option<&Path>,
) -> Result<Arc<dyn TaxonomyStore>, TaxoError> {
    match fixture {
        Some(path) => Ok(Arc::new(MemoryStore::from_file(path)?)),
        None => {
            tracing::debug!(
                "Connecting to ArangoDB at {} (database '{}')",
                config.database.url,
                config.database.name
            );
            Ok(Arc::new(ArangoStore::new(&config.database)?))
        }
    }
}

fn open_gateway(config: &Config, fixture: Option<&Path>) -> Result<TaxonomyGateway, TaxoError> {
    Ok(TaxonomyGateway::new(
        open_store(config, fixture)?,
        config.hierarchy()?,
        config.root.name.clone(),
    ))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), TaxoError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| TaxoError::SerializationError(e.to_string()))?;
    println!("{}", json);
    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(
    mut config: Config,
    fixture: Option<&Path>,
    host: Option<String>,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
) -> Result<(), TaxoError> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if static_dir.is_some() {
        config.server.static_dir = static_dir;
    }

    let gateway = open_gateway(&config, fixture)?;
    let controller = InteractionController::new(gateway.hierarchy().clone(), gateway.root_name());
    let session = SessionHandle::spawn(controller, gateway.store());

    println!("Taxoscope Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.addr());
    println!("  Store:    {}", gateway.store().backend());
    println!("  Root:     {}", gateway.root_name());
    println!("  Ranks:    {}", gateway.hierarchy().levels().len());
    println!();
    println!("Endpoints:");
    println!("  GET  /api/v1/root                       - Root taxon");
    println!("  GET  /api/v1/taxon/{{rank}}/{{key}}          - Taxon with summary");
    println!("  GET  /api/v1/taxon/{{rank}}/{{key}}/children - Immediate children");
    println!("  POST /api/v1/session/gesture            - Click / hover a node");
    println!("  GET  /api/v1/session/events             - Session event stream");
    println!("  GET  /health                            - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(AppState::new(gateway, session, config.server)).await
}

// =============================================================================
// LOOKUP COMMANDS
// =============================================================================

/// Show the root taxon.
pub async fn cmd_root(
    config: &Config,
    fixture: Option<&Path>,
    json_mode: bool,
) -> Result<(), TaxoError> {
    let root = open_gateway(config, fixture)?.fetch_root().await?;

    if json_mode {
        return print_json(&root);
    }
    println!("Root taxon:");
    println!("  Name: {}", root.name);
    println!("  Rank: {}", root.rank);
    println!("  Id:   {}", root.id);
    Ok(())
}

/// Show one taxon with its summary.
pub async fn cmd_taxon(
    config: &Config,
    fixture: Option<&Path>,
    json_mode: bool,
    rank: &str,
    key: &str,
) -> Result<(), TaxoError> {
    let record: TaxonRecord = open_gateway(config, fixture)?
        .fetch_taxon(&Rank::new(rank), key)
        .await?;

    if json_mode {
        return print_json(&record);
    }
    println!("{} ({})", record.node.name, record.node.rank);
    println!("  Id:      {}", record.node.id);
    if let Some(url) = &record.detail.url {
        println!("  Source:  {}", url);
    }
    if let Some(image) = &record.detail.image {
        println!("  Image:   {}", image);
    }
    if !record.detail.summary.is_empty() {
        println!();
        println!("{}", record.detail.summary);
    }
    Ok(())
}

/// List the immediate children of a taxon.
pub async fn cmd_children(
    config: &Config,
    fixture: Option<&Path>,
    json_mode: bool,
    rank: &str,
    key: &str,
) -> Result<(), TaxoError> {
    let gateway = open_gateway(config, fixture)?;
    let parent = gateway.fetch_taxon(&Rank::new(rank), key).await?.node;
    let children = gateway.fetch_children(&parent).await?;

    if json_mode {
        return print_json(&serde_json::json!({
            "parent": parent,
            "children": children,
        }));
    }
    println!("{} ({}): {} children", parent.name, parent.rank, children.len());
    for child in &children {
        println!("  {:<32} {}", child.name, child.id);
    }
    Ok(())
}

// =============================================================================
// EXPLORE COMMAND
// =============================================================================

/// Expand the taxonomy level by level through a session, then print the tree.
pub async fn cmd_explore(
    config: &Config,
    fixture: Option<&Path>,
    json_mode: bool,
    verbose: bool,
    depth: usize,
    timeout_secs: u64,
) -> Result<(), TaxoError> {
    let gateway = open_gateway(config, fixture)?;
    let timeout = Duration::from_secs(timeout_secs);
    let controller = InteractionController::new(gateway.hierarchy().clone(), gateway.root_name());
    let session = SessionHandle::spawn(controller, gateway.store());
    let mut events = session.subscribe();

    session.start().await?;
    let mut snapshot = session.settle(timeout).await?;
    let Some(root) = snapshot.root.clone() else {
        let reason = std::iter::from_fn(|| events.try_recv().ok())
            .find_map(|event| match event {
                SessionEvent::Error {
                    scope: ErrorScope::Fatal,
                    message,
                } => Some(message),
                _ => None,
            })
            .unwrap_or_else(|| "no response".to_string());
        return Err(TaxoError::NotFound(format!(
            "root '{}' did not load: {}",
            gateway.root_name(),
            reason
        )));
    };

    let mut frontier = vec![root.clone()];
    for level in 0..depth {
        for id in &frontier {
            session.gesture(Gesture::Click { id: id.clone() }).await?;
        }
        snapshot = session.settle(timeout).await?;
        frontier = next_frontier(&snapshot, &frontier);
        tracing::debug!(
            "Level {} done, {} nodes in graph",
            level + 1,
            snapshot.graph.nodes.len()
        );
        if frontier.is_empty() {
            break;
        }
    }

    if json_mode {
        return print_json(&snapshot);
    }
    print_tree(&snapshot, &root, verbose);
    println!();
    println!(
        "{} taxa, {} membership edges",
        snapshot.graph.nodes.len(),
        snapshot.graph.edges.len()
    );
    Ok(())
}

fn next_frontier(snapshot: &SessionSnapshot, frontier: &[TaxonId]) -> Vec<TaxonId> {
    snapshot
        .graph
        .edges
        .iter()
        .filter(|edge| frontier.contains(&edge.source))
        .map(|edge| edge.target.clone())
        .collect()
}

fn print_tree(snapshot: &SessionSnapshot, root: &TaxonId, verbose: bool) {
    for line in tree_lines(snapshot, root, verbose) {
        println!("{}", line);
    }
}

/// Depth-first outline of the graph below `root`. A node reached a second
/// time is listed with `(see above)` and not descended into again.
fn tree_lines(snapshot: &SessionSnapshot, root: &TaxonId, verbose: bool) -> Vec<String> {
    let nodes: BTreeMap<&TaxonId, &TaxonNode> =
        snapshot.graph.nodes.iter().map(|n| (&n.id, n)).collect();
    let states: BTreeMap<&TaxonId, &ExpansionState> =
        snapshot.states.iter().map(|s| (&s.id, &s.state)).collect();
    let mut children: BTreeMap<&TaxonId, Vec<&TaxonId>> = BTreeMap::new();
    for edge in &snapshot.graph.edges {
        children.entry(&edge.source).or_default().push(&edge.target);
    }

    let mut lines = Vec::new();
    let mut visited = BTreeSet::new();
    let mut stack = vec![(root, 0usize)];
    while let Some((id, indent)) = stack.pop() {
        let Some(node) = nodes.get(id) else { continue };
        if !visited.insert(id) {
            lines.push(format!(
                "{:indent$}{} ({}) (see above)",
                "",
                node.name,
                node.rank,
                indent = indent * 2
            ));
            continue;
        }
        let marker = match states.get(id) {
            Some(ExpansionState::Failed { reason }) => format!("  [failed: {}]", reason),
            Some(state) if verbose => format!("  [{:?}]", state),
            _ => String::new(),
        };
        lines.push(format!(
            "{:indent$}{} ({}){}",
            "",
            node.name,
            node.rank,
            marker,
            indent = indent * 2
        ));

        if let Some(kids) = children.get(id) {
            stack.extend(kids.iter().rev().map(|kid| (*kid, indent + 1)));
        }
    }
    lines
}

// =============================================================================
// RANKS COMMAND
// =============================================================================

/// Show the rank hierarchy table.
pub fn cmd_ranks(config: &Config, json_mode: bool, verbose: bool) -> Result<(), TaxoError> {
    let hierarchy = config.hierarchy()?;

    if json_mode {
        return print_json(&hierarchy.levels());
    }
    println!("{:<10} {:<16} {:<18} anchor", "rank", "taxa", "members");
    for level in hierarchy.levels() {
        println!(
            "{:<10} {:<16} {:<18} {}",
            level.rank.as_str(),
            level.entity_collection,
            level.edge_collection,
            level.anchor.field()
        );
    }
    if verbose {
        println!();
        println!(
            "Root '{}' is looked up in {}",
            config.root.name,
            hierarchy.root_level().entity_collection
        );
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
