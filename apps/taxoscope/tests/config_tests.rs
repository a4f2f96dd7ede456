//! File-based configuration and fixture loading tests.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use std::io::Write;
use taxoscope::config::Config;
use taxoscope::store::{MemoryStore, TaxonomyGateway};
use taxoscope_core::{Endpoint, Rank, TaxoError};
use tempfile::NamedTempFile;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_config_file_round_trip() {
    let file = write_temp(
        r#"
        [database]
        url = "http://arango.internal:8529/"
        name = "taxonomy"

        [root]
        name = "Animalia"

        [server]
        port = 9090
        cors_origins = ["*"]

        [[ranks]]
        rank = "kingdom"
        [[ranks]]
        rank = "phylum"
        anchor = "from"
        [[ranks]]
        rank = "class"
        "#,
    );

    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.database.name, "taxonomy");
    assert_eq!(config.server.addr(), "127.0.0.1:9090");
    assert_eq!(config.server.cors_origins, vec!["*"]);

    let table = config.hierarchy().unwrap();
    assert_eq!(table.levels().len(), 3);
    assert_eq!(table.anchor(&Rank::new("phylum")).unwrap(), Endpoint::From);
    assert_eq!(table.next_rank(&Rank::new("class")).unwrap(), None);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::from_file(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(TaxoError::IoError(_))));
}

#[test]
fn test_malformed_config_is_invalid() {
    let file = write_temp("[server]\nport = \"eighty\"\n");
    assert!(matches!(
        Config::from_file(file.path()),
        Err(TaxoError::InvalidConfig(_))
    ));
}

#[test]
fn test_invalid_fixture_is_serialization_error() {
    let file = write_temp("{\"collections\": [1, 2, 3]}");
    assert!(matches!(
        MemoryStore::from_file(file.path()),
        Err(TaxoError::SerializationError(_))
    ));
}

#[tokio::test]
async fn test_bundled_fixture_reaches_species() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures/animalia.json");
    let store = std::sync::Arc::new(MemoryStore::from_file(path).unwrap());
    let config = Config::default();
    let gateway = TaxonomyGateway::new(store, config.hierarchy().unwrap(), config.root.name);

    let mut node = gateway.fetch_root().await.unwrap();
    let mut path = vec![node.name.clone()];
    loop {
        let children = gateway.fetch_children(&node).await.unwrap();
        let Some(first) = children.into_iter().next() else {
            break;
        };
        path.push(first.name.clone());
        node = first;
    }

    assert_eq!(node.rank, Rank::new("species"));
    assert_eq!(
        path,
        vec![
            "Animalia",
            "Chordata",
            "Mammalia",
            "Carnivora",
            "Felidae",
            "Panthera",
            "Panthera leo"
        ]
    );
}
