//! # taxoscope
//!
//! Application layer for Taxoscope: store backends, the session driver that
//! feeds the interaction controller, the HTTP API and the CLI.
//!
//! The expansion logic itself lives in `taxoscope-core`; everything here is
//! I/O around it.

pub mod api;
pub mod cli;
pub mod config;
pub mod session;
pub mod store;
