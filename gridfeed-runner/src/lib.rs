//! gridfeed runner: settings, the CSV sink and single-run orchestration.
//!
//! This crate builds on `gridfeed-core` to provide:
//! - Layered settings (defaults, TOML file, environment)
//! - A CSV sink subscribed to the `dataEmit` channel
//! - Default date windows per source
//! - `run_source`, which wires sink, dispatcher and adapter for one run

pub mod config;
pub mod runner;
pub mod sink;
pub mod window;

pub use config::{ConfigError, Endpoints, Settings, TernaSettings};
pub use runner::{build_adapter, run_adapter, run_source, RunError, RunSummary, SourceKind};
pub use sink::{CsvSink, SinkError};
