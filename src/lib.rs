#![forbid(unsafe_code)]
//! guit: pluggable test orchestration
//!
//! guit discovers spec files, turns each into a suite/spec tree with a pluggable build strategy,
//! walks the assembled tree and reports every lifecycle event to pluggable report strategies.
//!
//! ```rust,no_run
//! use guit::{Engine, ScanConfig};
//! use guit::strategies::{ConsoleReporter, JsonBuildStrategy};
//!
//! # async fn demo() -> Result<(), guit::EngineError> {
//! let mut engine = Engine::default().with_config(ScanConfig::new("specs/**/*.json"));
//! engine.builder(JsonBuildStrategy).reporter(ConsoleReporter::stderr(true));
//! let report = engine.test_all().await?;
//! assert!(report.build_failures.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Panic Policy
//!
//! - **Production code**: `Result` with `?` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod config;
pub mod engine;
pub mod strategies;

pub use async_trait::async_trait;
pub use guit_core::{Collection, CollectionError, Identity, Node, NodeKind, TreeError, WeakNode};

pub use config::{ConfigError, ScanConfig};
pub use engine::{
    BuildError, BuildFailure, BuildStrategy, Discovery, DiscoveryError, Engine, EngineError, Event, FsDiscovery,
    HelperError, HelperLoader, ROOT_TITLE, ReportError, ReportFailure, ReportResult, ReportStrategy, RunReport,
    RunState, ScanResult,
};
