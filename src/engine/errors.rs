//! Fatal engine errors
//!
//! Per-file build problems are not here: they are [`BuildFailure`](super::BuildFailure)s, recorded in
//! the run report while the run continues.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use super::discovery::DiscoveryError;
use super::helpers::HelperError;
use crate::config::ConfigError;

#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    #[diagnostic(code(guit::config), help("`specs` must be a non-empty pattern such as \"specs/**/*.json\""))]
    Config(#[from] ConfigError),

    #[error("no scan configuration set")]
    #[diagnostic(code(guit::not_configured), help("call `scan` first or build the engine `with_config`"))]
    NotConfigured,

    #[error("discovery failed: {0}")]
    #[diagnostic(code(guit::discovery))]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    #[diagnostic(code(guit::helper))]
    Helper(#[from] HelperError),

    #[error("{} is not among the discovered spec files", .path.display())]
    #[diagnostic(code(guit::file_not_found), help("check that the file matches the `specs` pattern"))]
    FileNotFound { path: PathBuf },

    #[error("no build strategy registered")]
    #[diagnostic(code(guit::no_builders), help("register at least one strategy with `Engine::builder`"))]
    NoBuilders,
}
