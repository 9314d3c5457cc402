//! Scan configuration
//!
//! The engine needs two patterns: `specs` (required) and `helpers` (optional). Patterns are
//! glob-like and resolved against `root` (the working directory when unset).

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::GlobPattern;

/// Config file picked up by the CLI when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "guit.json";

/// Specs pattern used by the CLI when neither a config file nor `--specs` is given.
pub const DEFAULT_SPECS_PATTERN: &str = "specs/**/*.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{field}` pattern must not be empty")]
    EmptyPattern { field: &'static str },

    #[error("cannot determine working directory: {0}")]
    WorkingDir(#[source] io::Error),
}

/// Discovery configuration for one engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Directory relative patterns are resolved against
    #[serde(default)]
    pub root: Option<PathBuf>,
    /// Pattern for helper files (loaded for side effects, never part of the tree)
    #[serde(default)]
    pub helpers: Option<String>,
    /// Pattern for spec files
    pub specs: String,
}

impl ScanConfig {
    /// Create a config with a specs pattern and no helpers.
    pub fn new(specs: impl Into<String>) -> Self {
        Self {
            root: None,
            helpers: None,
            specs: specs.into(),
        }
    }

    /// Set the helpers pattern
    pub fn with_helpers(mut self, helpers: impl Into<String>) -> Self {
        self.helpers = Some(helpers.into());
        self
    }

    /// Set the root directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Parse a config from JSON text.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(source).map_err(|source| ConfigError::Parse {
            origin: "<inline>".to_string(),
            source,
        })
    }

    /// Read and parse a JSON config file.
    ///
    /// A relative `root` inside the file is taken relative to the file's directory.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = serde_json::from_str(&source).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new("."));
        config.root = Some(match config.root.take() {
            Some(root) if root.is_relative() => base.join(root),
            Some(root) => root,
            None => base.to_path_buf(),
        });
        Ok(config)
    }

    /// Reject empty patterns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.specs.trim().is_empty() {
            return Err(ConfigError::EmptyPattern { field: "specs" });
        }
        if self.helpers.as_deref().is_some_and(|h| h.trim().is_empty()) {
            return Err(ConfigError::EmptyPattern { field: "helpers" });
        }
        Ok(())
    }

    /// Absolute root directory.
    pub fn resolved_root(&self) -> Result<PathBuf, ConfigError> {
        let cwd = || env::current_dir().map_err(ConfigError::WorkingDir);
        match &self.root {
            Some(root) if root.is_absolute() => Ok(root.clone()),
            Some(root) => Ok(cwd()?.join(root)),
            None => cwd(),
        }
    }

    /// Join a relative `pattern` onto `root`; absolute patterns pass through.
    ///
    /// The root is escaped, so glob characters in directory names match literally.
    pub fn resolve_pattern(root: &Path, pattern: &str) -> String {
        if Path::new(pattern).is_absolute() {
            pattern.to_string()
        } else {
            let pattern = pattern.trim_start_matches("./");
            let root = GlobPattern::escape(&root.display().to_string());
            format!("{}/{}", root.trim_end_matches('/'), pattern)
        }
    }
}
