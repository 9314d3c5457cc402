//! Build strategy registry
//!
//! A build strategy recognizes one spec-file format and parses a file into a [`Node`] subtree.
//! The registry is ordered and first-match-wins: only the first strategy whose `matches`
//! accepts a path is asked to build it. Results are never cached.

use std::any::type_name;
use std::io;
use std::path::{Path, PathBuf};

use guit_core::{Node, TreeError};
use thiserror::Error;

/// Errors a build strategy may return
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read file: {0}")]
    Io(#[from] io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid tree: {0}")]
    Tree(#[from] TreeError),
}

/// Why a single spec file contributed no subtree to a run.
///
/// These are isolated per file: the engine records them and keeps going.
#[derive(Debug, Error)]
pub enum BuildFailure {
    #[error("no builder matches {}", .path.display())]
    NoBuilderFound { path: PathBuf },

    #[error("builder `{builder}` failed on {}: {source}", .path.display())]
    Build {
        path: PathBuf,
        builder: String,
        #[source]
        source: BuildError,
    },

    #[error("subtree built from {} could not be attached: {source}", .path.display())]
    Attach {
        path: PathBuf,
        #[source]
        source: TreeError,
    },
}

impl BuildFailure {
    pub fn path(&self) -> &Path {
        match self {
            BuildFailure::NoBuilderFound { path }
            | BuildFailure::Build { path, .. }
            | BuildFailure::Attach { path, .. } => path,
        }
    }
}

/// Pluggable parser for one spec-file format.
///
/// `build` is expected to be a pure parse: it must not mutate the filesystem and must not share
/// mutable state between invocations. The returned node is the root of that file's subtree and
/// must not be attached anywhere yet.
pub trait BuildStrategy: Send + Sync {
    /// Does this strategy handle `path`?
    fn matches(&self, path: &Path) -> bool;

    /// Parse `path` into a subtree.
    fn build(&self, path: &Path) -> Result<Node, BuildError>;

    /// Name used in logs and failures.
    fn name(&self) -> &str {
        type_name::<Self>()
    }
}

/// Registered build strategy.
pub struct Builder {
    strategy: Box<dyn BuildStrategy>,
}

impl Builder {
    pub fn new(strategy: impl BuildStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.strategy.matches(path)
    }

    pub fn build(&self, path: &Path) -> Result<Node, BuildError> {
        self.strategy.build(path)
    }
}

/// Ordered list of builders.
#[derive(Default)]
pub struct BuilderRegistry {
    builders: Vec<Builder>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: impl BuildStrategy + 'static) {
        self.builders.push(Builder::new(strategy));
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// First registered builder that matches `path`.
    pub fn find(&self, path: &Path) -> Option<&Builder> {
        self.builders.iter().find(|builder| builder.matches(path))
    }

    /// Build `path` with the first matching builder.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn resolve(&self, path: &Path) -> Result<Node, BuildFailure> {
        let builder = self.find(path).ok_or_else(|| BuildFailure::NoBuilderFound {
            path: path.to_path_buf(),
        })?;

        tracing::debug!(builder = builder.name(), "building spec file");
        builder.build(path).map_err(|source| BuildFailure::Build {
            path: path.to_path_buf(),
            builder: builder.name().to_string(),
            source,
        })
    }
}
