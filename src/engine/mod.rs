//! Orchestration engine
//!
//! The engine ties discovery, building and reporting together:
//!
//! 1. **Discovering** - helper and spec patterns are resolved concurrently and joined.
//! 2. **Building** - every spec file goes through the [`BuilderRegistry`]; subtrees are grafted
//!    under a synthetic root. A file that cannot be built is recorded and skipped.
//! 3. **Traversing** - depth-first over the root, fanning lifecycle events out to every reporter.
//!
//! ## Modules
//!
//! - `builder` - build strategies and their registry
//! - `reporter` - report strategies, events and fan-out dispatch
//! - `discovery` - discovery boundary and the filesystem default
//! - `helpers` - helper file loading
//! - `errors` - fatal engine errors
//!
//! ## Partial runs
//!
//! Dropping a `test`/`test_all` future before it resolves leaves the engine in a non-terminal
//! state ([`RunState::Traversing`] or earlier). Reporters may then have seen `started` without
//! `done`. The next run starts over from discovery.

pub mod builder;
pub mod discovery;
pub mod errors;
pub mod helpers;
pub mod reporter;

use std::path::{Component, Path, PathBuf};

use guit_core::{Node, NodeKind};

pub use builder::{BuildError, BuildFailure, BuildStrategy, Builder, BuilderRegistry};
pub use discovery::{Discovery, DiscoveryError, FsDiscovery, GlobPattern};
pub use errors::EngineError;
pub use helpers::{HelperError, HelperLoader};
pub use reporter::{Event, ReportError, ReportFailure, ReportResult, ReportStrategy, Reporter, ReporterRegistry};

use crate::config::ScanConfig;

/// Title of the synthetic root every run's subtrees hang under.
pub const ROOT_TITLE: &str = "all specs";

/// Where the engine is in the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Discovering,
    Building,
    Traversing,
    Done,
    Failed,
}

/// Files found by the last scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Absolute directory the patterns were resolved against
    pub root: PathBuf,
    pub helpers: Vec<PathBuf>,
    pub specs: Vec<PathBuf>,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Synthetic root owning every built subtree
    pub root: Node,
    /// Spec files whose subtree made it into the tree, in run order
    pub built: Vec<PathBuf>,
    /// Spec files that contributed nothing
    pub build_failures: Vec<BuildFailure>,
    /// Reporter hooks that returned an error
    pub report_failures: Vec<ReportFailure>,
}

impl RunReport {
    /// No build failures and no reporter failures.
    pub fn is_clean(&self) -> bool {
        self.build_failures.is_empty() && self.report_failures.is_empty()
    }

    /// Number of leaf nodes below the root.
    pub fn spec_count(&self) -> usize {
        self.count(NodeKind::Spec)
    }

    /// Number of container nodes below the root (the root itself excluded).
    pub fn suite_count(&self) -> usize {
        self.count(NodeKind::Suite)
    }

    fn count(&self, kind: NodeKind) -> usize {
        let mut pending = self.root.children();
        let mut total = 0;
        while let Some(node) = pending.pop() {
            if node.kind() == kind {
                total += 1;
            }
            pending.extend(node.children());
        }
        total
    }
}

/// Drop `.` and fold `..` into the preceding segment, without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

enum Visit {
    Enter(Node),
    Exit(Node, NodeKind),
}

/// One orchestration context: its own registries, configuration and discovered files.
///
/// Nothing is global, so independent engines can run side by side in one process.
pub struct Engine {
    builders: BuilderRegistry,
    reporters: ReporterRegistry,
    discovery: Box<dyn Discovery>,
    helper_loader: Option<Box<dyn HelperLoader>>,
    config: Option<ScanConfig>,
    scanned: ScanResult,
    state: RunState,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(FsDiscovery)
    }
}

impl Engine {
    /// Create an engine over a discovery collaborator.
    pub fn new(discovery: impl Discovery + 'static) -> Self {
        Self {
            builders: BuilderRegistry::new(),
            reporters: ReporterRegistry::new(),
            discovery: Box::new(discovery),
            helper_loader: None,
            config: None,
            scanned: ScanResult::default(),
            state: RunState::Idle,
        }
    }

    /// Set the configuration used by [`Engine::test_all`] and [`Engine::test`].
    pub fn with_config(mut self, config: ScanConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Append a build strategy.
    pub fn builder(&mut self, strategy: impl BuildStrategy + 'static) -> &mut Self {
        self.builders.register(strategy);
        self
    }

    /// Append a report strategy.
    pub fn reporter(&mut self, strategy: impl ReportStrategy + 'static) -> &mut Self {
        self.reporters.register(strategy);
        self
    }

    /// Set the loader helper files are passed to after each scan.
    pub fn helper_loader(&mut self, loader: impl HelperLoader + 'static) -> &mut Self {
        self.helper_loader = Some(Box::new(loader));
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn config(&self) -> Option<&ScanConfig> {
        self.config.as_ref()
    }

    pub fn helper_files(&self) -> &[PathBuf] {
        &self.scanned.helpers
    }

    pub fn spec_files(&self) -> &[PathBuf] {
        &self.scanned.specs
    }

    /// Discover helper and spec files, replacing the stored configuration.
    ///
    /// ## Errors
    ///
    /// - [`EngineError::Config`] for an invalid configuration
    /// - [`EngineError::Discovery`] if either discovery fails
    /// - [`EngineError::Helper`] if a helper file fails to load
    #[tracing::instrument(skip_all, fields(specs = %config.specs))]
    pub async fn scan(&mut self, config: ScanConfig) -> Result<&ScanResult, EngineError> {
        self.discover(config).await?;
        self.state = RunState::Idle;
        Ok(&self.scanned)
    }

    /// Run every discovered spec file.
    ///
    /// Re-scans with the stored configuration first, so files added since the last scan are
    /// picked up.
    #[tracing::instrument(skip_all)]
    pub async fn test_all(&mut self) -> Result<RunReport, EngineError> {
        let config = self.config.clone().ok_or(EngineError::NotConfigured)?;
        self.discover(config).await?;
        let files = self.scanned.specs.clone();
        self.run(&files).await
    }

    /// Run a single spec file.
    ///
    /// A relative `path` is taken relative to the configured root.
    ///
    /// ## Errors
    ///
    /// [`EngineError::FileNotFound`] if `path` is not among the discovered spec files.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn test(&mut self, path: impl AsRef<Path>) -> Result<RunReport, EngineError> {
        let config = self.config.clone().ok_or(EngineError::NotConfigured)?;
        self.discover(config).await?;

        let path = path.as_ref();
        let wanted = normalize_lexically(&self.scanned.root.join(path));
        let found = self.scanned.specs.iter().find(|spec| normalize_lexically(spec) == wanted);
        let Some(file) = found.cloned() else {
            self.state = RunState::Failed;
            return Err(EngineError::FileNotFound { path: wanted });
        };
        self.run(&[file]).await
    }

    async fn discover(&mut self, config: ScanConfig) -> Result<(), EngineError> {
        let outcome = self.try_discover(&config).await;
        self.config = Some(config);
        match outcome {
            Ok(scanned) => {
                self.scanned = scanned;
                Ok(())
            }
            Err(e) => {
                self.state = RunState::Failed;
                Err(e)
            }
        }
    }

    async fn try_discover(&mut self, config: &ScanConfig) -> Result<ScanResult, EngineError> {
        config.validate()?;
        let root = config.resolved_root()?;
        self.state = RunState::Discovering;

        let specs_pattern = ScanConfig::resolve_pattern(&root, &config.specs);
        let helpers_pattern = config.helpers.as_deref().map(|p| ScanConfig::resolve_pattern(&root, p));

        let discovery = &self.discovery;
        let helpers = async {
            match &helpers_pattern {
                Some(pattern) => discovery.discover(pattern).await,
                None => Ok(Vec::new()),
            }
        };
        let (helpers, specs) = tokio::try_join!(helpers, discovery.discover(&specs_pattern))?;
        tracing::debug!(helpers = helpers.len(), specs = specs.len(), "discovery complete");

        if let Some(loader) = &self.helper_loader {
            for helper in &helpers {
                loader.load(helper)?;
            }
        }

        Ok(ScanResult { root, helpers, specs })
    }

    async fn run(&mut self, files: &[PathBuf]) -> Result<RunReport, EngineError> {
        self.state = RunState::Building;
        if self.builders.is_empty() && !files.is_empty() {
            self.state = RunState::Failed;
            return Err(EngineError::NoBuilders);
        }

        let root = Node::new(ROOT_TITLE);
        let mut built = Vec::new();
        let mut build_failures = Vec::new();

        for file in files {
            let attached = self.builders.resolve(file).and_then(|subtree| {
                root.add_child(subtree).map_err(|source| BuildFailure::Attach {
                    path: file.clone(),
                    source,
                })
            });
            match attached {
                Ok(()) => built.push(file.clone()),
                Err(failure) => {
                    tracing::warn!(%failure, "skipping spec file");
                    build_failures.push(failure);
                }
            }
        }
        tracing::info!(built = built.len(), failed = build_failures.len(), "run tree assembled");

        self.state = RunState::Traversing;
        let report_failures = self.traverse(&root).await;
        self.state = RunState::Done;

        Ok(RunReport {
            root,
            built,
            build_failures,
            report_failures,
        })
    }

    /// Depth-first walk emitting enter events pre-order and exit events post-order.
    ///
    /// The role used on exit is the one decided on enter, so enter/exit pairs always match even if
    /// a reporter edits the tree mid-run. An empty root is not visited.
    async fn traverse(&mut self, root: &Node) -> Vec<ReportFailure> {
        let mut failures = self.reporters.emit(Event::Started).await;

        let mut stack = Vec::new();
        if root.has_children() {
            stack.push(Visit::Enter(root.clone()));
        }

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(node) => {
                    let kind = node.kind();
                    failures.extend(self.reporters.emit(Event::enter(&node, kind)).await);
                    let children = if kind == NodeKind::Suite { node.children() } else { Vec::new() };
                    stack.push(Visit::Exit(node, kind));
                    stack.extend(children.into_iter().rev().map(Visit::Enter));
                }
                Visit::Exit(node, kind) => {
                    failures.extend(self.reporters.emit(Event::exit(&node, kind)).await);
                }
            }
        }

        failures.extend(self.reporters.emit(Event::Done).await);
        failures
    }
}
