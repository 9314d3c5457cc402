//! Engine integration tests over in-memory collaborators

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use guit::strategies::JsonBuildStrategy;
use guit::{
    BuildError, BuildFailure, BuildStrategy, Discovery, DiscoveryError, Engine, EngineError, HelperError, Node,
    ROOT_TITLE, ReportError, ReportResult, ReportStrategy, RunState, ScanConfig, async_trait,
};
use tokio::sync::Barrier;

const ROOT: &str = "/mem";

// ============================================================================
// Collaborators
// ============================================================================

/// Discovery over a shared pattern -> files table. Unknown patterns yield nothing.
#[derive(Clone, Default)]
struct MemoryDiscovery {
    table: Arc<Mutex<HashMap<String, Vec<PathBuf>>>>,
}

impl MemoryDiscovery {
    fn with(self, pattern: &str, files: &[&str]) -> Self {
        self.set(pattern, files);
        self
    }

    fn set(&self, pattern: &str, files: &[&str]) {
        let files = files.iter().map(|f| Path::new(ROOT).join(f)).collect();
        self.table.lock().unwrap().insert(format!("{ROOT}/{pattern}"), files);
    }
}

#[async_trait]
impl Discovery for MemoryDiscovery {
    async fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        Ok(self.table.lock().unwrap().get(pattern).cloned().unwrap_or_default())
    }
}

struct FailingDiscovery;

#[async_trait]
impl Discovery for FailingDiscovery {
    async fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        Err(DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            message: "unreadable".to_string(),
        })
    }
}

/// Both lookups must be in flight at once to get past the barrier.
struct RendezvousDiscovery {
    barrier: Barrier,
    inner: MemoryDiscovery,
}

#[async_trait]
impl Discovery for RendezvousDiscovery {
    async fn discover(&self, pattern: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        self.barrier.wait().await;
        self.inner.discover(pattern).await
    }
}

/// JSON sources keyed by path, matched by extension.
struct SourceBuilder {
    name: &'static str,
    extension: &'static str,
    sources: HashMap<PathBuf, String>,
}

impl SourceBuilder {
    fn new(name: &'static str, extension: &'static str) -> Self {
        Self {
            name,
            extension,
            sources: HashMap::new(),
        }
    }

    fn source(mut self, file: &str, json: &str) -> Self {
        self.sources.insert(Path::new(ROOT).join(file), json.to_string());
        self
    }
}

impl BuildStrategy for SourceBuilder {
    fn matches(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == self.extension)
    }

    fn build(&self, path: &Path) -> Result<Node, BuildError> {
        let source = self
            .sources
            .get(path)
            .ok_or_else(|| BuildError::Parse(format!("no source for {}", path.display())))?;
        JsonBuildStrategy::parse(source)
    }

    fn name(&self) -> &str {
        self.name
    }
}

type Log = Arc<Mutex<Vec<String>>>;

/// Appends one line per event: `started`, `suite_started(A@2)`, ...
struct Recorder {
    log: Log,
    prefix: &'static str,
    yield_first: bool,
}

impl Recorder {
    fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            prefix: "",
            yield_first: false,
        }
    }

    fn named(log: &Log, prefix: &'static str) -> Self {
        Self {
            prefix,
            ..Self::new(log)
        }
    }

    async fn record(&self, event: &str, node: Option<&Node>) -> ReportResult {
        if self.yield_first {
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        let line = match node {
            Some(node) => format!("{}{event}({}@{})", self.prefix, node.title(), node.depth()),
            None => format!("{}{event}", self.prefix),
        };
        self.log.lock().unwrap().push(line);
        Ok(())
    }
}

#[async_trait]
impl ReportStrategy for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn started(&mut self) -> ReportResult {
        self.record("started", None).await
    }

    async fn suite_started(&mut self, suite: &Node) -> ReportResult {
        self.record("suite_started", Some(suite)).await
    }

    async fn spec_started(&mut self, spec: &Node) -> ReportResult {
        self.record("spec_started", Some(spec)).await
    }

    async fn spec_done(&mut self, spec: &Node) -> ReportResult {
        self.record("spec_done", Some(spec)).await
    }

    async fn suite_done(&mut self, suite: &Node) -> ReportResult {
        self.record("suite_done", Some(suite)).await
    }

    async fn done(&mut self) -> ReportResult {
        self.record("done", None).await
    }
}

/// Implements a single hook, and fails it.
struct FailsOnSpecStart;

#[async_trait]
impl ReportStrategy for FailsOnSpecStart {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn spec_started(&mut self, _spec: &Node) -> ReportResult {
        Err(ReportError::Other("boom".to_string()))
    }
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn config() -> ScanConfig {
    ScanConfig::new("specs").with_root(ROOT)
}

const LOGIN: &str = r#"{ "title": "A", "children": [{ "title": "a1" }, { "title": "a2" }] }"#;
const SINGLE: &str = r#"{ "title": "b" }"#;

fn two_file_engine(log: &Log) -> Engine {
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json", "specs/b.json"]);
    let mut engine = Engine::new(discovery).with_config(config());
    engine
        .builder(
            SourceBuilder::new("json", "json")
                .source("specs/a.json", LOGIN)
                .source("specs/b.json", SINGLE),
        )
        .reporter(Recorder::new(log));
    engine
}

// ============================================================================
// Traversal
// ============================================================================

#[tokio::test]
async fn test_all_reports_depth_first_enter_and_exit() {
    let log = log();
    let mut engine = two_file_engine(&log);

    let report = engine.test_all().await.unwrap();

    assert_eq!(
        entries(&log),
        vec![
            "started",
            "suite_started(all specs@1)",
            "suite_started(A@2)",
            "spec_started(a1@3)",
            "spec_done(a1@3)",
            "spec_started(a2@3)",
            "spec_done(a2@3)",
            "suite_done(A@2)",
            "spec_started(b@2)",
            "spec_done(b@2)",
            "suite_done(all specs@1)",
            "done",
        ]
    );
    assert!(report.is_clean());
    assert_eq!(report.root.title(), ROOT_TITLE);
    assert_eq!(report.spec_count(), 3);
    assert_eq!(report.suite_count(), 1);
    assert_eq!(engine.state(), RunState::Done);
}

#[tokio::test]
async fn starts_and_dones_are_balanced() {
    let log = log();
    let mut engine = two_file_engine(&log);
    engine.test_all().await.unwrap();

    let mut open: Vec<String> = Vec::new();
    for line in entries(&log) {
        let Some((event, node)) = line.split_once('(') else {
            continue;
        };
        if event.ends_with("_started") {
            open.push(node.to_string());
        } else {
            assert_eq!(open.pop().as_deref(), Some(node), "{line} closes the wrong node");
        }
    }
    assert!(open.is_empty());
}

#[tokio::test]
async fn empty_run_emits_only_started_and_done() {
    let log = log();
    let mut engine = Engine::new(MemoryDiscovery::default()).with_config(config());
    engine.builder(JsonBuildStrategy).reporter(Recorder::new(&log));

    let report = engine.test_all().await.unwrap();

    assert_eq!(entries(&log), vec!["started", "done"]);
    assert!(!report.root.has_children());
    assert_eq!(engine.state(), RunState::Done);
}

#[tokio::test]
async fn reporter_removing_a_child_mid_run_keeps_pairs_matched() {
    struct Pruner;

    #[async_trait]
    impl ReportStrategy for Pruner {
        async fn suite_started(&mut self, suite: &Node) -> ReportResult {
            if suite.title() != "A" {
                return Ok(());
            }
            match suite.get_child(0) {
                Some(first) => suite.remove_child(&first).map_err(|e| ReportError::Other(e.to_string())),
                None => Ok(()),
            }
        }
    }

    let log = log();
    let mut engine = two_file_engine(&log);
    engine.reporter(Pruner);
    // Recorder runs before Pruner on every event, so it still saw the unpruned suite enter.
    engine.test_all().await.unwrap();

    let seen = entries(&log);
    assert!(!seen.iter().any(|e| e.contains("a1")));
    assert!(seen.contains(&"spec_done(a2@3)".to_string()));
    assert!(seen.contains(&"suite_done(A@2)".to_string()));
}

// ============================================================================
// Reporters
// ============================================================================

#[tokio::test]
async fn reporters_see_every_event_in_registration_order() {
    let log = log();
    let discovery = MemoryDiscovery::default().with("specs", &["specs/b.json"]);
    let mut engine = Engine::new(discovery).with_config(config());
    engine
        .builder(SourceBuilder::new("json", "json").source("specs/b.json", SINGLE))
        .reporter(Recorder {
            yield_first: true,
            ..Recorder::named(&log, "1:")
        })
        .reporter(Recorder::named(&log, "2:"));

    engine.test_all().await.unwrap();

    let seen = entries(&log);
    assert_eq!(seen.len(), 2 * 6);
    for pair in seen.chunks(2) {
        let first = pair[0].strip_prefix("1:").unwrap();
        let second = pair[1].strip_prefix("2:").unwrap();
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn failing_hook_is_recorded_without_stopping_dispatch() {
    let log = log();
    let mut engine = two_file_engine(&log);
    engine.reporter(FailsOnSpecStart);

    let report = engine.test_all().await.unwrap();

    assert_eq!(entries(&log).len(), 12);
    assert_eq!(report.report_failures.len(), 3);
    assert!(report.build_failures.is_empty());
    assert!(!report.is_clean());
    let failure = &report.report_failures[0];
    assert_eq!(failure.reporter, "flaky");
    assert_eq!(failure.event, "spec_started");
    assert_eq!(engine.state(), RunState::Done);
}

// ============================================================================
// Building
// ============================================================================

#[tokio::test]
async fn unmatched_file_is_skipped_and_recorded() {
    let log = log();
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json", "specs/b.txt", "specs/c.json"]);
    let mut engine = Engine::new(discovery).with_config(config());
    engine
        .builder(
            SourceBuilder::new("json", "json")
                .source("specs/a.json", LOGIN)
                .source("specs/c.json", r#"{ "title": "C" }"#),
        )
        .reporter(Recorder::new(&log));

    let report = engine.test_all().await.unwrap();

    let titles: Vec<_> = report.root.children().iter().map(|c| c.title().to_string()).collect();
    assert_eq!(titles, vec!["A", "C"]);
    assert_eq!(report.built.len(), 2);
    assert_eq!(report.build_failures.len(), 1);
    assert!(matches!(
        &report.build_failures[0],
        BuildFailure::NoBuilderFound { path } if path.ends_with("specs/b.txt")
    ));
    assert!(entries(&log).contains(&"spec_started(C@2)".to_string()));
}

#[tokio::test]
async fn failing_build_is_isolated() {
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json", "specs/bad.json"]);
    let mut engine = Engine::new(discovery).with_config(config());
    engine.builder(
        SourceBuilder::new("json", "json")
            .source("specs/a.json", LOGIN)
            .source("specs/bad.json", "{ not json"),
    );

    let report = engine.test_all().await.unwrap();

    assert_eq!(report.root.child_count(), 1);
    match &report.build_failures[..] {
        [BuildFailure::Build { path, builder, .. }] => {
            assert!(path.ends_with("specs/bad.json"));
            assert_eq!(builder, "json");
        }
        other => panic!("unexpected failures: {other:?}"),
    }
}

#[tokio::test]
async fn first_matching_builder_wins() {
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json"]);
    let mut engine = Engine::new(discovery).with_config(config());
    engine
        .builder(SourceBuilder::new("first", "json").source("specs/a.json", r#"{ "title": "from first" }"#))
        .builder(SourceBuilder::new("second", "json").source("specs/a.json", r#"{ "title": "from second" }"#));

    let report = engine.test_all().await.unwrap();

    assert_eq!(report.root.get_child(0).unwrap().title(), "from first");
}

#[tokio::test]
async fn built_subtrees_hang_under_the_root() {
    let log = log();
    let mut engine = two_file_engine(&log);
    let report = engine.test_all().await.unwrap();

    let a = report.root.get_child(0).unwrap();
    assert!(a.parent().unwrap().ptr_eq(&report.root));
    assert_eq!(a.get_child(1).unwrap().path_titles(), vec![ROOT_TITLE, "A", "a2"]);
}

#[tokio::test]
async fn files_without_builders_are_fatal() {
    let log = log();
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json"]);
    let mut engine = Engine::new(discovery).with_config(config());
    engine.reporter(Recorder::new(&log));

    let err = engine.test_all().await.unwrap_err();

    assert!(matches!(err, EngineError::NoBuilders));
    assert!(entries(&log).is_empty());
    assert_eq!(engine.state(), RunState::Failed);
}

// ============================================================================
// Discovery and configuration
// ============================================================================

#[tokio::test]
async fn discovery_failure_emits_nothing() {
    let log = log();
    let mut engine = Engine::new(FailingDiscovery).with_config(config());
    engine.builder(JsonBuildStrategy).reporter(Recorder::new(&log));

    let err = engine.test_all().await.unwrap_err();

    assert!(matches!(err, EngineError::Discovery(_)));
    assert!(entries(&log).is_empty());
    assert_eq!(engine.state(), RunState::Failed);
}

#[tokio::test]
async fn helper_and_spec_discovery_run_concurrently() {
    let inner = MemoryDiscovery::default()
        .with("helpers", &["helpers/setup.json"])
        .with("specs", &["specs/b.json"]);
    let discovery = RendezvousDiscovery {
        barrier: Barrier::new(2),
        inner,
    };
    let mut engine = Engine::new(discovery).with_config(config().with_helpers("helpers"));
    engine.builder(SourceBuilder::new("json", "json").source("specs/b.json", SINGLE));

    let report = tokio::time::timeout(Duration::from_secs(5), engine.test_all())
        .await
        .expect("discovery lookups were serialized")
        .unwrap();

    assert_eq!(report.root.child_count(), 1);
}

#[tokio::test]
async fn helpers_are_loaded_but_never_built() {
    let loaded: Log = log();
    let discovery = MemoryDiscovery::default()
        .with("helpers", &["helpers/setup.json"])
        .with("specs", &["specs/b.json"]);
    let mut engine = Engine::new(discovery).with_config(config().with_helpers("helpers"));
    let sink = loaded.clone();
    engine
        .builder(SourceBuilder::new("json", "json").source("specs/b.json", SINGLE))
        .helper_loader(move |path: &Path| -> Result<(), HelperError> {
            sink.lock().unwrap().push(path.display().to_string());
            Ok(())
        });

    let report = engine.test_all().await.unwrap();

    assert_eq!(entries(&loaded), vec!["/mem/helpers/setup.json"]);
    assert_eq!(engine.helper_files(), [PathBuf::from("/mem/helpers/setup.json")]);
    assert_eq!(report.built, vec![PathBuf::from("/mem/specs/b.json")]);
    assert_eq!(report.root.child_count(), 1);
}

#[tokio::test]
async fn helper_failure_aborts_the_run() {
    let discovery = MemoryDiscovery::default()
        .with("helpers", &["helpers/setup.json"])
        .with("specs", &["specs/b.json"]);
    let mut engine = Engine::new(discovery).with_config(config().with_helpers("helpers"));
    engine
        .builder(JsonBuildStrategy)
        .helper_loader(|path: &Path| -> Result<(), HelperError> { Err(HelperError::new(path, "syntax error")) });

    let err = engine.test_all().await.unwrap_err();

    assert!(matches!(err, EngineError::Helper(_)));
    assert!(err.to_string().contains("syntax error"));
    assert_eq!(engine.state(), RunState::Failed);
}

#[tokio::test]
async fn unconfigured_engine_refuses_to_run() {
    let mut engine = Engine::new(MemoryDiscovery::default());
    assert!(matches!(engine.test_all().await, Err(EngineError::NotConfigured)));
    assert!(matches!(engine.test("specs/a.json").await, Err(EngineError::NotConfigured)));
}

#[tokio::test]
async fn empty_specs_pattern_is_a_config_error() {
    let mut engine = Engine::new(MemoryDiscovery::default()).with_config(ScanConfig::new(" ").with_root(ROOT));
    assert!(matches!(engine.test_all().await, Err(EngineError::Config(_))));
}

#[tokio::test]
async fn scan_stores_config_and_files() {
    let discovery = MemoryDiscovery::default().with("other", &["other/x.json"]);
    let mut engine = Engine::new(discovery);

    let scanned = engine.scan(ScanConfig::new("other").with_root(ROOT)).await.unwrap();

    assert_eq!(scanned.specs, vec![PathBuf::from("/mem/other/x.json")]);
    assert!(scanned.helpers.is_empty());
    assert_eq!(engine.config().map(|c| c.specs.as_str()), Some("other"));
    assert_eq!(engine.state(), RunState::Idle);
}

#[tokio::test]
async fn test_all_rescans_before_running() {
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json"]);
    let handle = discovery.clone();
    let mut engine = Engine::new(discovery).with_config(config());
    engine.builder(
        SourceBuilder::new("json", "json")
            .source("specs/a.json", LOGIN)
            .source("specs/b.json", SINGLE),
    );

    assert_eq!(engine.test_all().await.unwrap().root.child_count(), 1);
    handle.set("specs", &["specs/a.json", "specs/b.json"]);
    assert_eq!(engine.test_all().await.unwrap().root.child_count(), 2);
}

// ============================================================================
// Single file
// ============================================================================

#[tokio::test]
async fn test_runs_one_discovered_file() {
    let log = log();
    let mut engine = two_file_engine(&log);

    let report = engine.test("specs/b.json").await.unwrap();

    assert_eq!(report.built, vec![PathBuf::from("/mem/specs/b.json")]);
    assert_eq!(
        entries(&log),
        vec![
            "started",
            "suite_started(all specs@1)",
            "spec_started(b@2)",
            "spec_done(b@2)",
            "suite_done(all specs@1)",
            "done",
        ]
    );
}

#[tokio::test]
async fn test_accepts_absolute_paths() {
    let log = log();
    let mut engine = two_file_engine(&log);
    let report = engine.test("/mem/specs/a.json").await.unwrap();
    assert_eq!(report.spec_count(), 2);
}

#[tokio::test]
async fn test_rejects_undiscovered_file() {
    let log = log();
    let mut engine = two_file_engine(&log);

    let err = engine.test("specs/missing.json").await.unwrap_err();

    match err {
        EngineError::FileNotFound { path } => assert_eq!(path, PathBuf::from("/mem/specs/missing.json")),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
    assert!(entries(&log).is_empty());
    assert_eq!(engine.state(), RunState::Failed);
}

#[tokio::test]
async fn test_resolves_dot_segments_before_matching() {
    let log = log();
    let mut engine = two_file_engine(&log);

    let report = engine.test("specs/../specs/./b.json").await.unwrap();
    assert_eq!(report.built, vec![PathBuf::from("/mem/specs/b.json")]);

    let report = engine.test("/mem/other/../specs/a.json").await.unwrap();
    assert_eq!(report.spec_count(), 2);
}

#[tokio::test]
async fn test_with_invalid_config_marks_run_failed() {
    let log = log();
    let discovery = MemoryDiscovery::default().with("specs", &["specs/a.json"]);
    let mut engine = Engine::new(discovery).with_config(ScanConfig::new("").with_root(ROOT));
    engine.builder(JsonBuildStrategy).reporter(Recorder::new(&log));

    let err = engine.test("specs/a.json").await.unwrap_err();

    assert!(matches!(err, EngineError::Config(_)));
    assert_eq!(engine.state(), RunState::Failed);
    assert!(entries(&log).is_empty());
}

#[tokio::test]
async fn scan_records_resolved_root() {
    let mut engine = Engine::new(MemoryDiscovery::default());
    let scanned = engine.scan(config()).await.unwrap();
    assert_eq!(scanned.root, PathBuf::from(ROOT));
}

// ============================================================================
// Isolation
// ============================================================================

#[tokio::test]
async fn independent_engines_do_not_share_registries() {
    let first_log = log();
    let second_log = log();
    let mut first = two_file_engine(&first_log);

    let discovery = MemoryDiscovery::default().with("specs", &["specs/c.json"]);
    let mut second = Engine::new(discovery).with_config(config());
    second
        .builder(SourceBuilder::new("json", "json").source("specs/c.json", r#"{ "title": "C" }"#))
        .reporter(Recorder::new(&second_log));

    let (a, b) = tokio::join!(first.test_all(), second.test_all());

    assert_eq!(a.unwrap().root.child_count(), 2);
    assert_eq!(b.unwrap().root.child_count(), 1);
    assert!(!entries(&first_log).iter().any(|e| e.contains("C@")));
    assert_eq!(entries(&second_log).len(), 6);
}
