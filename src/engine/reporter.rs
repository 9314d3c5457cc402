//! Report strategy registry
//!
//! ## ReportStrategy Trait
//!
//! A report strategy observes one run through six optional hooks. Every hook has a no-op default,
//! so a strategy implements only what it cares about; a missing hook is an absent capability, not
//! an error.
//!
//! ## Dispatch
//!
//! Every event goes to every registered reporter (fan-out), in registration order. Each hook is
//! awaited to completion before the next reporter's hook starts, so all reporters observe the same
//! event order and reporter N never overlaps reporter N+1 on the same event.
//!
//! A hook that fails is logged and recorded. It never stops dispatch to the remaining reporters and
//! never aborts the traversal.

use std::any::type_name;
use std::io;

use async_trait::async_trait;
use guit_core::{Node, NodeKind};
use thiserror::Error;

/// Errors a report strategy may return
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

pub type ReportResult = Result<(), ReportError>;

/// Observer of run lifecycle events.
///
/// Node payloads expose at least [`Node::title`] and [`Node::depth`] (root = 1).
#[async_trait]
pub trait ReportStrategy: Send {
    /// Name used in logs and failures.
    fn name(&self) -> &str {
        type_name::<Self>()
    }

    /// Called once, before traversal begins
    async fn started(&mut self) -> ReportResult {
        Ok(())
    }

    /// Called on entering a node that has children
    async fn suite_started(&mut self, _suite: &Node) -> ReportResult {
        Ok(())
    }

    /// Called on entering a node without children
    async fn spec_started(&mut self, _spec: &Node) -> ReportResult {
        Ok(())
    }

    /// Called on leaving a node without children
    async fn spec_done(&mut self, _spec: &Node) -> ReportResult {
        Ok(())
    }

    /// Called on leaving a node that has children
    async fn suite_done(&mut self, _suite: &Node) -> ReportResult {
        Ok(())
    }

    /// Called once, after traversal completes
    async fn done(&mut self) -> ReportResult {
        Ok(())
    }
}

/// A lifecycle event.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Started,
    SuiteStarted(&'a Node),
    SpecStarted(&'a Node),
    SpecDone(&'a Node),
    SuiteDone(&'a Node),
    Done,
}

impl<'a> Event<'a> {
    /// Pre-order event for `node` in the given role.
    pub fn enter(node: &'a Node, kind: NodeKind) -> Self {
        match kind {
            NodeKind::Suite => Event::SuiteStarted(node),
            NodeKind::Spec => Event::SpecStarted(node),
        }
    }

    /// Post-order event for `node` in the given role.
    pub fn exit(node: &'a Node, kind: NodeKind) -> Self {
        match kind {
            NodeKind::Suite => Event::SuiteDone(node),
            NodeKind::Spec => Event::SpecDone(node),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::Started => "started",
            Event::SuiteStarted(_) => "suite_started",
            Event::SpecStarted(_) => "spec_started",
            Event::SpecDone(_) => "spec_done",
            Event::SuiteDone(_) => "suite_done",
            Event::Done => "done",
        }
    }

    pub fn node(&self) -> Option<&'a Node> {
        match *self {
            Event::SuiteStarted(node) | Event::SpecStarted(node) | Event::SpecDone(node) | Event::SuiteDone(node) => {
                Some(node)
            }
            Event::Started | Event::Done => None,
        }
    }
}

/// A reporter hook that returned an error.
#[derive(Debug)]
pub struct ReportFailure {
    pub reporter: String,
    pub event: &'static str,
    pub error: ReportError,
}

/// Registered report strategy.
pub struct Reporter {
    strategy: Box<dyn ReportStrategy>,
}

impl Reporter {
    pub fn new(strategy: impl ReportStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
        }
    }

    pub fn name(&self) -> &str {
        self.strategy.name()
    }

    /// Invoke the hook matching `event`.
    pub async fn dispatch(&mut self, event: Event<'_>) -> ReportResult {
        match event {
            Event::Started => self.strategy.started().await,
            Event::SuiteStarted(node) => self.strategy.suite_started(node).await,
            Event::SpecStarted(node) => self.strategy.spec_started(node).await,
            Event::SpecDone(node) => self.strategy.spec_done(node).await,
            Event::SuiteDone(node) => self.strategy.suite_done(node).await,
            Event::Done => self.strategy.done().await,
        }
    }
}

/// Ordered list of reporters.
#[derive(Default)]
pub struct ReporterRegistry {
    reporters: Vec<Reporter>,
}

impl ReporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, strategy: impl ReportStrategy + 'static) {
        self.reporters.push(Reporter::new(strategy));
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Fan `event` out to every reporter, one at a time, in registration order.
    pub async fn emit(&mut self, event: Event<'_>) -> Vec<ReportFailure> {
        let mut failures = Vec::new();
        for reporter in &mut self.reporters {
            if let Err(error) = reporter.dispatch(event).await {
                tracing::warn!(
                    reporter = reporter.name(),
                    event = event.name(),
                    node = event.node().map(Node::title),
                    %error,
                    "reporter hook failed"
                );
                failures.push(ReportFailure {
                    reporter: reporter.name().to_string(),
                    event: event.name(),
                    error,
                });
            }
        }
        failures
    }
}
