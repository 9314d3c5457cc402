//! JSON-lines reporter
//!
//! Writes one object per lifecycle event:
//!
//! ```json
//! {"title":"Login","action":"started","type":"suite","pathLength":2}
//! ```
//!
//! `pathLength` is the node depth (root = 1) and is omitted for run-level (`tests`) events. The
//! sink is any `Write`; point it at a socket or pipe to forward results elsewhere.

use std::io::Write;

use async_trait::async_trait;
use guit_core::{Node, NodeKind};
use serde::{Deserialize, Serialize};

use crate::engine::{ReportResult, ReportStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Started,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Tests,
    Suite,
    Spec,
}

impl From<NodeKind> for RecordKind {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Suite => RecordKind::Suite,
            NodeKind::Spec => RecordKind::Spec,
        }
    }
}

/// One serialized event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub title: String,
    pub action: Action,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_length: Option<usize>,
}

impl EventRecord {
    fn run(title: &str, action: Action) -> Self {
        Self {
            title: title.to_string(),
            action,
            kind: RecordKind::Tests,
            path_length: None,
        }
    }

    fn node(node: &Node, kind: NodeKind, action: Action) -> Self {
        Self {
            title: node.title().to_string(),
            action,
            kind: kind.into(),
            path_length: Some(node.depth()),
        }
    }
}

pub struct JsonLinesReporter<W> {
    out: W,
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, record: &EventRecord) -> ReportResult {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> ReportStrategy for JsonLinesReporter<W> {
    fn name(&self) -> &str {
        "jsonl"
    }

    async fn started(&mut self) -> ReportResult {
        self.write(&EventRecord::run("Testing started", Action::Started))
    }

    async fn suite_started(&mut self, suite: &Node) -> ReportResult {
        self.write(&EventRecord::node(suite, NodeKind::Suite, Action::Started))
    }

    async fn spec_started(&mut self, spec: &Node) -> ReportResult {
        self.write(&EventRecord::node(spec, NodeKind::Spec, Action::Started))
    }

    async fn spec_done(&mut self, spec: &Node) -> ReportResult {
        self.write(&EventRecord::node(spec, NodeKind::Spec, Action::Done))
    }

    async fn suite_done(&mut self, suite: &Node) -> ReportResult {
        self.write(&EventRecord::node(suite, NodeKind::Suite, Action::Done))
    }

    async fn done(&mut self) -> ReportResult {
        self.write(&EventRecord::run("Testing done", Action::Done))?;
        self.out.flush()?;
        Ok(())
    }
}
