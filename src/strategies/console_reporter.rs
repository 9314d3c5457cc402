//! Console reporter
//!
//! Renders the run as an indented tree, one line per suite and spec, then a summary line.

use std::io::{self, Write};

use async_trait::async_trait;
use guit_core::Node;

use crate::engine::{ReportResult, ReportStrategy};

pub struct ConsoleReporter<W = io::Stderr> {
    out: W,
    color: bool,
    suites: usize,
    specs: usize,
}

impl ConsoleReporter<io::Stderr> {
    pub fn stderr(color: bool) -> Self {
        Self::new(io::stderr(), color)
    }
}

impl<W: Write + Send> ConsoleReporter<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            suites: 0,
            specs: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color { format!("\x1b[{code}m{text}\x1b[0m") } else { text.to_string() }
    }

    fn line(&mut self, node: &Node, text: String) -> io::Result<()> {
        let indent = "  ".repeat(node.depth().saturating_sub(1));
        writeln!(self.out, "{indent}{text}")
    }
}

#[async_trait]
impl<W: Write + Send> ReportStrategy for ConsoleReporter<W> {
    fn name(&self) -> &str {
        "console"
    }

    async fn started(&mut self) -> ReportResult {
        self.suites = 0;
        self.specs = 0;
        writeln!(self.out, "Testing started")?;
        Ok(())
    }

    async fn suite_started(&mut self, suite: &Node) -> ReportResult {
        let text = self.paint("1", suite.title());
        self.line(suite, text)?;
        Ok(())
    }

    async fn spec_started(&mut self, spec: &Node) -> ReportResult {
        let text = format!("- {}", spec.title());
        let text = self.paint("36", &text);
        self.line(spec, text)?;
        Ok(())
    }

    async fn spec_done(&mut self, _spec: &Node) -> ReportResult {
        self.specs += 1;
        Ok(())
    }

    async fn suite_done(&mut self, suite: &Node) -> ReportResult {
        // The run root is not a suite of its own.
        if !suite.is_root() {
            self.suites += 1;
        }
        Ok(())
    }

    async fn done(&mut self) -> ReportResult {
        let summary = format!("Testing done: {} spec(s), {} suite(s)", self.specs, self.suites);
        let summary = self.paint("1;32", &summary);
        writeln!(self.out, "{summary}")?;
        self.out.flush()?;
        Ok(())
    }
}
