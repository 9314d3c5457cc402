//! JSON spec files
//!
//! ```json
//! {
//!   "title": "Login page",
//!   "children": [
//!     { "title": "shows the form" },
//!     { "title": "validation", "children": [{ "title": "rejects an empty password" }] }
//!   ]
//! }
//! ```
//!
//! Every object becomes a node; `children` is optional and defaults to empty.

use std::fs;
use std::path::Path;

use guit_core::{Node, TreeError};
use serde::Deserialize;

use crate::engine::{BuildError, BuildStrategy};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SpecDocument {
    title: String,
    #[serde(default)]
    children: Vec<SpecDocument>,
}

impl SpecDocument {
    fn into_node(self) -> Result<Node, TreeError> {
        let node = Node::new(self.title);
        for child in self.children {
            node.add_child(child.into_node()?)?;
        }
        Ok(node)
    }
}

/// Builds `*.json` spec files.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonBuildStrategy;

impl JsonBuildStrategy {
    /// Parse JSON text into a subtree.
    pub fn parse(source: &str) -> Result<Node, BuildError> {
        let document: SpecDocument = serde_json::from_str(source).map_err(|e| BuildError::Parse(e.to_string()))?;
        Ok(document.into_node()?)
    }
}

impl BuildStrategy for JsonBuildStrategy {
    fn matches(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn build(&self, path: &Path) -> Result<Node, BuildError> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source)
    }

    fn name(&self) -> &str {
        "json"
    }
}
