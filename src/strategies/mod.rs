//! Built-in strategies
//!
//! - `json_builder` - `*.json` spec files as nested `{ "title", "children" }` documents
//! - `console_reporter` - indented tree on a terminal
//! - `jsonl_reporter` - one JSON object per lifecycle event

pub mod console_reporter;
pub mod json_builder;
pub mod jsonl_reporter;

pub use console_reporter::ConsoleReporter;
pub use json_builder::JsonBuildStrategy;
pub use jsonl_reporter::{Action, EventRecord, JsonLinesReporter, RecordKind};
