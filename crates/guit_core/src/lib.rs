//! Provide the composite suite/spec tree used by the guit test engine.
//!
//! The crate is deliberately small: an ordered, type-bound [`Collection`] and the composite
//! [`Node`] built on top of it. Build strategies produce `Node` subtrees, the engine grafts them
//! under a synthetic root, and report strategies observe the result during traversal.
//!
//! ## Notes
//!
//! - This is a "model" crate: **no IO**, no global state, no async.
//! - Suite vs spec is a role, not a type. A node with children is a suite, a node without is a spec
//!   (see [`Node::kind`]).
//! - Every node carries a materialized ancestry path (root…self). The path is maintained eagerly on
//!   attach and detach; it is never recomputed lazily on read.

pub mod collection;
pub mod node;

pub use collection::{Collection, CollectionError, Identity};
pub use node::{Node, NodeKind, TreeError, WeakNode};
