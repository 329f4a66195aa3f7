//! Document tree model used for request/response bodies and partial updates.
//!
//! - [`Node`] / [`Value`]: ordered, case-insensitive JSON-like tree with
//!   `find`, `collect` and `href`-aware serialization
//! - [`diff`] / [`patch`]: structural diff producing [`PatchOp`]s and their application

pub mod diff;
pub mod node;

pub use diff::{diff, patch, PatchKind, PatchOp};
pub use node::{Node, Properties, Value};
