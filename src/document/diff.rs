//! Structural diff and patch over document nodes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::node::{Node, Value};
use crate::error::{ApiError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Add,
    Remove,
    Replace,
}

impl PatchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchKind::Add => "add",
            PatchKind::Remove => "remove",
            PatchKind::Replace => "replace",
        }
    }
}

/// One `{op, path, value}` instruction. Paths are dotted; array elements use their index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOp {
    fn add(path: String, value: &Value) -> Self {
        PatchOp { op: PatchKind::Add, path, value: Some(value.deep_copy()) }
    }

    fn remove(path: String) -> Self {
        PatchOp { op: PatchKind::Remove, path, value: None }
    }

    fn replace(path: String, value: &Value) -> Self {
        PatchOp { op: PatchKind::Replace, path, value: Some(value.deep_copy()) }
    }
}

/// Operations that turn `from` into `to`.
///
/// Keys of `to` are visited first, in order, then keys only `from` has are
/// removed. Array tail removals are emitted from the highest index down so each
/// removal leaves the indices of the remaining ones intact. Emitted values are
/// deep copies and share nothing with `to`.
pub fn diff(from: &Node, to: &Node) -> Vec<PatchOp> {
    let mut ops = Vec::new();
    diff_nodes(from, to, "", &mut ops);
    ops
}

fn diff_nodes(from: &Node, to: &Node, path: &str, ops: &mut Vec<PatchOp>) {
    for key in to.keys() {
        let next = join(path, &key);
        diff_values(from.get(&key), to.get(&key), next, ops);
    }

    let mut removed: Vec<String> = from.keys().into_iter().filter(|k| !to.contains_key(k)).collect();
    if from.is_array() {
        removed.reverse();
    }
    for key in removed {
        ops.push(PatchOp::remove(join(path, &key)));
    }
}

fn diff_values(theirs: Option<&Value>, mine: Option<&Value>, path: String, ops: &mut Vec<PatchOp>) {
    match (theirs, mine) {
        (_, None) => {}
        (None, Some(mine)) => ops.push(PatchOp::add(path, mine)),
        (Some(theirs), Some(mine)) if theirs.kind() != mine.kind() => {
            ops.push(PatchOp::replace(path, mine))
        }
        (Some(Value::Node(theirs)), Some(Value::Node(mine))) => diff_nodes(theirs, mine, &path, ops),
        (Some(theirs), Some(mine)) => {
            if theirs.to_string() != mine.to_string() {
                ops.push(PatchOp::replace(path, mine));
            }
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Apply `ops` to `doc` in order.
///
/// The operations are deep-copied before anything is applied, so the patched
/// document never shares nodes with the caller's operation values.
pub fn patch(doc: &mut Node, ops: &[PatchOp]) -> Result<()> {
    let ops: Vec<PatchOp> = ops
        .iter()
        .map(|op| PatchOp {
            op: op.op,
            path: op.path.clone(),
            value: op.value.as_ref().map(Value::deep_copy),
        })
        .collect();

    for op in ops {
        let (parent_path, property) = match op.path.rfind('.') {
            Some(i) => (&op.path[..i], &op.path[i + 1..]),
            None => ("", op.path.as_str()),
        };
        if property.is_empty() {
            return Err(ApiError::Patch(format!("Patch path '{}' does not name a property", op.path)));
        }

        let parent = doc.find_node_mut(parent_path).ok_or_else(|| {
            ApiError::Patch(format!("Unable to find parent path for patch '{}'", parent_path))
        })?;

        debug!(op = op.op.as_str(), path = %op.path, "applying patch");
        match op.op {
            PatchKind::Remove => {
                parent.remove(property)?;
            }
            PatchKind::Add | PatchKind::Replace => {
                parent.put(property, op.value.unwrap_or(Value::Null))?;
            }
        }
    }
    Ok(())
}
