//! Output formatting for diff command results.

use super::execute::DiffResult;
use crate::document::PatchOp;
use crate::output::Outputable;

impl Outputable for DiffResult {
    fn to_table(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Diff: {} -> {}", self.from, self.to));
        lines.push(String::new());

        if self.operations.is_empty() {
            lines.push("Documents are identical.".to_string());
        } else {
            lines.push(format!("Found {} operation(s):", self.operations.len()));
            for op in &self.operations {
                lines.push(format!("  {}", describe(op)));
            }
        }

        lines.join("\n")
    }
}

/// One line per operation: `op path[ = value]`.
pub(crate) fn describe(op: &PatchOp) -> String {
    match &op.value {
        Some(value) => format!("{} {} = {}", op.op.as_str(), op.path, value.to_json()),
        None => format!("{} {}", op.op.as_str(), op.path),
    }
}
