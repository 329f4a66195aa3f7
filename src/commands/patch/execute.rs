use std::error::Error;
use std::fs;

use serde::Serialize;

use super::PatchCmd;
use crate::commands::{read_document, Execute};
use crate::config::ConfigFile;
use crate::document::{patch, Node, PatchOp};

/// Result of the patch command execution
#[derive(Debug, Clone, Serialize)]
pub struct PatchResult {
    pub doc: String,
    pub applied: usize,
    pub document: Node,
}

impl Execute for PatchCmd {
    type Output = PatchResult;

    fn execute(self, _config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>> {
        let mut document = read_document(&self.doc)?;

        let content = fs::read_to_string(&self.ops)
            .map_err(|e| format!("Failed to read {}: {}", self.ops.display(), e))?;
        let ops: Vec<PatchOp> = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid patch operations in {}: {}", self.ops.display(), e))?;

        patch(&mut document, &ops)?;

        Ok(PatchResult {
            doc: self.doc.display().to_string(),
            applied: ops.len(),
            document,
        })
    }
}
