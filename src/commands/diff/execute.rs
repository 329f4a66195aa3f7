use std::error::Error;

use serde::Serialize;

use super::DiffCmd;
use crate::commands::{read_document, Execute};
use crate::config::ConfigFile;
use crate::document::{diff, PatchOp};

/// Result of the diff command execution
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub from: String,
    pub to: String,
    pub operations: Vec<PatchOp>,
}

impl Execute for DiffCmd {
    type Output = DiffResult;

    fn execute(self, _config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>> {
        let from = read_document(&self.from)?;
        let to = read_document(&self.to)?;

        Ok(DiffResult {
            from: self.from.display().to_string(),
            to: self.to.display().to_string(),
            operations: diff(&from, &to),
        })
    }
}
