//! Command definitions and implementations.
//!
//! Each command is defined in its own module with:
//! - The command struct with clap attributes for CLI parsing
//! - An `Execute` impl producing a serializable result
//! - An `Outputable` impl rendering that result as a table

pub mod compile;
pub mod diff;
pub mod patch;

pub use compile::{BackendKind, CompileCmd};
pub use diff::DiffCmd;
pub use patch::PatchCmd;

use clap::Subcommand;
use std::error::Error;
use std::fs;
use std::path::Path;

use crate::config::ConfigFile;
use crate::document::Node;
use crate::output::{OutputFormat, Outputable};

/// Trait for executing commands with command-specific result types.
pub trait Execute {
    type Output: Outputable;

    fn execute(self, config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>>;
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile an RQL query for a collection into backend-native query text
    Compile(CompileCmd),

    /// Compute the patch operations that turn one JSON document into another
    Diff(DiffCmd),

    /// Apply a list of patch operations to a JSON document
    Patch(PatchCmd),
}

impl Command {
    /// Execute the command and return formatted output
    pub fn run(self, config: &ConfigFile, format: OutputFormat) -> Result<String, Box<dyn Error>> {
        match self {
            Command::Compile(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
            Command::Diff(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
            Command::Patch(cmd) => {
                let result = cmd.execute(config)?;
                Ok(result.format(format))
            }
        }
    }
}

/// Read and parse a JSON document file.
pub(crate) fn read_document(path: &Path) -> Result<Node, Box<dyn Error>> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let node = Node::parse(&content)
        .map_err(|e| format!("Invalid document in {}: {}", path.display(), e))?;
    Ok(node)
}
