mod execute;
mod output;
mod output_tests;

pub use execute::PatchResult;

use std::path::PathBuf;

use clap::Args;

/// Apply a list of patch operations to a JSON document
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  rql_gateway patch --doc order.json --ops ops.json
  rql_gateway diff --from a.json --to b.json -o json | jq .operations > ops.json
  rql_gateway patch --doc a.json --ops ops.json -o json")]
pub struct PatchCmd {
    /// Document to patch (a JSON object or array)
    #[arg(short, long)]
    pub doc: PathBuf,

    /// JSON array of {op, path, value} operations
    #[arg(long)]
    pub ops: PathBuf,
}
