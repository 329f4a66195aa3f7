mod cli_tests;
mod execute;
mod output;
mod output_tests;

pub use execute::DiffResult;

use std::path::PathBuf;

use clap::Args;

/// Compute the patch operations that turn one JSON document into another
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  rql_gateway diff --from before.json --to after.json
  rql_gateway diff --from before.json --to after.json -o json > ops.json")]
pub struct DiffCmd {
    /// Document to start from
    #[arg(short, long)]
    pub from: PathBuf,

    /// Document to end up with
    #[arg(short, long)]
    pub to: PathBuf,
}
