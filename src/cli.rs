//! CLI argument definitions.
//!
//! This module contains the top-level CLI structure and shared types.
//! Individual command definitions are in the `commands` module.

use clap::Parser;
use std::path::PathBuf;

use crate::commands::Command;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the gateway configuration file
    ///
    /// If not specified, `.rql_gateway.json` in the current directory is used
    /// when present; otherwise built-in defaults apply.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_global_defaults() {
        let args = Args::try_parse_from(["rql_gateway", "diff", "--from", "a.json", "--to", "b.json"]).unwrap();
        assert!(args.config.is_none());
        assert_eq!(args.format, OutputFormat::Table);
    }

    #[rstest]
    #[case("json", OutputFormat::Json)]
    #[case("toon", OutputFormat::Toon)]
    #[case("table", OutputFormat::Table)]
    fn test_format_after_subcommand(#[case] value: &str, #[case] expected: OutputFormat) {
        let args = Args::try_parse_from([
            "rql_gateway", "diff", "--from", "a.json", "--to", "b.json", "--format", value,
        ])
        .unwrap();
        assert_eq!(args.format, expected);
    }

    #[rstest]
    fn test_config_before_subcommand() {
        let args = Args::try_parse_from([
            "rql_gateway", "--config", "gw.json", "compile", "--collection", "orders", "eq(a,1)",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("gw.json")));
    }

    #[rstest]
    fn test_unknown_format_rejected() {
        let result = Args::try_parse_from(["rql_gateway", "-o", "xml", "diff", "--from", "a", "--to", "b"]);
        assert!(result.is_err());
    }
}
