mod execute;
mod output;
mod output_tests;

pub use execute::CompileResult;

use clap::{Args, ValueEnum};

use crate::compilers::SqlDialect;

/// Backend compiler selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    Sql,
    Cosmos,
    Elastic,
}

/// Compile an RQL query for a collection into backend-native query text
#[derive(Args, Debug)]
#[command(after_help = "\
Examples:
  rql_gateway compile --collection orders 'eq(shipCountry,France)'
  rql_gateway compile --collection orders -b cosmos 'sw(shipCity,Re*),sort(-orderDate)'
  rql_gateway compile --collection orders -b sql -d sqlserver 'select(orderID),limit(10,20)'
  rql_gateway compile --collection orders -b elastic 'after(10248),sort(id)'
  rql_gateway compile --collection orders -p shipCountry=France -p explain=true")]
pub struct CompileCmd {
    /// Collection the query runs against
    #[arg(long)]
    pub collection: String,

    /// RQL query text (terms separated by ',' or '&')
    #[arg(default_value = "")]
    pub rql: String,

    /// Backend compiler (defaults to the configured backend)
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// SQL dialect (sql backend only)
    #[arg(short, long, value_enum)]
    pub dialect: Option<SqlDialect>,

    /// Result window above which Elasticsearch paging switches to search_after
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_window: Option<u64>,

    /// Query-string style parameters (key=value), e.g. shipCountry=France or explain=true
    #[arg(short, long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Only compile; mark the query as explain/dry-run
    #[arg(long, default_value_t = false)]
    pub explain: bool,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
