use std::error::Error;

use serde::Serialize;
use tracing::debug;

use super::{BackendKind, CompileCmd};
use crate::commands::Execute;
use crate::compilers::{Backend, CompiledQuery, CosmosCompiler, ElasticCompiler, SqlCompiler};
use crate::config::{BackendConfig, ConfigFile};
use crate::query::Query;

/// Result of the compile command execution
#[derive(Debug, Clone, Serialize)]
pub struct CompileResult {
    pub collection: String,
    /// Normalized RQL after `_key` expansion
    pub rql: String,
    #[serde(flatten)]
    pub compiled: CompiledQuery,
}

impl CompileCmd {
    /// Pick the compiler: command-line choice first, configured backend otherwise.
    ///
    /// Settings given for a backend other than the selected one are ignored.
    pub fn resolve_backend(&self, configured: &BackendConfig) -> Backend {
        let kind = self.backend.unwrap_or(match configured {
            BackendConfig::Sql { .. } => BackendKind::Sql,
            BackendConfig::Cosmos => BackendKind::Cosmos,
            BackendConfig::Elastic { .. } => BackendKind::Elastic,
        });
        match (kind, configured) {
            (BackendKind::Sql, BackendConfig::Sql { dialect }) => {
                Backend::Sql(SqlCompiler::new(self.dialect.unwrap_or(*dialect)))
            }
            (BackendKind::Sql, _) => Backend::Sql(SqlCompiler::new(self.dialect.unwrap_or_default())),
            (BackendKind::Cosmos, _) => Backend::Cosmos(CosmosCompiler::new()),
            (BackendKind::Elastic, BackendConfig::Elastic { max_window }) => {
                Backend::Elastic(ElasticCompiler::new(self.max_window.unwrap_or(*max_window)))
            }
            (BackendKind::Elastic, _) => Backend::Elastic(
                self.max_window.map(ElasticCompiler::new).unwrap_or_default(),
            ),
        }
    }
}

impl Execute for CompileCmd {
    type Output = CompileResult;

    fn execute(self, config: &ConfigFile) -> Result<Self::Output, Box<dyn Error>> {
        let schema = config.schema()?;
        let backend = self.resolve_backend(&config.backend);

        let mut query = Query::for_collection(&schema, &self.collection, &self.rql)?
            .with_paging(config.paging);
        if !self.params.is_empty() {
            query.add_params(&self.params)?;
        }
        if self.explain {
            query = query.with_dry_run(true);
        }

        let compiled = query.compile(&backend)?;
        debug!(collection = %self.collection, backend = compiled.backend, "compiled");

        Ok(CompileResult {
            collection: query.collection().name.clone(),
            rql: query.to_rql(),
            compiled,
        })
    }
}
