//! Configuration file handling.
//!
//! Loads `.rql_gateway.json`: the collections the gateway exposes, the default
//! backend compiler and the paging limits.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::compilers::{Backend, CosmosCompiler, ElasticCompiler, SqlCompiler, SqlDialect};
use crate::query::PagingDefaults;
use crate::schema::{Collection, Schema};

/// Config file looked up in the current directory when `--config` isn't given.
pub const DEFAULT_CONFIG_FILE: &str = ".rql_gateway.json";

/// Where [`ConfigFile::resolve`] found its configuration.
///
/// Resolution runs before the subscriber is installed, so the outcome is
/// returned and logged by [`ConfigSource::log`] once logging is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => debug!(path = %path.display(), "loaded config file"),
            ConfigSource::Defaults => {
                warn!(file = DEFAULT_CONFIG_FILE, "config file not found, using defaults")
            }
        }
    }
}

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Tracing filter directive, e.g. "rql_gateway=debug"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub paging: PagingDefaults,

    #[serde(default)]
    pub collections: Vec<Collection>,
}

/// Default compiler selection.
///
/// JSON format uses a "type" field with lowercase variant names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    Sql {
        #[serde(default)]
        dialect: SqlDialect,
    },
    Cosmos,
    Elastic {
        #[serde(default = "default_max_window")]
        max_window: u64,
    },
}

fn default_max_window() -> u64 {
    crate::compilers::elastic::DEFAULT_MAX_WINDOW
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Sql { dialect: SqlDialect::default() }
    }
}

impl BackendConfig {
    pub fn compiler(&self) -> Backend {
        match *self {
            BackendConfig::Sql { dialect } => Backend::Sql(SqlCompiler::new(dialect)),
            BackendConfig::Cosmos => Backend::Cosmos(CosmosCompiler::new()),
            BackendConfig::Elastic { max_window } => Backend::Elastic(ElasticCompiler::new(max_window)),
        }
    }
}

impl ConfigFile {
    /// Load configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file doesn't exist
    /// - The file cannot be read
    /// - The JSON is invalid
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let display = path.display();

        if !path.exists() {
            return Err(format!(
                "Configuration file not found: {display}\n\n\
                 Please create it, or point --config at an existing file.\n\n\
                 Example:\n\
                 {{\n  \
                   \"log_level\": \"rql_gateway=info\",\n  \
                   \"backend\": {{ \"type\": \"sql\", \"dialect\": \"ansi\" }},\n  \
                   \"paging\": {{ \"default_limit\": 100, \"max_limit\": 1000 }},\n  \
                   \"collections\": [\n    \
                     {{\n      \
                       \"name\": \"orders\",\n      \
                       \"properties\": [\n        \
                         {{ \"name\": \"orderID\", \"type\": \"int\" }},\n        \
                         {{ \"name\": \"shipCountry\", \"column\": \"ship_country\" }}\n      \
                       ],\n      \
                       \"indexes\": [\n        \
                         {{ \"name\": \"pk\", \"kind\": \"primary\", \"columns\": [\"orderID\"] }}\n      \
                       ]\n    \
                     }}\n  \
                   ]\n\
                 }}\n\
                 \n\
                 Other backends:\n\
                 {{ \"type\": \"cosmos\" }}\n\
                 {{ \"type\": \"elastic\", \"max_window\": 10000 }}\n"
            )
            .into());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {display}: {e}"))?;

        let config: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| format!("Invalid JSON in {display}: {e}"))?;

        Ok(config)
    }

    /// Load the explicit `--config` path, or the default file when present.
    ///
    /// Without an explicit path a missing default file is not an error: the
    /// defaults (no collections, ANSI SQL) are used so document commands still work.
    ///
    /// # Returns
    ///
    /// The config and its [`ConfigSource`]. Call [`ConfigSource::log`] after
    /// [`crate::logging::init`] so the missing-file warning reaches the subscriber.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, ConfigSource), Box<dyn Error>> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };
        if explicit.is_none() && !path.exists() {
            return Ok((ConfigFile::default(), ConfigSource::Defaults));
        }
        let config = Self::load(&path)?;
        Ok((config, ConfigSource::File(path)))
    }

    /// Validate the configured collections and freeze them into a [`Schema`].
    pub fn schema(&self) -> Result<Schema, Box<dyn Error>> {
        Ok(Schema::new(self.collections.clone())?)
    }

    pub fn backend(&self) -> Backend {
        self.backend.compiler()
    }
}
