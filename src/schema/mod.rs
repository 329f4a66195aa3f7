//! Schema model: the collections the gateway exposes.
//!
//! A [`Schema`] is built once (usually from the configuration file), validated,
//! and then passed by reference into every compilation. Nothing in the crate
//! mutates it afterwards.

pub mod collection;
pub mod definition;

pub use collection::{Collection, KEY_SEPARATOR, PARTITION_KEY_INDEX};
pub use definition::{DataType, Index, IndexKind, Property, Relationship};

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{ApiError, Result};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern"));

/// True when `name` can be embedded in generated query text.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    collections: Vec<Collection>,
}

impl Schema {
    /// Validate and freeze a set of collections.
    ///
    /// Every table, column and property name must be a plain identifier, index
    /// and relationship columns must name properties, and relationships must
    /// point at collections that exist.
    pub fn new(collections: Vec<Collection>) -> Result<Self> {
        let mut seen = HashSet::new();
        for collection in &collections {
            if !seen.insert(collection.name.to_lowercase()) {
                return Err(invalid(format!("Duplicate collection '{}'", collection.name)));
            }
            check_identifier(&collection.name, "collection")?;
            check_identifier(collection.table(), "table")?;
            for property in &collection.properties {
                check_identifier(&property.name, "property")?;
                check_identifier(property.column(), "column")?;
            }
            for index in &collection.indexes {
                if index.columns.is_empty() {
                    return Err(invalid(format!(
                        "Index '{}' on '{}' has no columns",
                        index.name, collection.name
                    )));
                }
                collection.index_properties(index)?;
            }
            for relationship in &collection.relationships {
                if !collections.iter().any(|c| c.name.eq_ignore_ascii_case(&relationship.related)) {
                    return Err(invalid(format!(
                        "Relationship '{}' on '{}' points at unknown collection '{}'",
                        relationship.name, collection.name, relationship.related
                    )));
                }
                for column in &relationship.columns {
                    collection.property(column)?;
                }
            }
        }
        Ok(Schema { collections })
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Look a collection up by resource name or table name, ignoring case.
    pub fn collection(&self, name: &str) -> Result<&Collection> {
        self.collections
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .or_else(|| self.collections.iter().find(|c| c.table().eq_ignore_ascii_case(name)))
            .ok_or_else(|| ApiError::UnknownCollection(name.to_string()))
    }
}

fn check_identifier(name: &str, what: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(invalid(format!("Invalid {} name '{}'", what, name)))
    }
}

fn invalid(message: String) -> ApiError {
    ApiError::InvalidArgument(message)
}
