//! Collections: name resolution, entity keys and hypermedia links.

use serde::{Deserialize, Serialize};

use super::definition::{DataType, Index, IndexKind, Property, Relationship};
use crate::document::{Node, Properties, Value};
use crate::error::{ApiError, Result};

/// Separator between the column values of a compound entity key.
pub const KEY_SEPARATOR: &str = "~";

/// Name of the index whose first column is the Cosmos partition key.
pub const PARTITION_KEY_INDEX: &str = "PartitionKey";

/// One REST resource mapped onto one physical table, container or index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    /// Resource name used in URLs (e.g. "orders")
    pub name: String,

    /// Physical table/container/index name; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,

    #[serde(default)]
    pub properties: Vec<Property>,

    #[serde(default)]
    pub indexes: Vec<Index>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Collection {
            name: name.into(),
            table: None,
            properties: Vec::new(),
            indexes: Vec::new(),
            relationships: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_property(mut self, name: &str, data_type: DataType) -> Self {
        self.properties.push(Property::new(name, data_type));
        self
    }

    pub fn with_index(mut self, name: &str, kind: IndexKind, columns: &[&str]) -> Self {
        self.indexes.push(Index::new(name, kind, columns));
        self
    }

    pub fn with_relationship(mut self, name: &str, related: &str, columns: &[&str]) -> Self {
        self.relationships.push(Relationship {
            name: name.to_string(),
            related: related.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        });
        self
    }

    pub fn table(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.name)
    }

    /// Resolve a property by logical name or physical column, ignoring case.
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .or_else(|| self.properties.iter().find(|p| p.column().eq_ignore_ascii_case(name)))
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.find_property(name).ok_or_else(|| ApiError::UnknownProperty {
            collection: self.name.clone(),
            property: name.to_string(),
        })
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name.eq_ignore_ascii_case(name))
    }

    /// The index that identifies an entity: the first primary index, else the first unique one.
    pub fn primary_index(&self) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|i| i.kind == IndexKind::Primary)
            .or_else(|| self.indexes.iter().find(|i| i.kind == IndexKind::Unique))
    }

    pub fn partition_index(&self) -> Option<&Index> {
        self.index(PARTITION_KEY_INDEX)
    }

    /// Properties of `index`, in index order.
    pub fn index_properties(&self, index: &Index) -> Result<Vec<&Property>> {
        index.columns.iter().map(|c| self.property(c)).collect()
    }

    /// Join the row's values for `index` into a `~`-separated key.
    ///
    /// Returns `None` when any of the index columns is missing or null.
    pub fn encode_key(&self, index: &Index, row: &Node) -> Option<String> {
        let mut parts = Vec::with_capacity(index.columns.len());
        for column in &index.columns {
            let value = self.row_value(row, column)?;
            parts.push(escape_key_part(&value.to_string()));
        }
        Some(parts.join(KEY_SEPARATOR))
    }

    /// Split an encoded key back into `(property, value)` pairs.
    pub fn decode_key(&self, index: &Index, key: &str) -> Result<Vec<(&Property, String)>> {
        let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
        if parts.len() != index.columns.len() {
            return Err(ApiError::KeyArity {
                index: index.name.clone(),
                expected: index.columns.len(),
                actual: parts.len(),
                key: key.to_string(),
            });
        }
        let properties = self.index_properties(index)?;
        Ok(properties
            .into_iter()
            .zip(parts)
            .map(|(p, part)| (p, unescape_key_part(part)))
            .collect())
    }

    /// `{base}/{collection}/{key}` for a stored row, using the primary index.
    pub fn entity_href(&self, base_url: &str, row: &Node) -> Option<String> {
        let key = self.encode_key(self.primary_index()?, row)?;
        Some(format!("{}/{}/{}", base_url.trim_end_matches('/'), self.name, key))
    }

    /// Turn a stored row (keyed by column) into a linked document.
    ///
    /// The result carries `href` first, then each known property under its
    /// logical name, then one `{"href": ...}` stub per relationship whose key
    /// columns are all present.
    pub fn link_row(&self, base_url: &str, row: &Node) -> Node {
        let mut props = Properties::new();
        if let Some(href) = self.entity_href(base_url, row) {
            props.insert("href", Value::String(href));
        }
        for property in &self.properties {
            if let Some(value) = row.get(property.column()).or_else(|| row.get(&property.name)) {
                props.insert(property.name.clone(), value.clone());
            }
        }
        for relationship in &self.relationships {
            let mut parts = Vec::with_capacity(relationship.columns.len());
            for column in &relationship.columns {
                match self.row_value(row, column) {
                    Some(value) => parts.push(escape_key_part(&value.to_string())),
                    None => break,
                }
            }
            if parts.is_empty() || parts.len() != relationship.columns.len() {
                continue;
            }
            let href = format!(
                "{}/{}/{}",
                base_url.trim_end_matches('/'),
                relationship.related,
                parts.join(KEY_SEPARATOR)
            );
            let mut link = Properties::new();
            link.insert("href", Value::String(href));
            props.insert(relationship.name.clone(), Value::from(Node::Object(link)));
        }
        Node::Object(props)
    }

    fn row_value<'r>(&self, row: &'r Node, name: &str) -> Option<&'r Value> {
        let column = self.find_property(name).map(|p| p.column()).unwrap_or(name);
        row.get(column)
            .or_else(|| row.get(name))
            .filter(|v| !v.is_null())
    }
}

fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace(KEY_SEPARATOR, "%7E")
}

fn unescape_key_part(part: &str) -> String {
    part.replace("%7E", "~").replace("%7e", "~").replace("%25", "%")
}
