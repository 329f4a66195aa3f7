//! JSON-like document tree with ordered, case-insensitive keys.
//!
//! Nested nodes are held in [`Arc`]s. Cloning a [`Node`] is shallow and every
//! mutation goes through [`Arc::make_mut`], so a write through one parent never
//! becomes visible through another parent that shares the same subtree.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number};

use crate::error::{ApiError, Result};

/// Format used when a [`Value::Date`] is written out.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M%z";

/// A scalar or nested node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Date(DateTime<Utc>),
    Node(Arc<Node>),
}

impl Value {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the runtime type; two values of different kinds never diff structurally.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Node(node) if node.is_array() => "array",
            Value::Node(_) => "object",
        }
    }

    /// Copy the value with freshly allocated nodes all the way down.
    pub fn deep_copy(&self) -> Value {
        match self {
            Value::Node(node) => Value::Node(Arc::new(node.deep_copy())),
            other => other.clone(),
        }
    }

    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Node(Arc::new(Node::Array(
                items.into_iter().map(Value::from_json).collect(),
            ))),
            serde_json::Value::Object(map) => {
                let mut props = Properties::new();
                for (key, value) in map {
                    props.insert(key, Value::from_json(value));
                }
                Value::Node(Arc::new(Node::Object(props)))
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        self.write_json(&mut HashSet::new())
    }

    fn write_json(&self, visited: &mut HashSet<*const Node>) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => serde_json::Value::String(d.format(DATE_FORMAT).to_string()),
            Value::Node(node) => {
                if !visited.insert(Arc::as_ptr(node)) {
                    return node.link_stub();
                }
                node.write_json(visited)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Value::Node(node) => f.write_str(&node.to_json(false)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(Arc::new(node))
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from_json)
    }
}

/// Insertion-ordered properties keyed case-insensitively.
///
/// Keys keep the casing they were written with; lookups lowercase the key being searched for.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    entries: Vec<(String, Value)>,
    index: HashMap<String, usize>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index
            .get(&key.to_lowercase())
            .map(|i| &self.entries[*i].1)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self.index.get(&key.to_lowercase()) {
            Some(i) => Some(&mut self.entries[*i].1),
            None => None,
        }
    }

    /// Insert or overwrite. An overwrite keeps the original position but adopts the new casing.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        let key = key.into();
        let lower = key.to_lowercase();
        if let Some(i) = self.index.get(&lower) {
            let slot = &mut self.entries[*i];
            slot.0 = key;
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.index.insert(lower, self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(&key.to_lowercase())?;
        let (_, value) = self.entries.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl PartialEq for Properties {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

/// A document node: an object with properties or an ordered array.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Object(Properties),
    Array(Vec<Value>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Object(Properties::new())
    }
}

impl Node {
    pub fn object() -> Self {
        Node::Object(Properties::new())
    }

    pub fn array() -> Self {
        Node::Array(Vec::new())
    }

    /// Parse JSON text. The root must be an object or an array.
    pub fn parse(text: &str) -> Result<Node> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| ApiError::InvalidArgument(format!("Invalid JSON document: {}", e)))?;
        Node::from_json(json)
    }

    pub fn from_json(json: serde_json::Value) -> Result<Node> {
        match Value::from_json(json) {
            Value::Node(node) => Ok(Arc::unwrap_or_clone(node)),
            other => Err(ApiError::InvalidArgument(format!(
                "A document must be an object or an array, not a {}",
                other.kind()
            ))),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Node::Array(_))
    }

    pub fn len(&self) -> usize {
        match self {
            Node::Object(props) => props.len(),
            Node::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in order; array keys are their indices.
    pub fn keys(&self) -> Vec<String> {
        match self {
            Node::Object(props) => props.iter().map(|(k, _)| k.to_string()).collect(),
            Node::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    pub fn values(&self) -> Vec<&Value> {
        match self {
            Node::Object(props) => props.iter().map(|(_, v)| v).collect(),
            Node::Array(items) => items.iter().collect(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Node::Object(props) => props.get(key),
            Node::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        }
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Node::Object(props) => props.get_mut(key),
            Node::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        }
    }

    /// Set `key`. Arrays take a numeric index and grow with nulls when it is past the end.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> Result<Option<Value>> {
        let value = value.into();
        match self {
            Node::Object(props) => Ok(props.insert(key, value)),
            Node::Array(items) => {
                let index = array_index(key)?;
                if index < items.len() {
                    return Ok(Some(std::mem::replace(&mut items[index], value)));
                }
                items.resize(index, Value::Null);
                items.push(value);
                Ok(None)
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>> {
        match self {
            Node::Object(props) => Ok(props.remove(key)),
            Node::Array(items) => {
                let index = array_index(key)?;
                if index < items.len() {
                    Ok(Some(items.remove(index)))
                } else {
                    Ok(None)
                }
            }
        }
    }

    /// Walk a dotted path (`a.b.0.c`).
    pub fn find(&self, path: &str) -> Option<&Value> {
        let mut segments = split_path(path).into_iter();
        let first = segments.next()?;
        let mut found = self.get(first)?;
        for segment in segments {
            found = found.as_node()?.get(segment)?;
        }
        Some(found)
    }

    /// Like [`Node::find`] but expects a node; the empty path is `self`.
    pub fn find_node(&self, path: &str) -> Option<&Node> {
        if split_path(path).is_empty() {
            return Some(self);
        }
        self.find(path)?.as_node()
    }

    pub fn find_string(&self, path: &str) -> Option<String> {
        self.find(path).map(|v| v.to_string())
    }

    /// Mutable walk; nodes along the way are unshared with [`Arc::make_mut`].
    pub fn find_node_mut(&mut self, path: &str) -> Option<&mut Node> {
        let mut current = self;
        for segment in split_path(path) {
            match current.get_mut(segment)? {
                Value::Node(child) => current = Arc::make_mut(child),
                _ => return None,
            }
        }
        Some(current)
    }

    /// Collect every value matching a dotted path.
    ///
    /// `*` matches any single key; `**` matches any depth of nested nodes below
    /// this one. A trailing `**` on its own collects nothing.
    pub fn collect(&self, path: &str) -> Vec<Value> {
        let mut collected = Vec::new();
        let segments = split_path(path);
        if !segments.is_empty() {
            self.collect_into(&segments, &mut collected);
        }
        collected
    }

    fn collect_into(&self, path: &[&str], collected: &mut Vec<Value>) {
        let (segment, rest) = (path[0], &path[1..]);
        match segment {
            "*" if rest.is_empty() => collected.extend(self.values().into_iter().cloned()),
            "*" => {
                for value in self.values() {
                    if let Some(node) = value.as_node() {
                        node.collect_into(rest, collected);
                    }
                }
            }
            "**" if rest.is_empty() => {}
            "**" => {
                for value in self.values() {
                    if let Some(node) = value.as_node() {
                        node.collect_into(path, collected);
                        node.collect_into(rest, collected);
                    }
                }
            }
            key => match self.get(key) {
                Some(found) if rest.is_empty() => collected.push(found.clone()),
                Some(Value::Node(node)) => node.collect_into(rest, collected),
                _ => {}
            },
        }
    }

    pub fn deep_copy(&self) -> Node {
        match self {
            Node::Object(props) => {
                let mut copy = Properties::new();
                for (key, value) in props.iter() {
                    copy.insert(key, value.deep_copy());
                }
                Node::Object(copy)
            }
            Node::Array(items) => Node::Array(items.iter().map(Value::deep_copy).collect()),
        }
    }

    pub fn href(&self) -> Option<String> {
        match self {
            Node::Object(props) => props.get("href").map(|v| v.to_string()),
            Node::Array(_) => None,
        }
    }

    /// Serialize. `href` is written first and a node reached a second time
    /// through a shared reference is written as `{"@link": href}`.
    pub fn to_json(&self, pretty: bool) -> String {
        let json = self.to_json_value();
        let text = if pretty {
            serde_json::to_string_pretty(&json)
        } else {
            serde_json::to_string(&json)
        };
        text.unwrap_or_default()
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        self.write_json(&mut HashSet::new())
    }

    fn write_json(&self, visited: &mut HashSet<*const Node>) -> serde_json::Value {
        match self {
            Node::Array(items) => {
                serde_json::Value::Array(items.iter().map(|v| v.write_json(visited)).collect())
            }
            Node::Object(props) => {
                let mut map = Map::new();
                if let Some(href) = props.get("href") {
                    map.insert("href".to_string(), serde_json::Value::String(href.to_string()));
                }
                for (key, value) in props.iter() {
                    if key.eq_ignore_ascii_case("href") {
                        continue;
                    }
                    map.insert(key.to_string(), value.write_json(visited));
                }
                serde_json::Value::Object(map)
            }
        }
    }

    fn link_stub(&self) -> serde_json::Value {
        let mut map = Map::new();
        if let Some(href) = self.href() {
            map.insert("@link".to_string(), serde_json::Value::String(href));
        }
        serde_json::Value::Object(map)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json(false))
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Node::from_json(json).map_err(serde::de::Error::custom)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

fn array_index(key: &str) -> Result<usize> {
    key.parse::<usize>().map_err(|_| {
        ApiError::Patch(format!(
            "You are trying to apply a property patch to an array: '{}' is not an index",
            key
        ))
    })
}
