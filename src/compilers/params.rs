//! Parameter binding helpers for query compilation.
//!
//! Collects bind values in the order their placeholders appear in the
//! generated text. Positional backends depend on that order.

use serde::Serialize;
use serde_json::Value as JsonValue;

/// One named bind value.
///
/// `name` is what the backend's placeholder refers to: `@orderID1` for Cosmos,
/// a diagnostic label such as `orderID1` for positional SQL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundValue {
    pub name: String,
    pub value: JsonValue,
}

/// Helper for building query parameters.
///
/// Values are kept in insertion order, which must match the order their
/// placeholders appear in the compiled text. Names may repeat.
#[derive(Debug, Clone, Default)]
pub struct ParamBuilder {
    params: Vec<BoundValue>,
}

impl ParamBuilder {
    /// Create a new, empty parameter builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// 1-based position the next value will take.
    ///
    /// Compilers use it to number a parameter name before calling [`add`](Self::add).
    pub fn next_position(&self) -> usize {
        self.params.len() + 1
    }

    /// Add a parameter to the builder.
    ///
    /// # Arguments
    ///
    /// * `name` - The parameter name (e.g., "@shipCountry1")
    /// * `value` - The typed value, converted to JSON
    ///
    /// # Returns
    ///
    /// The 1-based position of the new value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> usize {
        self.params.push(BoundValue { name: name.into(), value: value.into() });
        self.params.len()
    }

    /// Get the values collected so far, in placeholder order.
    pub fn params(&self) -> &[BoundValue] {
        &self.params
    }

    /// Build the final list for [`CompiledQuery::bound_values`](super::CompiledQuery::bound_values).
    pub fn build(self) -> Vec<BoundValue> {
        self.params
    }

    /// Get the number of parameters collected so far.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the builder is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
