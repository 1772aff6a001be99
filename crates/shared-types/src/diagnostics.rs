//! Diagnostics collected from modules through `on_populate_diagnostics`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::entities::ModuleDescriptor;

/// Key/value sink a module writes its diagnostics into.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsSink {
    entries: BTreeMap<String, serde_json::Value>,
}

impl DiagnosticsSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record any serializable value. Values that fail to serialize are
    /// stored as their error message.
    pub fn record<T: Serialize>(&mut self, key: impl Into<String>, value: T) {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|e| serde_json::Value::String(format!("<unserializable: {e}>")));
        self.entries.insert(key.into(), value);
    }

    /// Record a free-form note.
    pub fn note(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.entries
            .insert(key.into(), serde_json::Value::String(text.into()));
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn into_entries(self) -> BTreeMap<String, serde_json::Value> {
        self.entries
    }
}

/// Diagnostics of one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDiagnostics {
    pub descriptor: ModuleDescriptor,
    pub entries: BTreeMap<String, serde_json::Value>,
    /// Set when the diagnostics hook failed, panicked or timed out.
    pub error: Option<String>,
    pub collection_time: Duration,
}
