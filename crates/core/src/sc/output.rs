//! The published bindings file: versioned metadata (with the cache fingerprint) + records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bindings::action_binding::BindingRecord;
use crate::fs::FileSystem;
use crate::sc::fingerprint::ExtractionFingerprint;

/// Bump when the record shape changes; older files are then regenerated.
pub const SCHEMA_VERSION: u32 = 1;

pub const GENERATOR: &str = concat!("sc-bindings-extract/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputMetadata {
    pub schema_version: u32,
    pub generator: String,
    pub extracted_at: DateTime<Utc>,
    pub action_count: usize,
    #[serde(flatten)]
    pub fingerprint: ExtractionFingerprint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingsDocument {
    pub metadata: OutputMetadata,
    pub actions: Vec<BindingRecord>,
}

impl BindingsDocument {
    pub fn new(actions: Vec<BindingRecord>, fingerprint: ExtractionFingerprint) -> Self {
        Self {
            metadata: OutputMetadata {
                schema_version: SCHEMA_VERSION,
                generator: GENERATOR.to_string(),
                extracted_at: Utc::now(),
                action_count: actions.len(),
                fingerprint,
            },
            actions,
        }
    }

    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("serialize bindings: {e}"))
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| format!("parse bindings JSON: {e}"))
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, String> {
        let text = fs
            .read_all_text(path)
            .map_err(|e| format!("read {}: {e}", path.display()))?;
        Self::from_json(&text)
    }

    /// Temp file + rename; an existing file is only replaced by a complete one.
    pub fn write(&self, fs: &dyn FileSystem, path: &Path) -> Result<(), String> {
        let json = self.to_json()?;
        fs.write_atomic(path, json.as_bytes())
            .map_err(|e| format!("write {}: {e}", path.display()))
    }
}
