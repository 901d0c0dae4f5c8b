//! Export/import bundle format.
//!
//! An export bundle is a pretty-printed JSON object:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "exportedAt": "2024-06-01T12:00:00Z",
//!   "category": "travel",
//!   "memories": [ ... ]
//! }
//! ```
//!
//! `category` is present only for single-category exports. On import the
//! envelope is optional: a bare array of records is accepted too, and
//! `version`, `exportedAt` and `category` are never checked.

use chrono::{DateTime, Utc};
use keepsake_types::{CategoryFilter, MemoryRecord, RawMemory};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

pub const BUNDLE_VERSION: &str = "1.0";

/// Errors that make a whole import file unusable, or stop an export.
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("File is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Could not encode export bundle: {0}")]
    Encode(serde_json::Error),
    #[error("Expected an array of memories or an object with a \"memories\" array")]
    UnexpectedShape,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The export envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBundle {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub memories: Vec<MemoryRecord>,
}

impl ExportBundle {
    pub fn new(scope: &CategoryFilter, memories: Vec<MemoryRecord>) -> Self {
        Self {
            version: BUNDLE_VERSION.to_string(),
            exported_at: Utc::now(),
            category: match scope {
                CategoryFilter::All => None,
                CategoryFilter::Only(c) => Some(c.to_string()),
            },
            memories,
        }
    }

    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Suggested file name for an export.
pub fn export_file_name(scope: &CategoryFilter) -> String {
    match scope {
        CategoryFilter::All => "keepsake-all.json".to_string(),
        CategoryFilter::Only(c) => format!("keepsake-{}.json", sanitize(c.as_str())),
    }
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect()
}

/// Extract raw candidates from an import file's text.
///
/// Elements that are not JSON objects of the expected field types are
/// skipped with a warning; the rest are returned unvalidated.
pub fn parse_import(text: &str) -> Result<Vec<RawMemory>, BundleError> {
    Ok(parse_elements(text)?.0)
}

fn parse_elements(text: &str) -> Result<(Vec<RawMemory>, usize), BundleError> {
    let items = match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("memories") {
            Some(Value::Array(items)) => items,
            _ => return Err(BundleError::UnexpectedShape),
        },
        _ => return Err(BundleError::UnexpectedShape),
    };

    let mut candidates = Vec::with_capacity(items.len());
    let mut unreadable = 0;
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<RawMemory>(item) {
            Ok(raw) => candidates.push(raw),
            Err(e) => {
                warn!(index, error = %e, "skipping unreadable import element");
                unreadable += 1;
            }
        }
    }
    Ok((candidates, unreadable))
}

/// What an import would do, shown before the user confirms it.
#[derive(Debug, Clone)]
pub struct ImportPreview {
    /// Everything that parsed; hand this to `MemoryStore::import_bundle`.
    pub candidates: Vec<RawMemory>,
    /// Validated copies of the candidates that would be accepted.
    pub accepted: Vec<MemoryRecord>,
    /// Candidates that parsed but fail validation.
    pub rejected: usize,
    /// Elements that were not readable as records at all.
    pub unreadable: usize,
}

impl ImportPreview {
    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }
}

pub fn preview_import(text: &str) -> Result<ImportPreview, BundleError> {
    let (candidates, unreadable) = parse_elements(text)?;
    let now = Utc::now();
    let mut accepted = Vec::new();
    let mut rejected = 0;
    for raw in &candidates {
        match raw.clone().validate(now) {
            Ok(record) => accepted.push(record),
            Err(_) => rejected += 1,
        }
    }
    Ok(ImportPreview { candidates, accepted, rejected, unreadable })
}

/// Read an import file's text.
pub async fn read_import_file(path: impl AsRef<Path>) -> Result<String, BundleError> {
    Ok(tokio::fs::read_to_string(path).await?)
}

/// Write a bundle to `path`, pretty-printed.
pub async fn write_bundle(path: impl AsRef<Path>, bundle: &ExportBundle) -> Result<(), BundleError> {
    let path = path.as_ref();
    let json = bundle.to_pretty_json().map_err(BundleError::Encode)?;
    tokio::fs::write(path, json).await?;
    info!(path = %path.display(), memories = bundle.memories.len(), "bundle written");
    Ok(())
}
