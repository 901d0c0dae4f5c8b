//! `keepsake-types` – the closed record schema shared by every Keepsake crate.
//!
//! A [`MemoryRecord`] pairs one embedded media file with its journal metadata.
//! The JSON field names match the export format (`fileDataUrl`, `fileType`,
//! `type`, …) so bundles written by earlier versions of the journal import
//! unchanged.

pub mod display;
pub mod validation;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use validation::{MediaFile, MemoryDraft, MemoryEdit, RawMemory, ValidationError};

// ─────────────────────────────────────────────────────────────────────────────
// MemoryId
// ─────────────────────────────────────────────────────────────────────────────

/// Numeric record identifier, unique within a store.
///
/// `MemoryId::UNASSIGNED` (zero) marks a record the store has not yet
/// accepted; the store replaces it with a fresh id on insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(pub u64);

impl MemoryId {
    pub const UNASSIGNED: MemoryId = MemoryId(0);

    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemoryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(MemoryId)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MediaKind
// ─────────────────────────────────────────────────────────────────────────────

/// The two media kinds a journal entry can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Derive the kind from a MIME type prefix (`image/*` or `video/*`).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim().to_ascii_lowercase();
        if mime.starts_with("image/") {
            Some(MediaKind::Photo)
        } else if mime.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Parse a declared kind label as written in export bundles.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "photo" => Some(MediaKind::Photo),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Category
// ─────────────────────────────────────────────────────────────────────────────

/// Journal category. The built-in set covers the common cases; anything else
/// is kept verbatim as [`Category::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    #[default]
    General,
    Academic,
    Social,
    Travel,
    Sports,
    Events,
    Custom(String),
}

impl Category {
    /// Built-in categories in menu order.
    pub const BUILT_IN: [Category; 6] = [
        Category::General,
        Category::Academic,
        Category::Social,
        Category::Travel,
        Category::Sports,
        Category::Events,
    ];

    /// The slug stored on disk and compared by search.
    pub fn as_str(&self) -> &str {
        match self {
            Category::General => "general",
            Category::Academic => "academic",
            Category::Social => "social",
            Category::Travel => "travel",
            Category::Sports => "sports",
            Category::Events => "events",
            Category::Custom(s) => s.as_str(),
        }
    }
}

impl From<&str> for Category {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "general" => Category::General,
            "academic" => Category::Academic,
            "social" => Category::Social,
            "travel" => Category::Travel,
            "sports" => Category::Sports,
            "events" => Category::Events,
            _ => Category::Custom(trimmed.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(raw: String) -> Self {
        Category::from(raw.as_str())
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EmbeddedMedia
// ─────────────────────────────────────────────────────────────────────────────

/// A media file inlined as a `data:<mime>;base64,<payload>` string.
///
/// The payload is produced once when the record is created and is never
/// re-encoded; the type deliberately exposes no mutable access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbeddedMedia(String);

impl EmbeddedMedia {
    /// Wrap an already-encoded data URL.
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self(data_url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The MIME type declared in the data URL header, if it has one.
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let header = rest.split_once(',')?.0;
        let mime = header.split(';').next().unwrap_or_default();
        (!mime.is_empty()).then_some(mime)
    }

    /// Length of the encoded text in bytes.
    pub fn encoded_len(&self) -> usize {
        self.0.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MemoryRecord
// ─────────────────────────────────────────────────────────────────────────────

/// One journal entry: a media file plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    pub id: MemoryId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Category,
    pub date: NaiveDate,
    #[serde(rename = "fileDataUrl")]
    pub media: EmbeddedMedia,
    #[serde(default)]
    pub file_name: String,
    #[serde(rename = "fileType", default)]
    pub mime_type: String,
    #[serde(rename = "fileSize", default)]
    pub size_bytes: u64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub created_at: DateTime<Utc>,
}

impl MemoryRecord {
    /// Case-insensitive substring match against title and description.
    ///
    /// `needle_lower` must already be lowercase.
    pub fn matches_text(&self, needle_lower: &str) -> bool {
        needle_lower.is_empty()
            || self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Filters
// ─────────────────────────────────────────────────────────────────────────────

/// Gallery type filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
    #[default]
    All,
    Photos,
    Videos,
}

impl KindFilter {
    pub fn matches(&self, kind: MediaKind) -> bool {
        match self {
            KindFilter::All => true,
            KindFilter::Photos => kind == MediaKind::Photo,
            KindFilter::Videos => kind == MediaKind::Video,
        }
    }
}

impl FromStr for KindFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(KindFilter::All),
            "photo" | "photos" => Ok(KindFilter::Photos),
            "video" | "videos" => Ok(KindFilter::Videos),
            other => Err(format!("unknown type filter '{other}' (expected all, photos or videos)")),
        }
    }
}

impl fmt::Display for KindFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KindFilter::All => f.write_str("all"),
            KindFilter::Photos => f.write_str("photos"),
            KindFilter::Videos => f.write_str("videos"),
        }
    }
}

/// Export scope: every record, or a single category.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: &Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(c) => c == category,
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(Category::from(trimmed))
        }
    }
}
