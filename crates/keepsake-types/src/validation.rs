//! Ingestion rules.
//!
//! Records enter a store through exactly two doors: a fresh upload
//! ([`MemoryDraft`]) or an import bundle ([`RawMemory`]). Both are checked
//! here before anything else sees them:
//!
//! * the title is non-empty after trimming,
//! * a media payload is present,
//! * the MIME type (or declared kind) maps to a photo or a video.
//!
//! Description, category and date are optional and default to empty,
//! `general` and today respectively.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Category, EmbeddedMedia, MediaKind, MemoryId, MemoryRecord};

/// Reasons a candidate record is refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a title for your memory")]
    MissingTitle,
    #[error("Please select at least one file")]
    NoMedia,
    #[error("Record has no embedded media")]
    MissingMedia,
    #[error("Unsupported media type: {0:?} (expected an image or a video)")]
    UnsupportedMedia(String),
}

/// Trim `title` and reject it when nothing is left.
pub fn validate_title(title: &str) -> Result<String, ValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingTitle)
    } else {
        Ok(trimmed.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Upload path
// ─────────────────────────────────────────────────────────────────────────────

/// One uploaded file after it has been embedded.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    pub media: EmbeddedMedia,
}

/// Metadata typed in by the user for a new upload.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub date: Option<NaiveDate>,
}

impl MemoryDraft {
    /// Check the metadata alone, before any file is embedded.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title).map(|_| ())
    }

    /// Build one record per file, all sharing this draft's metadata.
    ///
    /// Records carry [`MemoryId::UNASSIGNED`]; the store assigns ids.
    pub fn into_records(
        self,
        files: Vec<MediaFile>,
        now: DateTime<Utc>,
    ) -> Result<Vec<MemoryRecord>, ValidationError> {
        let title = validate_title(&self.title)?;
        if files.is_empty() {
            return Err(ValidationError::NoMedia);
        }
        let date = self.date.unwrap_or_else(|| now.date_naive());
        let description = self.description.trim().to_string();

        files
            .into_iter()
            .map(|file| {
                if file.media.is_empty() {
                    return Err(ValidationError::MissingMedia);
                }
                let kind = MediaKind::from_mime(&file.mime_type)
                    .ok_or_else(|| ValidationError::UnsupportedMedia(file.mime_type.clone()))?;
                Ok(MemoryRecord {
                    id: MemoryId::UNASSIGNED,
                    title: title.clone(),
                    description: description.clone(),
                    category: self.category.clone(),
                    date,
                    media: file.media,
                    file_name: file.name,
                    mime_type: file.mime_type,
                    size_bytes: file.size,
                    kind,
                    created_at: now,
                })
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Edit path
// ─────────────────────────────────────────────────────────────────────────────

/// Replacement metadata for an existing record. `None` keeps the old value.
#[derive(Debug, Clone, Default)]
pub struct MemoryEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub date: Option<NaiveDate>,
}

impl MemoryEdit {
    /// Produce the replacement for `original`.
    ///
    /// The media payload, file metadata, kind and creation time carry over
    /// untouched; the id is reset so the store can allocate a fresh one.
    pub fn apply_to(&self, original: &MemoryRecord) -> Result<MemoryRecord, ValidationError> {
        let title = match &self.title {
            Some(t) => validate_title(t)?,
            None => original.title.clone(),
        };
        Ok(MemoryRecord {
            id: MemoryId::UNASSIGNED,
            title,
            description: self
                .description
                .as_deref()
                .map(|d| d.trim().to_string())
                .unwrap_or_else(|| original.description.clone()),
            category: self.category.clone().unwrap_or_else(|| original.category.clone()),
            date: self.date.unwrap_or(original.date),
            ..original.clone()
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Import path
// ─────────────────────────────────────────────────────────────────────────────

/// A record as found in an import bundle: every field optional, nothing
/// trusted until [`RawMemory::validate`] says so.
///
/// Unknown fields (including the exporter's `id`) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMemory {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub file_data_url: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl RawMemory {
    /// Turn an untrusted candidate into a record, or say why not.
    ///
    /// A declared `type` wins; otherwise the kind is derived from the MIME
    /// type. A missing or unparseable `date` falls back to the creation date.
    pub fn validate(self, now: DateTime<Utc>) -> Result<MemoryRecord, ValidationError> {
        let title = validate_title(self.title.as_deref().unwrap_or_default())?;

        let media = match self.file_data_url {
            Some(url) if !url.trim().is_empty() => EmbeddedMedia::from_data_url(url),
            _ => return Err(ValidationError::MissingMedia),
        };

        let mime_type = self
            .file_type
            .filter(|m| !m.trim().is_empty())
            .or_else(|| media.mime_type().map(str::to_string))
            .unwrap_or_default();

        let kind = self
            .kind
            .as_deref()
            .and_then(MediaKind::from_label)
            .or_else(|| MediaKind::from_mime(&mime_type))
            .ok_or_else(|| {
                ValidationError::UnsupportedMedia(self.kind.clone().unwrap_or_else(|| mime_type.clone()))
            })?;

        let created_at = self
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);

        let date = self
            .date
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(|| created_at.date_naive());

        Ok(MemoryRecord {
            id: MemoryId::UNASSIGNED,
            title,
            description: self.description.unwrap_or_default(),
            category: self.category.map(Category::from).unwrap_or_default(),
            date,
            media,
            file_name: self.file_name.unwrap_or_default(),
            mime_type,
            size_bytes: self.file_size.unwrap_or(0),
            kind,
            created_at,
        })
    }
}

impl From<&MemoryRecord> for RawMemory {
    fn from(r: &MemoryRecord) -> Self {
        RawMemory {
            title: Some(r.title.clone()),
            description: Some(r.description.clone()),
            category: Some(r.category.to_string()),
            date: Some(r.date.format("%Y-%m-%d").to_string()),
            file_data_url: Some(r.media.as_str().to_string()),
            file_name: Some(r.file_name.clone()),
            file_type: Some(r.mime_type.clone()),
            file_size: Some(r.size_bytes),
            kind: Some(r.kind.to_string()),
            created_at: Some(r.created_at.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> MediaFile {
        MediaFile {
            name: name.to_string(),
            mime_type: "image/png".to_string(),
            size: 4,
            media: EmbeddedMedia::from_data_url("data:image/png;base64,AAAA"),
        }
    }

    fn raw(title: &str) -> RawMemory {
        RawMemory {
            title: Some(title.to_string()),
            file_data_url: Some("data:image/jpeg;base64,AAAA".to_string()),
            kind: Some("photo".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn title_is_trimmed_and_required() {
        assert_eq!(validate_title("  Beach  ").unwrap(), "Beach");
        assert_eq!(validate_title("   "), Err(ValidationError::MissingTitle));
    }

    #[test]
    fn draft_without_files_is_rejected() {
        let draft = MemoryDraft { title: "Trip".into(), ..Default::default() };
        assert_eq!(draft.into_records(vec![], Utc::now()).unwrap_err(), ValidationError::NoMedia);
    }

    #[test]
    fn draft_builds_one_record_per_file_with_defaults() {
        let now = Utc::now();
        let draft = MemoryDraft { title: " Orientation ".into(), ..Default::default() };
        let records = draft.into_records(vec![png("a.png"), png("b.png")], now).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.title == "Orientation"));
        assert!(records.iter().all(|r| r.category == Category::General));
        assert!(records.iter().all(|r| r.date == now.date_naive()));
        assert!(records.iter().all(|r| !r.id.is_assigned()));
        assert_eq!(records[1].file_name, "b.png");
    }

    #[test]
    fn draft_rejects_non_media_file() {
        let mut file = png("notes.pdf");
        file.mime_type = "application/pdf".into();
        let draft = MemoryDraft { title: "Notes".into(), ..Default::default() };
        assert!(matches!(
            draft.into_records(vec![file], Utc::now()),
            Err(ValidationError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn raw_candidate_with_required_fields_is_accepted() {
        let record = raw("Beach trip").validate(Utc::now()).unwrap();
        assert_eq!(record.kind, MediaKind::Photo);
        assert_eq!(record.mime_type, "image/jpeg");
        assert_eq!(record.category, Category::General);
        assert_eq!(record.description, "");
    }

    #[test]
    fn raw_candidate_with_blank_title_is_rejected() {
        assert_eq!(raw("  ").validate(Utc::now()).unwrap_err(), ValidationError::MissingTitle);
    }

    #[test]
    fn raw_candidate_without_media_is_rejected() {
        let mut candidate = raw("Beach");
        candidate.file_data_url = Some(String::new());
        assert_eq!(candidate.validate(Utc::now()).unwrap_err(), ValidationError::MissingMedia);
    }

    #[test]
    fn raw_candidate_kind_falls_back_to_mime() {
        let mut candidate = raw("Clip");
        candidate.kind = None;
        candidate.file_type = Some("video/webm".into());
        assert_eq!(candidate.validate(Utc::now()).unwrap().kind, MediaKind::Video);
    }

    #[test]
    fn raw_candidate_with_unknown_kind_is_rejected() {
        let mut candidate = raw("Song");
        candidate.kind = Some("audio".into());
        candidate.file_data_url = Some("data:audio/mp3;base64,AAAA".into());
        assert!(matches!(
            candidate.validate(Utc::now()),
            Err(ValidationError::UnsupportedMedia(_))
        ));
    }

    #[test]
    fn raw_candidate_keeps_valid_date_and_defaults_bad_one() {
        let now = Utc::now();
        let mut candidate = raw("Dated");
        candidate.date = Some("2024-06-01".into());
        assert_eq!(
            candidate.clone().validate(now).unwrap().date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        candidate.date = Some("June first".into());
        assert_eq!(candidate.validate(now).unwrap().date, now.date_naive());
    }

    #[test]
    fn raw_candidate_without_date_uses_creation_day() {
        let mut candidate = raw("Undated");
        candidate.created_at = Some("2023-09-01T23:30:00Z".into());
        let record = candidate.validate(Utc::now()).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 9, 1).unwrap());
        assert_eq!(record.created_at.to_rfc3339(), "2023-09-01T23:30:00+00:00");
    }

    #[test]
    fn edit_keeps_media_and_creation_time() {
        let now = Utc::now();
        let draft = MemoryDraft { title: "Old".into(), ..Default::default() };
        let original = draft.into_records(vec![png("x.png")], now).unwrap().remove(0);
        let edit = MemoryEdit {
            title: Some("New".into()),
            category: Some(Category::Travel),
            ..Default::default()
        };
        let replacement = edit.apply_to(&original).unwrap();
        assert_eq!(replacement.title, "New");
        assert_eq!(replacement.category, Category::Travel);
        assert_eq!(replacement.media, original.media);
        assert_eq!(replacement.created_at, original.created_at);
    }

    #[test]
    fn edit_with_blank_title_is_rejected() {
        let now = Utc::now();
        let draft = MemoryDraft { title: "Old".into(), ..Default::default() };
        let original = draft.into_records(vec![png("x.png")], now).unwrap().remove(0);
        let edit = MemoryEdit { title: Some(" ".into()), ..Default::default() };
        assert_eq!(edit.apply_to(&original).unwrap_err(), ValidationError::MissingTitle);
    }
}
