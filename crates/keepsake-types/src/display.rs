//! Presentation helpers shared by every front end.

use chrono::NaiveDate;

use crate::{Category, MediaKind};

/// Human date, e.g. `May 10, 2024`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

/// Placeholder shown for entries without a description.
pub fn description_or_placeholder(description: &str) -> &str {
    if description.trim().is_empty() {
        "No description provided"
    } else {
        description
    }
}

/// `1.5 MB`, `820 KB`, `12 B`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// `Found 1 memory` / `Found 3 memories`.
pub fn result_summary(count: usize) -> String {
    if count == 1 {
        "Found 1 memory".to_string()
    } else {
        format!("Found {count} memories")
    }
}

impl Category {
    /// Capitalised label for menus and cards.
    pub fn label(&self) -> String {
        let slug = self.as_str();
        let mut chars = slug.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl MediaKind {
    pub fn badge(&self) -> &'static str {
        match self {
            MediaKind::Photo => "📷",
            MediaKind::Video => "🎥",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dates_render_long_form() {
        let d = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert_eq!(format_date(d), "May 10, 2024");
    }

    #[test]
    fn empty_description_gets_placeholder() {
        assert_eq!(description_or_placeholder("  "), "No description provided");
        assert_eq!(description_or_placeholder("Sunset"), "Sunset");
    }

    #[test]
    fn file_sizes_scale_units() {
        assert_eq!(format_file_size(12), "12 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn summary_pluralises() {
        assert_eq!(result_summary(1), "Found 1 memory");
        assert_eq!(result_summary(0), "Found 0 memories");
        assert_eq!(result_summary(4), "Found 4 memories");
    }

    #[test]
    fn category_labels_are_capitalised() {
        assert_eq!(Category::Academic.label(), "Academic");
        assert_eq!(Category::Custom("clubs".into()).label(), "Clubs");
    }

    #[test]
    fn kind_badges() {
        assert_eq!(MediaKind::Photo.badge(), "📷");
        assert_eq!(MediaKind::Video.badge(), "🎥");
    }
}
