use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_time: OffsetDateTime,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub is_indexed: bool,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl FileRecord {
    pub fn kind(&self) -> FileKind {
        FileKind::from_mime(&self.mime_type)
    }

    pub fn matches_category(&self, category: &str) -> bool {
        self.mime_type.contains(category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderRecord {
    pub id: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub modified_time: OffsetDateTime,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// One folder's children as returned by a single listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub files: Vec<FileRecord>,
    pub folders: Vec<FolderRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Spreadsheet,
    Presentation,
    Document,
    Pdf,
    Image,
    Other,
}

impl FileKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.contains("spreadsheet") {
            FileKind::Spreadsheet
        } else if mime_type.contains("presentation") {
            FileKind::Presentation
        } else if mime_type.contains("wordprocessing") || mime_type.contains("document") {
            FileKind::Document
        } else if mime_type.contains("pdf") {
            FileKind::Pdf
        } else if mime_type.contains("image") {
            FileKind::Image
        } else {
            FileKind::Other
        }
    }
}

/// Filter tags offered to users. A tag matches when it is a substring of the
/// record's mime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeCategory {
    Document,
    Spreadsheet,
    Presentation,
    Pdf,
    Image,
}

impl MimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MimeCategory::Document => "document",
            MimeCategory::Spreadsheet => "spreadsheet",
            MimeCategory::Presentation => "presentation",
            MimeCategory::Pdf => "pdf",
            MimeCategory::Image => "image",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    pub mime_types: Option<Vec<String>>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_from: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub date_to: Option<OffsetDateTime>,
}

impl FilterConfig {
    /// Files modified within the last `days` days, relative to `now`.
    pub fn recent(now: OffsetDateTime, days: i64) -> Self {
        Self {
            date_from: Some(now - Duration::days(days)),
            ..Self::default()
        }
    }

    pub fn with_categories(mut self, categories: &[MimeCategory]) -> Self {
        self.mime_types = if categories.is_empty() {
            None
        } else {
            Some(categories.iter().map(|c| c.as_str().to_string()).collect())
        };
        self
    }

    pub fn is_active(&self) -> bool {
        self.mime_types.as_ref().is_some_and(|types| !types.is_empty())
            || self.date_from.is_some()
            || self.date_to.is_some()
    }
}

/// Arguments of a gateway filter call. All present predicates are combined
/// with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterQuery {
    pub name: Option<String>,
    pub mime_types: Vec<String>,
    pub date_from: Option<OffsetDateTime>,
    pub date_to: Option<OffsetDateTime>,
}

impl FilterQuery {
    pub fn new(name: &str, filter: &FilterConfig) -> Self {
        Self {
            name: Some(name.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            mime_types: filter.mime_types.clone().unwrap_or_default(),
            date_from: filter.date_from,
            date_to: filter.date_to,
        }
    }

    pub fn matches(&self, file: &FileRecord) -> bool {
        if let Some(name) = &self.name
            && !file.name.to_lowercase().contains(&name.to_lowercase())
        {
            return false;
        }
        if !self.mime_types.is_empty()
            && !self
                .mime_types
                .iter()
                .any(|category| file.matches_category(category))
        {
            return false;
        }
        if self.date_from.is_some_and(|from| file.modified_time < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| file.modified_time > to) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BulkIndexed {
    pub success: bool,
    #[serde(default)]
    pub indexed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BulkRemoved {
    pub success: bool,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KnowledgeBase {
    pub knowledge_base_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct KnowledgeBaseSync {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

pub fn human_size(bytes: Option<u64>) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let Some(size) = bytes else {
        return "Unknown".to_string();
    };
    let rounded = |unit: u64| (size as f64 / unit as f64).round() as u64;
    if size < KB {
        format!("{size} B")
    } else if size < MB {
        format!("{} KB", rounded(KB))
    } else if size < GB {
        format!("{} MB", rounded(MB))
    } else {
        format!("{} GB", rounded(GB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn file(name: &str, mime_type: &str, modified: OffsetDateTime) -> FileRecord {
        FileRecord {
            id: name.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            modified_time: modified,
            size: None,
            is_indexed: false,
            parent_id: Some("root".into()),
        }
    }

    #[test]
    fn classifies_mime_types_in_priority_order() {
        assert_eq!(
            FileKind::from_mime(
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            ),
            FileKind::Spreadsheet
        );
        assert_eq!(
            FileKind::from_mime(
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            ),
            FileKind::Presentation
        );
        assert_eq!(
            FileKind::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            FileKind::Document
        );
        assert_eq!(FileKind::from_mime("application/pdf"), FileKind::Pdf);
        assert_eq!(FileKind::from_mime("image/png"), FileKind::Image);
        assert_eq!(FileKind::from_mime("text/plain"), FileKind::Other);
    }

    #[test]
    fn formats_sizes_like_the_listing_column() {
        assert_eq!(human_size(None), "Unknown");
        assert_eq!(human_size(Some(512)), "512 B");
        assert_eq!(human_size(Some(245 * 1024)), "245 KB");
        assert_eq!(human_size(Some(3 * 1024 * 1024 + 600 * 1024)), "4 MB");
        assert_eq!(human_size(Some(2 * 1024 * 1024 * 1024)), "2 GB");
    }

    #[test]
    fn empty_filter_is_inactive() {
        assert!(!FilterConfig::default().is_active());
        assert!(
            !FilterConfig {
                mime_types: Some(Vec::new()),
                ..FilterConfig::default()
            }
            .is_active()
        );
        assert!(
            FilterConfig::default()
                .with_categories(&[MimeCategory::Pdf])
                .is_active()
        );
    }

    #[test]
    fn recent_filter_starts_days_before_now() {
        let now = datetime!(2025-04-15 12:00 UTC);
        let filter = FilterConfig::recent(now, 7);
        assert_eq!(filter.date_from, Some(datetime!(2025-04-08 12:00 UTC)));
        assert!(filter.date_to.is_none());
    }

    #[test]
    fn filter_query_combines_predicates_with_and() {
        let filter = FilterConfig {
            mime_types: Some(vec!["pdf".into(), "image".into()]),
            date_from: Some(datetime!(2025-04-01 00:00 UTC)),
            date_to: Some(datetime!(2025-04-30 00:00 UTC)),
        };
        let query = FilterQuery::new("notes", &filter);

        assert!(query.matches(&file(
            "Meeting Notes.pdf",
            "application/pdf",
            datetime!(2025-04-12 16:45 UTC)
        )));
        assert!(!query.matches(&file(
            "Meeting Notes.docx",
            "application/msword",
            datetime!(2025-04-12 16:45 UTC)
        )));
        assert!(!query.matches(&file(
            "Old Notes.pdf",
            "application/pdf",
            datetime!(2025-03-01 00:00 UTC)
        )));
        assert!(!query.matches(&file(
            "Budget.pdf",
            "application/pdf",
            datetime!(2025-04-12 16:45 UTC)
        )));
    }

    #[test]
    fn blank_name_is_not_a_predicate() {
        let query = FilterQuery::new("  ", &FilterConfig::default());
        assert!(query.name.is_none());
        assert!(query.mime_types.is_empty());
    }
}
