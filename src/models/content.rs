//! Content entity kinds and their OCR text mirrors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of content entity that can carry embedded images.
///
/// Each kind has a raw content table (owned by the CRUD layer) and a
/// plain-text mirror table (owned by the OCR worker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Post,
    Comment,
    Result,
    Idea,
    Todo,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Result => "result",
            Self::Idea => "idea",
            Self::Todo => "todo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "result" => Some(Self::Result),
            "idea" => Some(Self::Idea),
            "todo" => Some(Self::Todo),
            _ => None,
        }
    }

    /// Name of the raw content table owned by the CRUD layer.
    pub fn raw_table(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
            Self::Result => "results",
            Self::Idea => "post_ideas",
            Self::Todo => "todos",
        }
    }

    /// Name of the mirror table holding the OCR-derived text.
    pub fn mirror_table(&self) -> &'static str {
        match self {
            Self::Post => "posts_text",
            Self::Comment => "comments_text",
            Self::Result => "results_text",
            Self::Idea => "post_ideas_text",
            Self::Todo => "todos_text",
        }
    }

    /// Primary key column of the mirror table.
    pub fn mirror_id_column(&self) -> &'static str {
        match self {
            Self::Post => "post_id",
            Self::Comment => "comment_id",
            Self::Result => "result_id",
            Self::Idea => "idea_id",
            Self::Todo => "todo_id",
        }
    }
}

/// OCR processing state of a mirror row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OcrStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A plain-text mirror of an image-bearing content entity.
#[derive(Debug, Clone)]
pub struct TextMirror {
    pub entity_id: i32,
    pub content: String,
    pub ocr_status: OcrStatus,
    pub ocr_processed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_roundtrip() {
        for kind in [
            ContentKind::Post,
            ContentKind::Comment,
            ContentKind::Result,
            ContentKind::Idea,
            ContentKind::Todo,
        ] {
            assert_eq!(ContentKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_content_kind_from_invalid() {
        assert_eq!(ContentKind::from_str("page"), None);
        assert_eq!(ContentKind::from_str(""), None);
    }

    #[test]
    fn test_table_names() {
        assert_eq!(ContentKind::Post.raw_table(), "posts");
        assert_eq!(ContentKind::Post.mirror_table(), "posts_text");
        assert_eq!(ContentKind::Idea.mirror_table(), "post_ideas_text");
        assert_eq!(ContentKind::Idea.mirror_id_column(), "idea_id");
    }

    #[test]
    fn test_ocr_status_roundtrip() {
        for status in [
            OcrStatus::Pending,
            OcrStatus::Processing,
            OcrStatus::Completed,
            OcrStatus::Failed,
        ] {
            assert_eq!(OcrStatus::from_str(status.as_str()), Some(status));
        }
    }
}
