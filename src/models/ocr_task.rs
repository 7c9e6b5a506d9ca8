//! OCR work queue task records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContentKind;

/// Lifecycle state of an OCR task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OcrTaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl OcrTaskStatus {
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

/// A single image-extraction task.
///
/// One task is created per image reference found in a content entity's
/// raw text. A failed task may be resubmitted to `pending` only while
/// `retry_count < max_retries`; the bound is enforced by the resubmit
/// UPDATE itself (zero rows affected past the bound).
#[derive(Debug, Clone)]
pub struct OcrTask {
    pub id: i32,
    pub kind: ContentKind,
    pub target_id: i32,
    pub image_url: String,
    pub status: OcrTaskStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OcrTask {
    /// Whether this task may still be resubmitted after a failure.
    pub fn can_retry(&self) -> bool {
        self.status == OcrTaskStatus::Failed && self.retry_count < self.max_retries
    }
}
