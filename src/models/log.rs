//! Audit log and scheduler bookkeeping records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What initiated a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "scheduled" => Some(Self::Scheduled),
            _ => None,
        }
    }
}

/// Whether a log row belongs to a single-post call or a batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Single,
    Batch,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "single" => Some(Self::Single),
            "batch" => Some(Self::Batch),
            _ => None,
        }
    }
}

/// What kind of work a generation log row records.
///
/// `Edit` rows come from the CRUD layer recording a user field edit
/// through the same audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryType {
    Full,
    Supplement,
    Skip,
    Failed,
    Edit,
}

impl SummaryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Supplement => "supplement",
            Self::Skip => "skip",
            Self::Failed => "failed",
            Self::Edit => "edit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "full" => Some(Self::Full),
            "supplement" => Some(Self::Supplement),
            "skip" => Some(Self::Skip),
            "failed" => Some(Self::Failed),
            "edit" => Some(Self::Edit),
            _ => None,
        }
    }
}

/// Outcome status for log rows and scheduler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    Skipped,
    Partial,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Partial => "partial",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "skipped" => Some(Self::Skipped),
            "partial" => Some(Self::Partial),
            _ => None,
        }
    }
}

/// One append-only audit row per post touched by a generation run.
#[derive(Debug, Clone)]
pub struct GenerationLog {
    pub id: i32,
    pub trigger_type: TriggerType,
    pub scope: Scope,
    pub post_id: i32,
    pub summary_type: SummaryType,
    pub status: RunStatus,
    pub note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub content_hash_before: Option<String>,
    pub content_hash_after: Option<String>,
}

/// Last-run bookkeeping for a named recurring job, one row per job.
#[derive(Debug, Clone)]
pub struct SchedulerStatus {
    pub job_name: String,
    pub last_run_at: DateTime<Utc>,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_status: RunStatus,
    pub last_duration_sec: f64,
}

/// Aggregate counters for one batch pass over the posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub full_update: usize,
    pub supplement: usize,
    pub skipped: usize,
    pub fail: usize,
}

impl BatchOutcome {
    /// Aggregate status for the scheduler_status row.
    pub fn status(&self) -> RunStatus {
        if self.fail == 0 {
            RunStatus::Success
        } else if self.fail == self.total {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }
}
