//! Data models for Postscribe.

mod content;
mod log;
mod ocr_task;
mod summary;

pub use content::{ContentKind, OcrStatus, TextMirror};
pub use log::{
    BatchOutcome, GenerationLog, RunStatus, SchedulerStatus, Scope, SummaryType, TriggerType,
};
pub use ocr_task::{OcrTask, OcrTaskStatus};
pub use summary::{EffectiveSummary, Factor, PostSummary, SummaryField, SummaryPayload};
