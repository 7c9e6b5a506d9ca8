//! Long-running services: OCR enrichment, summary generation, and the
//! batch scheduler.

mod ocr_queue;
mod scheduler;
mod summarizer;

pub use ocr_queue::OcrQueueService;
pub use scheduler::{Scheduler, BATCH_JOB_NAME};
pub use summarizer::{
    compute_hash, GatewayModel, SummarizerError, Summarizer, SummaryModel, UpdateOutcome,
    UpdateResult,
};
