//! SQLite persistence layer.
//!
//! Each repository owns a [`SqlitePool`] and exposes typed async methods
//! over the diesel schema. Timestamps are stored as RFC 3339 text.

pub mod content;
pub mod log;
pub mod migrations;
pub mod ocr_queue;
mod records;
pub mod pool;
pub mod summary;

pub use content::{ContentRepository, Post, PostChild};
pub use log::{LogEntry, LogRepository};
pub use ocr_queue::OcrQueueRepository;
pub use pool::{AsyncSqliteConnection, DieselError, SqlitePool};
pub use summary::SummaryRepository;

use chrono::{DateTime, Utc};

/// Parse a datetime string from the database.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Parse an optional datetime string from the database.
pub fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}
