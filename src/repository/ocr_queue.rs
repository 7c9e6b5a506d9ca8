//! OCR work queue persistence.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{DieselError, SqlitePool};
use super::records::{NewOcrTask, OcrTaskRecord};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{ContentKind, OcrTask, OcrTaskStatus};
use crate::schema::ocr_queue;

impl TryFrom<OcrTaskRecord> for OcrTask {
    type Error = DieselError;

    fn try_from(record: OcrTaskRecord) -> Result<Self, Self::Error> {
        Ok(OcrTask {
            id: record.id,
            kind: ContentKind::from_str(&record.task_type).ok_or_else(|| {
                DieselError::DeserializationError(
                    format!("Invalid task_type: '{}'", record.task_type).into(),
                )
            })?,
            target_id: record.target_id,
            image_url: record.image_url,
            status: OcrTaskStatus::from_str(&record.status).ok_or_else(|| {
                DieselError::DeserializationError(
                    format!("Invalid task status: '{}'", record.status).into(),
                )
            })?,
            retry_count: record.retry_count,
            max_retries: record.max_retries,
            error_message: record.error_message,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
            processed_at: parse_datetime_opt(record.processed_at),
        })
    }
}

/// Repository over the `ocr_queue` table.
#[derive(Clone)]
pub struct OcrQueueRepository {
    pool: SqlitePool,
}

impl OcrQueueRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a pending task for one image reference.
    pub async fn enqueue(
        &self,
        kind: ContentKind,
        target_id: i32,
        image_url: &str,
        max_retries: i32,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        let task = NewOcrTask {
            task_type: kind.as_str(),
            target_id,
            image_url,
            status: OcrTaskStatus::Pending.as_str(),
            retry_count: 0,
            max_retries,
            created_at: &now,
            updated_at: &now,
        };

        diesel::insert_into(ocr_queue::table)
            .values(&task)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Get a task by id.
    pub async fn get(&self, task_id: i32) -> Result<Option<OcrTask>, DieselError> {
        let mut conn = self.pool.get().await?;

        ocr_queue::table
            .find(task_id)
            .first::<OcrTaskRecord>(&mut conn)
            .await
            .optional()
            .and_then(|opt| opt.map(OcrTask::try_from).transpose())
    }

    /// Oldest pending tasks, up to `limit`.
    pub async fn pending_oldest(&self, limit: i64) -> Result<Vec<OcrTask>, DieselError> {
        let mut conn = self.pool.get().await?;

        ocr_queue::table
            .filter(ocr_queue::status.eq(OcrTaskStatus::Pending.as_str()))
            .order(ocr_queue::created_at.asc())
            .limit(limit)
            .load::<OcrTaskRecord>(&mut conn)
            .await
            .and_then(|records| records.into_iter().map(OcrTask::try_from).collect())
    }

    /// Number of pending tasks.
    pub async fn pending_count(&self) -> Result<u64, DieselError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = ocr_queue::table
            .filter(ocr_queue::status.eq(OcrTaskStatus::Pending.as_str()))
            .count()
            .first(&mut conn)
            .await?;

        Ok(count as u64)
    }

    /// All failed tasks, newest first.
    pub async fn failed_tasks(&self) -> Result<Vec<OcrTask>, DieselError> {
        let mut conn = self.pool.get().await?;

        ocr_queue::table
            .filter(ocr_queue::status.eq(OcrTaskStatus::Failed.as_str()))
            .order(ocr_queue::updated_at.desc())
            .load::<OcrTaskRecord>(&mut conn)
            .await
            .and_then(|records| records.into_iter().map(OcrTask::try_from).collect())
    }

    /// Move a task to `processing`.
    pub async fn mark_processing(&self, task_id: i32) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        diesel::update(ocr_queue::table.find(task_id))
            .set((
                ocr_queue::status.eq(OcrTaskStatus::Processing.as_str()),
                ocr_queue::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Mark a task completed.
    pub async fn mark_completed(&self, task_id: i32) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        diesel::update(ocr_queue::table.find(task_id))
            .set((
                ocr_queue::status.eq(OcrTaskStatus::Completed.as_str()),
                ocr_queue::error_message.eq(None::<String>),
                ocr_queue::updated_at.eq(&now),
                ocr_queue::processed_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Mark a task failed with its error message.
    pub async fn mark_failed(&self, task_id: i32, error: &str) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        diesel::update(ocr_queue::table.find(task_id))
            .set((
                ocr_queue::status.eq(OcrTaskStatus::Failed.as_str()),
                ocr_queue::error_message.eq(error),
                ocr_queue::updated_at.eq(&now),
                ocr_queue::processed_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Resubmit a failed task as pending.
    ///
    /// The retry bound lives in the WHERE clause: a task at or past
    /// `max_retries`, or not in `failed`, is a zero-row no-op. Returns
    /// whether the task was resubmitted.
    pub async fn resubmit(&self, task_id: i32) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        let rows = diesel::update(
            ocr_queue::table
                .find(task_id)
                .filter(ocr_queue::status.eq(OcrTaskStatus::Failed.as_str()))
                .filter(ocr_queue::retry_count.lt(ocr_queue::max_retries)),
        )
        .set((
            ocr_queue::status.eq(OcrTaskStatus::Pending.as_str()),
            ocr_queue::retry_count.eq(ocr_queue::retry_count + 1),
            ocr_queue::error_message.eq(None::<String>),
            ocr_queue::updated_at.eq(&now),
        ))
        .execute(&mut conn)
        .await?;

        Ok(rows > 0)
    }

    /// Whether any task for this entity is still pending or processing.
    pub async fn has_incomplete_for_target(
        &self,
        kind: ContentKind,
        target_id: i32,
    ) -> Result<bool, DieselError> {
        let mut conn = self.pool.get().await?;

        let count: i64 = ocr_queue::table
            .filter(ocr_queue::task_type.eq(kind.as_str()))
            .filter(ocr_queue::target_id.eq(target_id))
            .filter(
                ocr_queue::status
                    .eq(OcrTaskStatus::Pending.as_str())
                    .or(ocr_queue::status.eq(OcrTaskStatus::Processing.as_str())),
            )
            .count()
            .first(&mut conn)
            .await?;

        Ok(count > 0)
    }
}
