//! Generation audit log and scheduler status persistence.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{DieselError, SqlitePool};
use super::records::{GenerationLogRecord, NewGenerationLog, SchedulerStatusRecord};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{
    GenerationLog, RunStatus, SchedulerStatus, Scope, SummaryField, SummaryType, TriggerType,
};
use crate::schema::{scheduler_status, summary_generation_logs};

impl TryFrom<GenerationLogRecord> for GenerationLog {
    type Error = DieselError;

    fn try_from(record: GenerationLogRecord) -> Result<Self, Self::Error> {
        let invalid = |what: &str, value: &str| {
            DieselError::DeserializationError(format!("Invalid {}: '{}'", what, value).into())
        };

        Ok(GenerationLog {
            id: record.id,
            trigger_type: TriggerType::from_str(&record.trigger_type)
                .ok_or_else(|| invalid("trigger_type", &record.trigger_type))?,
            scope: Scope::from_str(&record.scope).ok_or_else(|| invalid("scope", &record.scope))?,
            post_id: record.post_id,
            summary_type: SummaryType::from_str(&record.summary_type)
                .ok_or_else(|| invalid("summary_type", &record.summary_type))?,
            status: RunStatus::from_str(&record.status)
                .ok_or_else(|| invalid("status", &record.status))?,
            note: record.note,
            started_at: parse_datetime(&record.started_at),
            finished_at: parse_datetime(&record.finished_at),
            duration_sec: record.duration_sec,
            content_hash_before: record.content_hash_before,
            content_hash_after: record.content_hash_after,
        })
    }
}

impl TryFrom<SchedulerStatusRecord> for SchedulerStatus {
    type Error = DieselError;

    fn try_from(record: SchedulerStatusRecord) -> Result<Self, Self::Error> {
        Ok(SchedulerStatus {
            job_name: record.job_name,
            last_run_at: parse_datetime(&record.last_run_at),
            next_run_at: parse_datetime_opt(record.next_run_at),
            last_status: RunStatus::from_str(&record.last_status).ok_or_else(|| {
                DieselError::DeserializationError(
                    format!("Invalid last_status: '{}'", record.last_status).into(),
                )
            })?,
            last_duration_sec: record.last_duration_sec,
        })
    }
}

/// One generation log entry ready for insertion.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub trigger_type: TriggerType,
    pub scope: Scope,
    pub post_id: i32,
    pub summary_type: SummaryType,
    pub status: RunStatus,
    pub note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub content_hash_before: Option<String>,
    pub content_hash_after: Option<String>,
}

/// Repository over the audit log and scheduler status tables.
#[derive(Clone)]
pub struct LogRepository {
    pool: SqlitePool,
}

impl LogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one audit row.
    pub async fn insert(&self, entry: &LogEntry) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let started_at = entry.started_at.to_rfc3339();
        let finished_at = entry.finished_at.to_rfc3339();
        let duration_sec = (entry.finished_at - entry.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0;

        let row = NewGenerationLog {
            trigger_type: entry.trigger_type.as_str(),
            scope: entry.scope.as_str(),
            post_id: entry.post_id,
            summary_type: entry.summary_type.as_str(),
            status: entry.status.as_str(),
            note: entry.note.as_deref(),
            started_at: &started_at,
            finished_at: &finished_at,
            duration_sec,
            content_hash_before: entry.content_hash_before.as_deref(),
            content_hash_after: entry.content_hash_after.as_deref(),
        };

        diesel::insert_into(summary_generation_logs::table)
            .values(&row)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Record a user field edit made through the CRUD layer.
    pub async fn log_user_edit(&self, post_id: i32, field: SummaryField) -> Result<(), DieselError> {
        let now = Utc::now();
        self.insert(&LogEntry {
            trigger_type: TriggerType::Manual,
            scope: Scope::Single,
            post_id,
            summary_type: SummaryType::Edit,
            status: RunStatus::Success,
            note: Some(format!("field: {}", field.as_str())),
            started_at: now,
            finished_at: now,
            content_hash_before: None,
            content_hash_after: None,
        })
        .await
    }

    /// Most recent log rows, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<GenerationLog>, DieselError> {
        let mut conn = self.pool.get().await?;

        summary_generation_logs::table
            .order(summary_generation_logs::id.desc())
            .limit(limit)
            .load::<GenerationLogRecord>(&mut conn)
            .await
            .and_then(|records| records.into_iter().map(GenerationLog::try_from).collect())
    }

    /// Log rows for one post, newest first.
    pub async fn for_post(&self, post_id: i32, limit: i64) -> Result<Vec<GenerationLog>, DieselError> {
        let mut conn = self.pool.get().await?;

        summary_generation_logs::table
            .filter(summary_generation_logs::post_id.eq(post_id))
            .order(summary_generation_logs::id.desc())
            .limit(limit)
            .load::<GenerationLogRecord>(&mut conn)
            .await
            .and_then(|records| records.into_iter().map(GenerationLog::try_from).collect())
    }

    /// Upsert the status row for a named job.
    pub async fn upsert_scheduler_status(&self, status: &SchedulerStatus) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let last_run_at = status.last_run_at.to_rfc3339();
        let next_run_at = status.next_run_at.map(|dt| dt.to_rfc3339());

        diesel::insert_into(scheduler_status::table)
            .values((
                scheduler_status::job_name.eq(&status.job_name),
                scheduler_status::last_run_at.eq(&last_run_at),
                scheduler_status::next_run_at.eq(next_run_at.as_deref()),
                scheduler_status::last_status.eq(status.last_status.as_str()),
                scheduler_status::last_duration_sec.eq(status.last_duration_sec),
            ))
            .on_conflict(scheduler_status::job_name)
            .do_update()
            .set((
                scheduler_status::last_run_at.eq(&last_run_at),
                scheduler_status::next_run_at.eq(next_run_at.as_deref()),
                scheduler_status::last_status.eq(status.last_status.as_str()),
                scheduler_status::last_duration_sec.eq(status.last_duration_sec),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Get the status row for a named job.
    pub async fn scheduler_status(&self, job_name: &str) -> Result<Option<SchedulerStatus>, DieselError> {
        let mut conn = self.pool.get().await?;

        scheduler_status::table
            .find(job_name)
            .first::<SchedulerStatusRecord>(&mut conn)
            .await
            .optional()
            .and_then(|opt| opt.map(SchedulerStatus::try_from).transpose())
    }
}
