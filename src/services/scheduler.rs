//! Recurring batch summary runs.
//!
//! One named job walks every recently-active post through
//! `smart_update`, records an audit row per post, and upserts a single
//! status row when the pass ends. Overlapping runs are refused with a
//! try-lock on the run guard so a slow batch never stacks behind the
//! timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::summarizer::{Summarizer, SummarizerError, UpdateOutcome, UpdateResult};
use crate::config::SchedulerConfig;
use crate::models::{BatchOutcome, ContentKind, RunStatus, SchedulerStatus, Scope, SummaryType, TriggerType};
use crate::repository::{
    ContentRepository, DieselError, LogEntry, LogRepository, OcrQueueRepository, SqlitePool,
};

/// Job name under which batch runs report their status.
pub const BATCH_JOB_NAME: &str = "batch_summaries";

/// Batch scheduler over the summarizer.
pub struct Scheduler {
    summarizer: Arc<Summarizer>,
    content: ContentRepository,
    ocr_queue: OcrQueueRepository,
    logs: LogRepository,
    config: SchedulerConfig,
    run_guard: Mutex<()>,
}

impl Scheduler {
    pub fn new(pool: SqlitePool, summarizer: Arc<Summarizer>, config: SchedulerConfig) -> Self {
        Self {
            summarizer,
            content: ContentRepository::new(pool.clone()),
            ocr_queue: OcrQueueRepository::new(pool.clone()),
            logs: LogRepository::new(pool),
            config,
            run_guard: Mutex::new(()),
        }
    }

    pub fn logs(&self) -> &LogRepository {
        &self.logs
    }

    /// Run batches forever on the configured interval. The first batch
    /// runs one interval after startup.
    pub async fn run_loop(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.interval_hours * 3600);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            job = BATCH_JOB_NAME,
            interval_hours = self.config.interval_hours,
            "batch scheduler started"
        );

        // tokio intervals fire immediately; consume that tick so the
        // first batch waits out the interval.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let started = Utc::now();
            let scheduler = Arc::clone(&self);
            let handle =
                tokio::spawn(async move { scheduler.run_batch(TriggerType::Scheduled).await });

            match handle.await {
                Ok(Ok(Some(outcome))) => {
                    info!(
                        job = BATCH_JOB_NAME,
                        total = outcome.total,
                        full_update = outcome.full_update,
                        supplement = outcome.supplement,
                        skipped = outcome.skipped,
                        fail = outcome.fail,
                        "batch run finished"
                    );
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    error!(job = BATCH_JOB_NAME, error = %e, "batch run failed");
                    self.record_failed_run(started).await;
                }
                // The batch task panicked; the timer keeps going.
                Err(e) => {
                    error!(job = BATCH_JOB_NAME, error = %e, "batch task aborted");
                    self.record_failed_run(started).await;
                }
            }
        }
    }

    async fn record_failed_run(&self, started: chrono::DateTime<Utc>) {
        let status = SchedulerStatus {
            job_name: BATCH_JOB_NAME.to_string(),
            last_run_at: started,
            next_run_at: Some(started + chrono::Duration::hours(self.config.interval_hours as i64)),
            last_status: RunStatus::Failed,
            last_duration_sec: (Utc::now() - started).num_milliseconds().max(0) as f64 / 1000.0,
        };
        if let Err(e) = self.logs.upsert_scheduler_status(&status).await {
            error!(job = BATCH_JOB_NAME, error = %e, "failed to record run status");
        }
    }

    /// Run one batch pass. Returns `None` when another run is already in
    /// progress.
    pub async fn run_batch(
        &self,
        trigger: TriggerType,
    ) -> Result<Option<BatchOutcome>, DieselError> {
        let _guard = match self.run_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(job = BATCH_JOB_NAME, "batch run already in progress, skipped");
                return Ok(None);
            }
        };

        let started = Utc::now();
        let cutoff = started - chrono::Duration::days(self.config.recency_days);
        let posts = self.content.list_posts_newest_first().await?;

        let mut outcome = BatchOutcome::default();
        let mut first = true;

        for post in posts {
            // Automatic runs only touch recently-active posts. Manual
            // batches cover everything.
            if trigger == TriggerType::Scheduled {
                match self.content.last_activity(post.id).await? {
                    Some(ts) if ts >= cutoff => {}
                    _ => continue,
                }
            }

            if !first {
                tokio::time::sleep(Duration::from_secs(self.config.inter_post_delay_secs)).await;
            }
            first = false;
            outcome.total += 1;

            let post_started = Utc::now();

            // Summarizing half-OCRed content bakes the gap into the hash;
            // wait for the queue to drain for this post.
            if self.has_incomplete_ocr(post.id).await? {
                outcome.skipped += 1;
                self.logs
                    .insert(&LogEntry {
                        trigger_type: trigger,
                        scope: Scope::Batch,
                        post_id: post.id,
                        summary_type: SummaryType::Skip,
                        status: RunStatus::Skipped,
                        note: Some("OCR incomplete".to_string()),
                        started_at: post_started,
                        finished_at: Utc::now(),
                        content_hash_before: None,
                        content_hash_after: None,
                    })
                    .await?;
                continue;
            }

            match self.summarizer.smart_update(post.id, false).await {
                Ok(result) => {
                    self.count_and_log(trigger, post.id, post_started, &result, &mut outcome)
                        .await?;
                }
                // Any failure stays inside the post's boundary; the rest
                // of the batch still runs.
                Err(e) => {
                    outcome.fail += 1;
                    self.logs
                        .insert(&LogEntry {
                            trigger_type: trigger,
                            scope: Scope::Batch,
                            post_id: post.id,
                            summary_type: SummaryType::Failed,
                            status: RunStatus::Failed,
                            note: Some(e.to_string()),
                            started_at: post_started,
                            finished_at: Utc::now(),
                            content_hash_before: None,
                            content_hash_after: None,
                        })
                        .await?;
                }
            }
        }

        let finished = Utc::now();
        self.logs
            .upsert_scheduler_status(&SchedulerStatus {
                job_name: BATCH_JOB_NAME.to_string(),
                last_run_at: started,
                next_run_at: Some(
                    started + chrono::Duration::hours(self.config.interval_hours as i64),
                ),
                last_status: outcome.status(),
                last_duration_sec: (finished - started).num_milliseconds().max(0) as f64 / 1000.0,
            })
            .await?;

        Ok(Some(outcome))
    }

    async fn count_and_log(
        &self,
        trigger: TriggerType,
        post_id: i32,
        post_started: chrono::DateTime<Utc>,
        result: &UpdateResult,
        outcome: &mut BatchOutcome,
    ) -> Result<(), DieselError> {
        let (summary_type, status, note) = match &result.outcome {
            UpdateOutcome::Full { degraded } => {
                outcome.full_update += 1;
                let note = degraded.then(|| "degraded fallback".to_string());
                (SummaryType::Full, RunStatus::Success, note)
            }
            UpdateOutcome::Supplement => {
                outcome.supplement += 1;
                (SummaryType::Supplement, RunStatus::Success, None)
            }
            UpdateOutcome::Skip { reason } => {
                outcome.skipped += 1;
                (SummaryType::Skip, RunStatus::Skipped, Some(reason.clone()))
            }
        };

        self.logs
            .insert(&LogEntry {
                trigger_type: trigger,
                scope: Scope::Batch,
                post_id,
                summary_type,
                status,
                note,
                started_at: post_started,
                finished_at: Utc::now(),
                content_hash_before: result.hash_before.clone(),
                content_hash_after: Some(result.hash_after.clone()),
            })
            .await
    }

    /// Whether the post or any of its children still has OCR tasks in
    /// flight.
    async fn has_incomplete_ocr(&self, post_id: i32) -> Result<bool, DieselError> {
        if self
            .ocr_queue
            .has_incomplete_for_target(ContentKind::Post, post_id)
            .await?
        {
            return Ok(true);
        }

        for child in self.content.comments_for_post(post_id).await? {
            if self
                .ocr_queue
                .has_incomplete_for_target(ContentKind::Comment, child.id)
                .await?
            {
                return Ok(true);
            }
        }
        for child in self.content.results_for_post(post_id).await? {
            if self
                .ocr_queue
                .has_incomplete_for_target(ContentKind::Result, child.id)
                .await?
            {
                return Ok(true);
            }
        }
        for child in self.content.ideas_for_post(post_id).await? {
            if self
                .ocr_queue
                .has_incomplete_for_target(ContentKind::Idea, child.id)
                .await?
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Manual single-post update with an audit row.
    pub async fn run_single(
        &self,
        post_id: i32,
        force_full: bool,
        clear_user_edits: bool,
    ) -> Result<UpdateResult, SummarizerError> {
        let started = Utc::now();

        let result = if clear_user_edits {
            self.summarizer.regenerate(post_id, true).await
        } else {
            self.summarizer.smart_update(post_id, force_full).await
        };

        let entry = match &result {
            Ok(update) => {
                let (summary_type, status, note) = match &update.outcome {
                    UpdateOutcome::Full { degraded } => (
                        SummaryType::Full,
                        RunStatus::Success,
                        degraded.then(|| "degraded fallback".to_string()),
                    ),
                    UpdateOutcome::Supplement => (SummaryType::Supplement, RunStatus::Success, None),
                    UpdateOutcome::Skip { reason } => {
                        (SummaryType::Skip, RunStatus::Skipped, Some(reason.clone()))
                    }
                };
                LogEntry {
                    trigger_type: TriggerType::Manual,
                    scope: Scope::Single,
                    post_id,
                    summary_type,
                    status,
                    note,
                    started_at: started,
                    finished_at: Utc::now(),
                    content_hash_before: update.hash_before.clone(),
                    content_hash_after: Some(update.hash_after.clone()),
                }
            }
            Err(e) => LogEntry {
                trigger_type: TriggerType::Manual,
                scope: Scope::Single,
                post_id,
                summary_type: SummaryType::Failed,
                status: RunStatus::Failed,
                note: Some(e.to_string()),
                started_at: started,
                finished_at: Utc::now(),
                content_hash_before: None,
                content_hash_after: None,
            },
        };
        self.logs.insert(&entry).await?;

        result
    }
}
