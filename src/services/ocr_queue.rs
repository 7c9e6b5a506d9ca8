//! OCR queue poller and worker.
//!
//! A 5 second poller drains pending tasks oldest-first and dispatches
//! them fire-and-forget. The in-flight bound is a semaphore owned by
//! the service; a permit travels with each spawned task and returns
//! when the task finishes, success or failure.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::OcrConfig;
use crate::models::{ContentKind, OcrStatus, OcrTask};
use crate::ocr::{extract_filename, scan_image_urls, FailureLog, OcrEngine};
use crate::repository::{ContentRepository, DieselError, OcrQueueRepository, SqlitePool};

/// Background OCR enrichment service.
pub struct OcrQueueService {
    queue: OcrQueueRepository,
    content: ContentRepository,
    engine: OcrEngine,
    failure_log: FailureLog,
    semaphore: Arc<Semaphore>,
    config: OcrConfig,
}

impl OcrQueueService {
    pub fn new(pool: SqlitePool, config: OcrConfig, failure_log: FailureLog) -> Self {
        let engine = OcrEngine::new(
            config.command.clone(),
            config.args.clone(),
            Duration::from_secs(config.timeout_secs),
        );

        Self {
            queue: OcrQueueRepository::new(pool.clone()),
            content: ContentRepository::new(pool),
            engine,
            failure_log,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        }
    }

    pub fn queue(&self) -> &OcrQueueRepository {
        &self.queue
    }

    /// Scan entity content for upload image references and enqueue one
    /// pending task per match. Returns the number of tasks created.
    pub async fn enqueue_for_content(
        &self,
        kind: ContentKind,
        target_id: i32,
        content: &str,
    ) -> Result<usize, DieselError> {
        let urls = scan_image_urls(content);

        for url in &urls {
            self.queue
                .enqueue(kind, target_id, url, self.config.max_retries)
                .await?;
        }

        if !urls.is_empty() {
            info!(
                kind = kind.as_str(),
                target_id,
                count = urls.len(),
                "enqueued OCR tasks"
            );
        }

        Ok(urls.len())
    }

    /// Run the poller until the process exits.
    pub async fn run_poller(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            interval_secs = self.config.poll_interval_secs,
            max_concurrent = self.config.max_concurrent,
            "OCR poller started"
        );

        loop {
            ticker.tick().await;

            if let Err(e) = Arc::clone(&self).drain_pending().await {
                error!(error = %e, "OCR poll failed");
            }
        }
    }

    /// Dispatch pending tasks up to the remaining permits. Never awaits
    /// task completion.
    async fn drain_pending(self: Arc<Self>) -> Result<(), DieselError> {
        let available = self.semaphore.available_permits();
        if available == 0 {
            return Ok(());
        }

        let tasks = self.queue.pending_oldest(available as i64).await?;
        for task in tasks {
            let permit = match self.semaphore.clone().try_acquire_owned() {
                Ok(permit) => permit,
                // Another dispatcher won the race; the task stays pending
                // for the next tick.
                Err(_) => break,
            };

            self.queue.mark_processing(task.id).await?;

            let service = Arc::clone(&self);
            tokio::spawn(async move {
                service.process_task(&task).await;
                drop(permit);
            });
        }

        Ok(())
    }

    /// Run one task to completion. Failures are absorbed here; nothing
    /// propagates to the poller.
    pub async fn process_task(&self, task: &OcrTask) {
        debug!(task_id = task.id, image_url = %task.image_url, "processing OCR task");

        let raw = match self.content.raw_content(task.kind, task.target_id).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.fail_task(task, "owning entity no longer exists").await;
                return;
            }
            Err(e) => {
                self.fail_task(task, &format!("failed to load entity: {}", e))
                    .await;
                return;
            }
        };

        match self.engine.process(&raw).await {
            Ok(processed) => {
                let stored = self
                    .content
                    .upsert_mirror(task.kind, task.target_id, &processed, OcrStatus::Completed)
                    .await;

                match stored {
                    Ok(()) => {
                        if let Err(e) = self.queue.mark_completed(task.id).await {
                            error!(task_id = task.id, error = %e, "failed to mark task completed");
                        }
                        info!(task_id = task.id, "OCR task completed");
                    }
                    Err(e) => {
                        self.fail_task(task, &format!("failed to store mirror: {}", e))
                            .await;
                    }
                }
            }
            Err(e) => {
                self.fail_task(task, &e.to_string()).await;
            }
        }
    }

    async fn fail_task(&self, task: &OcrTask, error: &str) {
        warn!(task_id = task.id, error, "OCR task failed");

        let filename = extract_filename(&task.image_url);
        if let Err(e) = self.failure_log.append(filename, error).await {
            error!(error = %e, "failed to append OCR failure log");
        }

        if let Err(e) = self.queue.mark_failed(task.id, error).await {
            error!(task_id = task.id, error = %e, "failed to mark task failed");
        }
    }

    /// Resubmit a failed task, bounded by its retry budget.
    pub async fn retry(&self, task_id: i32) -> Result<bool, DieselError> {
        let resubmitted = self.queue.resubmit(task_id).await?;
        if resubmitted {
            info!(task_id, "OCR task resubmitted");
        } else {
            warn!(task_id, "OCR task not eligible for retry");
        }
        Ok(resubmitted)
    }
}
