//! OCR queue management commands.

use std::sync::Arc;

use anyhow::bail;
use console::style;

use super::helpers;
use crate::config::Settings;
use crate::models::ContentKind;
use crate::repository::{ContentRepository, OcrQueueRepository};
use crate::services::OcrQueueService;

fn service(settings: &Settings) -> Arc<OcrQueueService> {
    Arc::new(OcrQueueService::new(
        helpers::pool(settings),
        settings.ocr.clone(),
        helpers::failure_log(settings),
    ))
}

pub async fn cmd_enqueue(settings: &Settings, kind: &str, id: i32) -> anyhow::Result<()> {
    let Some(kind) = ContentKind::from_str(kind) else {
        bail!("unknown entity kind '{}' (expected post, comment, result, idea, or todo)", kind);
    };

    let pool = helpers::pool(settings);
    let content = ContentRepository::new(pool);

    let Some(raw) = content.raw_content(kind, id).await? else {
        bail!("{} {} not found", kind.as_str(), id);
    };

    // Reset the mirror so readers fall back to raw text until the new
    // OCR pass lands.
    content.mark_mirror_pending(kind, id, &raw).await?;
    let count = service(settings).enqueue_for_content(kind, id, &raw).await?;

    if count == 0 {
        println!("{} No upload images found; mirror reset.", style("-").dim());
    } else {
        println!("{} Enqueued {} OCR task(s).", style("✓").green(), count);
    }
    Ok(())
}

pub async fn cmd_retry(settings: &Settings, task_id: i32) -> anyhow::Result<()> {
    if service(settings).retry(task_id).await? {
        println!("{} Task {} resubmitted.", style("✓").green(), task_id);
    } else {
        println!(
            "{} Task {} is not failed or its retry budget is spent.",
            style("!").yellow(),
            task_id
        );
    }
    Ok(())
}

pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let queue = OcrQueueRepository::new(helpers::pool(settings));

    let pending = queue.pending_count().await?;
    let failed = queue.failed_tasks().await?;

    println!("{}", style("OCR QUEUE").cyan().bold());
    println!("  {:<10} {:>6}", "Pending:", pending);
    println!("  {:<10} {:>6}", "Failed:", failed.len());

    if !failed.is_empty() {
        println!();
        println!(
            "  {:<6} {:<8} {:<30} {:<7} {}",
            "ID", "KIND", "IMAGE", "RETRY", "ERROR"
        );
        for task in failed {
            println!(
                "  {:<6} {:<8} {:<30} {:<7} {}",
                task.id,
                task.kind.as_str(),
                task.image_url,
                format!("{}/{}", task.retry_count, task.max_retries),
                task.error_message.as_deref().unwrap_or("-"),
            );
        }
    }
    Ok(())
}
