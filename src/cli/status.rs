//! Scheduler status and audit log display.

use console::style;

use super::helpers;
use crate::config::Settings;
use crate::repository::LogRepository;
use crate::services::BATCH_JOB_NAME;

pub async fn cmd_status(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let logs = LogRepository::new(helpers::pool(settings));

    println!("{}", style("SCHEDULER").cyan().bold());
    match logs.scheduler_status(BATCH_JOB_NAME).await? {
        Some(status) => {
            println!("  {:<12} {}", "Job:", status.job_name);
            println!("  {:<12} {}", "Last run:", status.last_run_at.to_rfc3339());
            println!(
                "  {:<12} {}",
                "Next run:",
                status
                    .next_run_at
                    .map(|dt| dt.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string())
            );
            println!("  {:<12} {}", "Status:", status.last_status.as_str());
            println!("  {:<12} {:.1}s", "Duration:", status.last_duration_sec);
        }
        None => println!("  No batch has run yet."),
    }

    let entries = logs.recent(limit).await?;
    println!();
    println!("{}", style("RECENT GENERATIONS").cyan().bold());
    if entries.is_empty() {
        println!("  No log entries.");
        return Ok(());
    }

    println!(
        "  {:<6} {:<8} {:<10} {:<11} {:<8} {:<22} {}",
        "POST", "SCOPE", "TRIGGER", "TYPE", "STATUS", "STARTED", "NOTE"
    );
    for entry in entries {
        println!(
            "  {:<6} {:<8} {:<10} {:<11} {:<8} {:<22} {}",
            entry.post_id,
            entry.scope.as_str(),
            entry.trigger_type.as_str(),
            entry.summary_type.as_str(),
            entry.status.as_str(),
            entry.started_at.format("%Y-%m-%d %H:%M:%S"),
            entry.note.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
