//! Run the pipeline: OCR poller plus batch scheduler.

use std::sync::Arc;

use console::style;

use super::helpers;
use crate::config::Settings;
use crate::repository::migrations::run_migrations;
use crate::services::OcrQueueService;

pub async fn cmd_serve(settings: &Settings) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&settings.data_dir).await?;
    run_migrations(&settings.database_url()).await?;

    let pool = helpers::pool(settings);
    let ocr = Arc::new(OcrQueueService::new(
        pool.clone(),
        settings.ocr.clone(),
        helpers::failure_log(settings),
    ));
    let scheduler = helpers::scheduler(settings, pool)?;

    println!("{} Pipeline running", style("→").cyan());
    println!("  Database:  {}", settings.database_path().display());
    println!(
        "  OCR:       poll every {}s, {} workers",
        settings.ocr.poll_interval_secs, settings.ocr.max_concurrent
    );
    println!(
        "  Summaries: batch every {}h",
        settings.scheduler.interval_hours
    );
    println!("  Press Ctrl+C to stop.");

    let poller = tokio::spawn(ocr.run_poller());
    let batches = tokio::spawn(scheduler.run_loop());

    tokio::signal::ctrl_c().await?;
    println!("\n{} Shutting down.", style("✓").green());

    poller.abort();
    batches.abort();
    Ok(())
}
