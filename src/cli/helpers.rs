//! Shared wiring for CLI commands.

use std::sync::Arc;

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::ocr::FailureLog;
use crate::repository::SqlitePool;
use crate::services::{GatewayModel, Scheduler, Summarizer, SummaryModel};

pub fn pool(settings: &Settings) -> SqlitePool {
    SqlitePool::from_path(&settings.database_path())
}

pub fn failure_log(settings: &Settings) -> FailureLog {
    FailureLog::new(settings.failure_log_path())
}

pub fn summarizer(settings: &Settings, pool: SqlitePool) -> anyhow::Result<Arc<Summarizer>> {
    let client = LlmClient::new(settings.llm.clone())?;
    let model: Arc<dyn SummaryModel> = Arc::new(GatewayModel::new(client));
    Ok(Arc::new(Summarizer::new(pool, model)))
}

pub fn scheduler(settings: &Settings, pool: SqlitePool) -> anyhow::Result<Arc<Scheduler>> {
    let summarizer = summarizer(settings, pool.clone())?;
    Ok(Arc::new(Scheduler::new(
        pool,
        summarizer,
        settings.scheduler.clone(),
    )))
}
