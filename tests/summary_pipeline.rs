//! End-to-end summary generation tests over a real SQLite database.
//!
//! The model gateway is replaced by a scripted stand-in so the tests
//! exercise hash gating, override isolation, supplements, and the audit
//! trail without a network.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use tempfile::TempDir;

use postscribe::config::SchedulerConfig;
use postscribe::llm::LlmError;
use postscribe::models::{
    ContentKind, Factor, OcrStatus, RunStatus, Scope, SummaryField, SummaryPayload, SummaryType,
    TriggerType,
};
use postscribe::repository::migrations::run_migrations;
use postscribe::repository::{
    ContentRepository, LogRepository, OcrQueueRepository, SqlitePool, SummaryRepository,
};
use postscribe::services::{
    Scheduler, Summarizer, SummaryModel, UpdateOutcome, BATCH_JOB_NAME,
};

#[derive(Default)]
struct ScriptedModel {
    full_calls: AtomicUsize,
    supplement_calls: AtomicUsize,
    fail_full: AtomicBool,
    last_full_content: Mutex<String>,
}

#[async_trait]
impl SummaryModel for ScriptedModel {
    async fn generate_full(
        &self,
        _title: &str,
        content: &str,
    ) -> Result<SummaryPayload, LlmError> {
        self.full_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_full_content.lock().unwrap() = content.to_string();

        if self.fail_full.load(Ordering::SeqCst) {
            return Err(LlmError::Connection("gateway down".to_string()));
        }

        Ok(SummaryPayload {
            main_topic: "动量研究".to_string(),
            main_logic: "基于均线的动量逻辑".to_string(),
            factors: vec![Factor {
                name: "X".to_string(),
                description: "close/ma20".to_string(),
            }],
            key_concepts: vec!["ma20".to_string()],
            summary: "一个动量因子研究".to_string(),
        })
    }

    async fn generate_supplement(
        &self,
        _title: &str,
        _new_content: &str,
    ) -> Result<SummaryPayload, LlmError> {
        self.supplement_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SummaryPayload {
            key_concepts: vec!["ma60".to_string()],
            summary: "新增内容讨论了ma60".to_string(),
            ..SummaryPayload::default()
        })
    }

    fn model_id(&self) -> String {
        "scripted".to_string()
    }
}

async fn setup() -> (TempDir, PathBuf, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    run_migrations(&format!("sqlite:{}", db_path.display()))
        .await
        .unwrap();
    let pool = SqlitePool::from_path(&db_path);
    (dir, db_path, pool)
}

fn seed_post_at(db: &Path, id: i32, title: &str, content: &str, ts: &str) {
    let conn = rusqlite::Connection::open(db).unwrap();
    conn.execute(
        "INSERT INTO posts (id, title, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        rusqlite::params![id, title, content, ts],
    )
    .unwrap();
}

fn seed_post(db: &Path, id: i32, title: &str, content: &str) {
    seed_post_at(db, id, title, content, &Utc::now().to_rfc3339());
}

fn seed_comment(db: &Path, id: i32, post_id: i32, content: &str) {
    let conn = rusqlite::Connection::open(db).unwrap();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO comments (id, post_id, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        rusqlite::params![id, post_id, content, now],
    )
    .unwrap();
}

fn summarizer(pool: &SqlitePool, model: &Arc<ScriptedModel>) -> Summarizer {
    Summarizer::new(pool.clone(), model.clone() as Arc<dyn SummaryModel>)
}

fn scheduler(pool: &SqlitePool, model: &Arc<ScriptedModel>) -> Scheduler {
    Scheduler::new(
        pool.clone(),
        Arc::new(summarizer(pool, model)),
        SchedulerConfig {
            interval_hours: 5,
            recency_days: 3,
            inter_post_delay_secs: 0,
        },
    )
}

#[tokio::test]
async fn test_full_generation_then_hash_gate() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);

    let first = s.smart_update(1, false).await.unwrap();
    assert!(matches!(first.outcome, UpdateOutcome::Full { degraded: false }));

    let second = s.smart_update(1, false).await.unwrap();
    assert!(matches!(second.outcome, UpdateOutcome::Skip { .. }));
    assert_eq!(second.hash_before.as_deref(), Some(second.hash_after.as_str()));
    assert_eq!(model.full_calls.load(Ordering::SeqCst), 1);

    let row = SummaryRepository::new(pool)
        .get_by_post(1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.main_topic, "动量研究");
    assert_eq!(row.ai_model, "scripted");
    assert!(!row.is_degraded);
    assert!(row.last_post_hash.is_some());
}

#[tokio::test]
async fn test_content_change_regenerates_without_overrides() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);

    s.smart_update(1, false).await.unwrap();
    seed_comment(&db, 1, 1, "新评论");

    let result = s.smart_update(1, false).await.unwrap();
    assert!(matches!(result.outcome, UpdateOutcome::Full { degraded: false }));
    assert_ne!(result.hash_before, Some(result.hash_after.clone()));
    assert_eq!(model.full_calls.load(Ordering::SeqCst), 2);
    assert_eq!(model.supplement_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_forced_regen_preserves_overrides() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);
    let summaries = SummaryRepository::new(pool.clone());

    s.smart_update(1, false).await.unwrap();
    summaries
        .set_user_field(1, SummaryField::MainTopic, Some("我的标题"))
        .await
        .unwrap();

    let result = s.smart_update(1, true).await.unwrap();
    assert!(matches!(result.outcome, UpdateOutcome::Full { .. }));

    let row = summaries.get_by_post(1).await.unwrap().unwrap();
    assert_eq!(row.user_main_topic.as_deref(), Some("我的标题"));
    assert_eq!(row.main_topic, "动量研究");
    assert_eq!(row.effective_field(SummaryField::MainTopic), "我的标题");
}

#[tokio::test]
async fn test_overridden_post_gets_supplement_not_regen() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);
    let summaries = SummaryRepository::new(pool.clone());

    s.smart_update(1, false).await.unwrap();
    summaries
        .set_user_field(1, SummaryField::Summary, Some("手工摘要"))
        .await
        .unwrap();

    seed_comment(&db, 1, 1, "新增的评论内容");

    let result = s.smart_update(1, false).await.unwrap();
    assert!(matches!(result.outcome, UpdateOutcome::Supplement));
    assert_eq!(model.full_calls.load(Ordering::SeqCst), 1);
    assert_eq!(model.supplement_calls.load(Ordering::SeqCst), 1);

    let row = summaries.get_by_post(1).await.unwrap().unwrap();
    // Originals and overrides intact, supplement alongside.
    assert_eq!(row.summary, "一个动量因子研究");
    assert_eq!(row.user_summary.as_deref(), Some("手工摘要"));
    assert_eq!(row.ai_supplement_summary.as_deref(), Some("新增内容讨论了ma60"));
    assert!(row.ai_supplement_key_concepts.is_some());
    assert!(row.ai_supplement_factors.is_none());
}

#[tokio::test]
async fn test_overridden_post_skips_when_nothing_new() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);
    let summaries = SummaryRepository::new(pool.clone());

    s.smart_update(1, false).await.unwrap();
    summaries
        .set_user_field(1, SummaryField::Summary, Some("手工摘要"))
        .await
        .unwrap();

    let result = s.smart_update(1, false).await.unwrap();
    assert!(matches!(result.outcome, UpdateOutcome::Skip { .. }));
    assert_eq!(model.supplement_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_degraded_fallback_on_model_failure() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    model.fail_full.store(true, Ordering::SeqCst);
    let s = summarizer(&pool, &model);

    let result = s.smart_update(1, false).await.unwrap();
    assert!(matches!(result.outcome, UpdateOutcome::Full { degraded: true }));

    let row = SummaryRepository::new(pool)
        .get_by_post(1)
        .await
        .unwrap()
        .unwrap();
    assert!(row.is_degraded);
    assert_eq!(row.main_topic, "动量");
    assert_eq!(row.main_logic, "关于动量的研究");
    assert_eq!(row.summary, "帖子标题：动量");
    assert_eq!(row.factors, "[]");
}

#[tokio::test]
async fn test_regenerate_can_discard_overrides() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);
    let summaries = SummaryRepository::new(pool.clone());

    s.smart_update(1, false).await.unwrap();
    summaries
        .set_user_field(1, SummaryField::MainTopic, Some("我的标题"))
        .await
        .unwrap();

    let result = s.regenerate(1, true).await.unwrap();
    assert!(matches!(result.outcome, UpdateOutcome::Full { .. }));

    let row = summaries.get_by_post(1).await.unwrap().unwrap();
    assert!(row.user_main_topic.is_none());
    assert!(!row.has_user_edits());
}

#[tokio::test]
async fn test_clearing_override_clears_its_supplement() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);
    let summaries = SummaryRepository::new(pool.clone());

    s.smart_update(1, false).await.unwrap();
    summaries
        .set_user_field(1, SummaryField::Summary, Some("手工摘要"))
        .await
        .unwrap();
    seed_comment(&db, 1, 1, "新增的评论内容");
    s.smart_update(1, false).await.unwrap();

    let row = summaries.get_by_post(1).await.unwrap().unwrap();
    assert!(row.ai_supplement_summary.is_some());

    summaries
        .set_user_field(1, SummaryField::Summary, None)
        .await
        .unwrap();

    let row = summaries.get_by_post(1).await.unwrap().unwrap();
    assert!(row.user_summary.is_none());
    assert!(row.ai_supplement_summary.is_none());
    // Supplements for untouched fields survive.
    assert!(row.ai_supplement_key_concepts.is_some());
}

#[tokio::test]
async fn test_merged_content_prefers_completed_mirror() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "raw body with image");

    let content = ContentRepository::new(pool.clone());
    content
        .upsert_mirror(ContentKind::Post, 1, "ocr extracted body", OcrStatus::Completed)
        .await
        .unwrap();

    let model = Arc::new(ScriptedModel::default());
    let s = summarizer(&pool, &model);
    s.smart_update(1, false).await.unwrap();

    let sent = model.last_full_content.lock().unwrap().clone();
    assert!(sent.contains("【正文】"));
    assert!(sent.contains("ocr extracted body"));
    assert!(!sent.contains("raw body with image"));
}

#[tokio::test]
async fn test_single_run_writes_audit_row() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "动量", "正文内容");

    let model = Arc::new(ScriptedModel::default());
    let sched = scheduler(&pool, &model);

    sched.run_single(1, false, false).await.unwrap();

    let logs = LogRepository::new(pool);
    let entries = logs.for_post(1, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].trigger_type, TriggerType::Manual);
    assert_eq!(entries[0].scope, Scope::Single);
    assert_eq!(entries[0].summary_type, SummaryType::Full);
    assert_eq!(entries[0].status, RunStatus::Success);
    assert!(entries[0].content_hash_after.is_some());
}

#[tokio::test]
async fn test_batch_counts_and_records_status() {
    let (_dir, db, pool) = setup().await;
    seed_post(&db, 1, "帖子一", "内容一");
    seed_post(&db, 2, "帖子二", "内容二");

    // Post 2 still has OCR in flight; the batch must not bake the gap
    // into its hash.
    OcrQueueRepository::new(pool.clone())
        .enqueue(ContentKind::Post, 2, "/uploads/chart.png", 3)
        .await
        .unwrap();

    let model = Arc::new(ScriptedModel::default());
    let sched = scheduler(&pool, &model);

    let outcome = sched
        .run_batch(TriggerType::Manual)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.full_update, 1);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(outcome.fail, 0);

    let logs = LogRepository::new(pool);
    let status = logs.scheduler_status(BATCH_JOB_NAME).await.unwrap().unwrap();
    assert_eq!(status.last_status, RunStatus::Success);
    assert!(status.next_run_at.is_some());

    let skipped = logs.for_post(2, 10).await.unwrap();
    assert_eq!(skipped[0].summary_type, SummaryType::Skip);
    assert_eq!(skipped[0].note.as_deref(), Some("OCR incomplete"));
}

#[tokio::test]
async fn test_scheduled_batch_skips_stale_posts() {
    let (_dir, db, pool) = setup().await;
    let stale = (Utc::now() - chrono::Duration::days(10)).to_rfc3339();
    seed_post_at(&db, 1, "旧帖子", "很久没动的内容", &stale);

    let model = Arc::new(ScriptedModel::default());
    let sched = scheduler(&pool, &model);

    let outcome = sched
        .run_batch(TriggerType::Scheduled)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.total, 0);

    // Manual batches cover everything regardless of recency.
    let outcome = sched
        .run_batch(TriggerType::Manual)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.total, 1);
}

#[tokio::test]
async fn test_batch_survives_per_post_storage_error() {
    let (_dir, db, pool) = setup().await;
    let earlier = (Utc::now() - chrono::Duration::hours(1)).to_rfc3339();
    seed_post_at(&db, 1, "好帖", "正常内容", &earlier);
    seed_post(&db, 2, "坏帖", "带评论的内容");
    seed_comment(&db, 10, 2, "评论内容");

    // Break storage for post 2's comment mirror only. The batch walks
    // newest-first, so the broken post comes up before the healthy one.
    {
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute("DROP TABLE comments_text", []).unwrap();
    }

    let model = Arc::new(ScriptedModel::default());
    let sched = scheduler(&pool, &model);

    let outcome = sched
        .run_batch(TriggerType::Manual)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.fail, 1);
    assert_eq!(outcome.full_update, 1);

    let logs = LogRepository::new(pool);
    let entries = logs.for_post(2, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].summary_type, SummaryType::Failed);
    assert_eq!(entries[0].status, RunStatus::Failed);

    let status = logs
        .scheduler_status(BATCH_JOB_NAME)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.last_status, RunStatus::Partial);
}

#[tokio::test]
async fn test_user_edit_logged_through_audit_table() {
    let (_dir, _db, pool) = setup().await;

    let logs = LogRepository::new(pool);
    logs.log_user_edit(7, SummaryField::Factors).await.unwrap();

    let entries = logs.for_post(7, 10).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].summary_type, SummaryType::Edit);
    assert_eq!(entries[0].note.as_deref(), Some("field: factors"));
}
