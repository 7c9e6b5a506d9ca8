//! OCR queue tests over a real SQLite database, with the OCR tool
//! replaced by small shell scripts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use postscribe::config::OcrConfig;
use postscribe::models::{ContentKind, OcrStatus, OcrTaskStatus};
use postscribe::ocr::FailureLog;
use postscribe::repository::migrations::run_migrations;
use postscribe::repository::{ContentRepository, OcrQueueRepository, SqlitePool};
use postscribe::services::OcrQueueService;

async fn setup() -> (TempDir, PathBuf, SqlitePool) {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    run_migrations(&format!("sqlite:{}", db_path.display()))
        .await
        .unwrap();
    let pool = SqlitePool::from_path(&db_path);
    (dir, db_path, pool)
}

fn seed_post(db: &Path, id: i32, title: &str, content: &str) {
    let conn = rusqlite::Connection::open(db).unwrap();
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO posts (id, title, content, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        rusqlite::params![id, title, content, now],
    )
    .unwrap();
}

fn service(pool: &SqlitePool, dir: &TempDir, script: &str, max_retries: i32) -> Arc<OcrQueueService> {
    let config = OcrConfig {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        timeout_secs: 10,
        max_concurrent: 2,
        poll_interval_secs: 1,
        max_retries,
    };
    Arc::new(OcrQueueService::new(
        pool.clone(),
        config,
        FailureLog::new(dir.path().join("ocr_failed.txt")),
    ))
}

#[tokio::test]
async fn test_enqueue_scans_upload_images_only() {
    let (dir, db, pool) = setup().await;
    seed_post(
        &db,
        1,
        "图表帖",
        "![a](/uploads/a.png) 外链 ![x](https://cdn.example.com/x.png) ![b](/uploads/sub/b.jpg)",
    );

    let svc = service(&pool, &dir, "true", 3);
    let count = svc
        .enqueue_for_content(
            ContentKind::Post,
            1,
            "![a](/uploads/a.png) 外链 ![x](https://cdn.example.com/x.png) ![b](/uploads/sub/b.jpg)",
        )
        .await
        .unwrap();
    assert_eq!(count, 2);

    let queue = OcrQueueRepository::new(pool);
    assert_eq!(queue.pending_count().await.unwrap(), 2);

    let mut urls: Vec<String> = queue
        .pending_oldest(10)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.image_url)
        .collect();
    urls.sort();
    assert_eq!(urls, vec!["/uploads/a.png", "/uploads/sub/b.jpg"]);
}

#[tokio::test]
async fn test_successful_task_updates_mirror() {
    let (dir, db, pool) = setup().await;
    seed_post(&db, 1, "图表帖", "正文 ![a](/uploads/a.png)");

    let svc = service(
        &pool,
        &dir,
        r#"echo '{"success":true,"processed_content":"正文 图中文字"}'"#,
        3,
    );
    svc.enqueue_for_content(ContentKind::Post, 1, "正文 ![a](/uploads/a.png)")
        .await
        .unwrap();

    let queue = OcrQueueRepository::new(pool.clone());
    let task = queue.pending_oldest(1).await.unwrap().remove(0);
    svc.process_task(&task).await;

    let task = queue.get(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, OcrTaskStatus::Completed);
    assert!(task.processed_at.is_some());

    let mirror = ContentRepository::new(pool)
        .mirror(ContentKind::Post, 1)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(mirror.ocr_status, OcrStatus::Completed);
    assert_eq!(mirror.content, "正文 图中文字");
    assert!(mirror.ocr_processed_at.is_some());
}

#[tokio::test]
async fn test_failed_task_appends_log_and_respects_retry_bound() {
    let (dir, db, pool) = setup().await;
    seed_post(&db, 1, "图表帖", "![a](/uploads/a.png)");

    let svc = service(
        &pool,
        &dir,
        r#"echo '{"success":false,"error":"bad image"}'"#,
        1,
    );
    svc.enqueue_for_content(ContentKind::Post, 1, "![a](/uploads/a.png)")
        .await
        .unwrap();

    let queue = OcrQueueRepository::new(pool.clone());
    let task = queue.pending_oldest(1).await.unwrap().remove(0);

    svc.process_task(&task).await;
    let failed = queue.get(task.id).await.unwrap().unwrap();
    assert_eq!(failed.status, OcrTaskStatus::Failed);
    assert!(failed.error_message.as_deref().unwrap().contains("bad image"));

    let log = tokio::fs::read_to_string(dir.path().join("ocr_failed.txt"))
        .await
        .unwrap();
    assert!(log.starts_with("a.png | "));
    assert!(log.contains("bad image"));

    // A failed task must leave no mirror row behind; readers keep
    // falling back to the raw content.
    assert!(ContentRepository::new(pool.clone())
        .mirror(ContentKind::Post, 1)
        .await
        .unwrap()
        .is_none());

    // First retry fits the budget, the second does not.
    assert!(svc.retry(task.id).await.unwrap());
    let task = queue.get(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, OcrTaskStatus::Pending);
    assert_eq!(task.retry_count, 1);

    svc.process_task(&task).await;
    assert!(!svc.retry(task.id).await.unwrap());
}

#[tokio::test]
async fn test_poller_never_exceeds_concurrency_bound() {
    let (dir, db, pool) = setup().await;
    let content = "![1](/uploads/1.png) ![2](/uploads/2.png) ![3](/uploads/3.png) \
                   ![4](/uploads/4.png) ![5](/uploads/5.png) ![6](/uploads/6.png)";
    seed_post(&db, 1, "多图帖", content);

    // Each fake OCR run holds its permit for a full second, so the six
    // tasks take several poll ticks to drain through two slots.
    let svc = service(
        &pool,
        &dir,
        r#"sleep 1; echo '{"success":true,"processed_content":"图中文字"}'"#,
        3,
    );
    svc.enqueue_for_content(ContentKind::Post, 1, content)
        .await
        .unwrap();

    let poller = tokio::spawn(Arc::clone(&svc).run_poller());

    let conn = rusqlite::Connection::open(&db).unwrap();
    conn.busy_timeout(std::time::Duration::from_secs(5)).unwrap();

    let mut max_processing: i64 = 0;
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(30);
    loop {
        let processing: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ocr_queue WHERE status = 'processing'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        max_processing = max_processing.max(processing);

        let open: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM ocr_queue WHERE status IN ('pending', 'processing')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        if open == 0 {
            break;
        }

        assert!(
            std::time::Instant::now() < deadline,
            "queue did not drain, max processing seen: {}",
            max_processing
        );
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    poller.abort();

    assert_eq!(max_processing, 2);

    let completed: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM ocr_queue WHERE status = 'completed'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(completed, 6);
}

#[tokio::test]
async fn test_missing_entity_fails_task() {
    let (dir, _db, pool) = setup().await;

    let svc = service(&pool, &dir, "true", 3);
    let queue = OcrQueueRepository::new(pool);
    queue
        .enqueue(ContentKind::Comment, 99, "/uploads/gone.png", 3)
        .await
        .unwrap();

    let task = queue.pending_oldest(1).await.unwrap().remove(0);
    svc.process_task(&task).await;

    let task = queue.get(task.id).await.unwrap().unwrap();
    assert_eq!(task.status, OcrTaskStatus::Failed);
    assert!(task
        .error_message
        .as_deref()
        .unwrap()
        .contains("no longer exists"));
}
