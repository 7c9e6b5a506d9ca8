use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0001_initial_schema")
        // Raw content tables. Writes come from the CRUD layer; they are
        // created here so the pipeline is self-contained.
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
        ))
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id)
)"#,
        ))
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id)
)"#,
        ))
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS post_ideas (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id)
)"#,
        ))
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS todos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)"#,
        ))
        // OCR mirror tables, one row per entity.
        .operation(
            CreateTable::new("posts_text")
                .add_field(Field::new("post_id", FieldType::Integer).primary_key())
                .add_field(Field::new("content", FieldType::Text).not_null())
                .add_field(Field::new("ocr_status", FieldType::Text).not_null().default("'pending'"))
                .add_field(Field::new("ocr_processed_at", FieldType::Text))
                .add_field(Field::new("updated_at", FieldType::Text).not_null()),
        )
        .operation(
            CreateTable::new("comments_text")
                .add_field(Field::new("comment_id", FieldType::Integer).primary_key())
                .add_field(Field::new("content", FieldType::Text).not_null())
                .add_field(Field::new("ocr_status", FieldType::Text).not_null().default("'pending'"))
                .add_field(Field::new("ocr_processed_at", FieldType::Text))
                .add_field(Field::new("updated_at", FieldType::Text).not_null()),
        )
        .operation(
            CreateTable::new("results_text")
                .add_field(Field::new("result_id", FieldType::Integer).primary_key())
                .add_field(Field::new("content", FieldType::Text).not_null())
                .add_field(Field::new("ocr_status", FieldType::Text).not_null().default("'pending'"))
                .add_field(Field::new("ocr_processed_at", FieldType::Text))
                .add_field(Field::new("updated_at", FieldType::Text).not_null()),
        )
        .operation(
            CreateTable::new("post_ideas_text")
                .add_field(Field::new("idea_id", FieldType::Integer).primary_key())
                .add_field(Field::new("content", FieldType::Text).not_null())
                .add_field(Field::new("ocr_status", FieldType::Text).not_null().default("'pending'"))
                .add_field(Field::new("ocr_processed_at", FieldType::Text))
                .add_field(Field::new("updated_at", FieldType::Text).not_null()),
        )
        .operation(
            CreateTable::new("todos_text")
                .add_field(Field::new("todo_id", FieldType::Integer).primary_key())
                .add_field(Field::new("content", FieldType::Text).not_null())
                .add_field(Field::new("ocr_status", FieldType::Text).not_null().default("'pending'"))
                .add_field(Field::new("ocr_processed_at", FieldType::Text))
                .add_field(Field::new("updated_at", FieldType::Text).not_null()),
        )
        // OCR work queue
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS ocr_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_type TEXT NOT NULL,
    target_id INTEGER NOT NULL,
    image_url TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    retry_count INTEGER NOT NULL DEFAULT 0,
    max_retries INTEGER NOT NULL DEFAULT 3,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    processed_at TEXT
)"#,
        ))
        // Post summaries
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS post_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id INTEGER NOT NULL UNIQUE,
    main_topic TEXT NOT NULL DEFAULT '',
    main_logic TEXT NOT NULL DEFAULT '',
    factors TEXT NOT NULL DEFAULT '[]',
    key_concepts TEXT NOT NULL DEFAULT '[]',
    summary TEXT NOT NULL DEFAULT '',
    user_main_topic TEXT,
    user_main_logic TEXT,
    user_factors TEXT,
    user_key_concepts TEXT,
    user_summary TEXT,
    ai_supplement_factors TEXT,
    ai_supplement_key_concepts TEXT,
    ai_supplement_summary TEXT,
    ai_model TEXT NOT NULL DEFAULT '',
    is_degraded INTEGER NOT NULL DEFAULT 0,
    last_post_hash TEXT,
    last_post_content_snapshot TEXT,
    last_user_edit_at TEXT,
    generated_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (post_id) REFERENCES posts(id)
)"#,
        ))
        // Generation audit log
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS summary_generation_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger_type TEXT NOT NULL,
    scope TEXT NOT NULL,
    post_id INTEGER NOT NULL,
    summary_type TEXT NOT NULL,
    status TEXT NOT NULL,
    note TEXT,
    started_at TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    duration_sec REAL NOT NULL,
    content_hash_before TEXT,
    content_hash_after TEXT
)"#,
        ))
        // Scheduler bookkeeping
        .operation(RunSql::new(
            r#"CREATE TABLE IF NOT EXISTS scheduler_status (
    job_name TEXT PRIMARY KEY,
    last_run_at TEXT NOT NULL,
    next_run_at TEXT,
    last_status TEXT NOT NULL,
    last_duration_sec REAL NOT NULL DEFAULT 0
)"#,
        ))
        // Indexes
        .operation(AddIndex::new("comments", Index::new("idx_comments_post").column("post_id")))
        .operation(AddIndex::new("results", Index::new("idx_results_post").column("post_id")))
        .operation(AddIndex::new("post_ideas", Index::new("idx_post_ideas_post").column("post_id")))
        .operation(AddIndex::new("ocr_queue", Index::new("idx_ocr_queue_status").column("status")))
        .operation(AddIndex::new("ocr_queue", Index::new("idx_ocr_queue_status_created").column("status").column("created_at")))
        .operation(AddIndex::new("ocr_queue", Index::new("idx_ocr_queue_target").column("task_type").column("target_id")))
        .operation(AddIndex::new("post_summaries", Index::new("idx_post_summaries_post").column("post_id")))
        .operation(AddIndex::new("summary_generation_logs", Index::new("idx_generation_logs_post").column("post_id")))
        .operation(AddIndex::new("summary_generation_logs", Index::new("idx_generation_logs_started").column_desc("started_at")))
}
