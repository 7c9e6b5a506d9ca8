//! Diesel ORM records for database tables.
//!
//! These provide compile-time type checking for database operations.
//! Conversions to domain models live next to the repositories that use
//! them.

use diesel::prelude::*;

use crate::schema;

/// Post record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostRecord {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Comment record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::comments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CommentRecord {
    pub id: i32,
    pub post_id: i32,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Result record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::results)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ResultRecord {
    pub id: i32,
    pub post_id: i32,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Post idea record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::post_ideas)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostIdeaRecord {
    pub id: i32,
    pub post_id: i32,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Todo record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::todos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TodoRecord {
    pub id: i32,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Text mirror row as loaded from any of the *_text tables.
///
/// The five mirror tables share a shape, so they are read with raw SQL
/// that aliases the table-specific id column to `entity_id`.
#[derive(QueryableByName, Debug, Clone)]
pub struct TextMirrorRecord {
    #[diesel(sql_type = diesel::sql_types::Integer)]
    pub entity_id: i32,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub content: String,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub ocr_status: String,
    #[diesel(sql_type = diesel::sql_types::Nullable<diesel::sql_types::Text>)]
    pub ocr_processed_at: Option<String>,
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub updated_at: String,
}

/// Single content column loaded via raw SQL.
#[derive(QueryableByName, Debug, Clone)]
pub struct RawContentRow {
    #[diesel(sql_type = diesel::sql_types::Text)]
    pub content: String,
}

/// OCR queue task record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::ocr_queue)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OcrTaskRecord {
    pub id: i32,
    pub task_type: String,
    pub target_id: i32,
    pub image_url: String,
    pub status: String,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub processed_at: Option<String>,
}

/// New OCR task for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::ocr_queue)]
pub struct NewOcrTask<'a> {
    pub task_type: &'a str,
    pub target_id: i32,
    pub image_url: &'a str,
    pub status: &'a str,
    pub retry_count: i32,
    pub max_retries: i32,
    pub created_at: &'a str,
    pub updated_at: &'a str,
}

/// Post summary record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::post_summaries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostSummaryRecord {
    pub id: i32,
    pub post_id: i32,
    pub main_topic: String,
    pub main_logic: String,
    pub factors: String,
    pub key_concepts: String,
    pub summary: String,
    pub user_main_topic: Option<String>,
    pub user_main_logic: Option<String>,
    pub user_factors: Option<String>,
    pub user_key_concepts: Option<String>,
    pub user_summary: Option<String>,
    pub ai_supplement_factors: Option<String>,
    pub ai_supplement_key_concepts: Option<String>,
    pub ai_supplement_summary: Option<String>,
    pub ai_model: String,
    pub is_degraded: i32,
    pub last_post_hash: Option<String>,
    pub last_post_content_snapshot: Option<String>,
    pub last_user_edit_at: Option<String>,
    pub generated_at: String,
    pub updated_at: String,
}

/// New generation log row for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::summary_generation_logs)]
pub struct NewGenerationLog<'a> {
    pub trigger_type: &'a str,
    pub scope: &'a str,
    pub post_id: i32,
    pub summary_type: &'a str,
    pub status: &'a str,
    pub note: Option<&'a str>,
    pub started_at: &'a str,
    pub finished_at: &'a str,
    pub duration_sec: f64,
    pub content_hash_before: Option<&'a str>,
    pub content_hash_after: Option<&'a str>,
}

/// Generation log record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::summary_generation_logs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GenerationLogRecord {
    pub id: i32,
    pub trigger_type: String,
    pub scope: String,
    pub post_id: i32,
    pub summary_type: String,
    pub status: String,
    pub note: Option<String>,
    pub started_at: String,
    pub finished_at: String,
    pub duration_sec: f64,
    pub content_hash_before: Option<String>,
    pub content_hash_after: Option<String>,
}

/// Scheduler status record from the database.
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = schema::scheduler_status)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SchedulerStatusRecord {
    pub job_name: String,
    pub last_run_at: String,
    pub next_run_at: Option<String>,
    pub last_status: String,
    pub last_duration_sec: f64,
}
