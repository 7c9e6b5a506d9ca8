//! Read access to raw content tables and ownership of the OCR mirrors.
//!
//! Raw tables are written by the CRUD layer; this pipeline only reads
//! them. The *_text mirror tables are written here.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{DieselError, SqlitePool};
use super::records::{
    CommentRecord, PostIdeaRecord, PostRecord, RawContentRow, ResultRecord, TextMirrorRecord,
};
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{ContentKind, OcrStatus, TextMirror};
use crate::schema::{comments, post_ideas, posts, results};

/// A forum post.
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        Post {
            id: record.id,
            title: record.title,
            content: record.content,
            created_at: parse_datetime(&record.created_at),
            updated_at: parse_datetime(&record.updated_at),
        }
    }
}

/// A child entity of a post (comment, result, or idea).
#[derive(Debug, Clone)]
pub struct PostChild {
    pub id: i32,
    pub content: String,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TextMirrorRecord> for TextMirror {
    type Error = DieselError;

    fn try_from(record: TextMirrorRecord) -> Result<Self, Self::Error> {
        Ok(TextMirror {
            entity_id: record.entity_id,
            content: record.content,
            ocr_status: OcrStatus::from_str(&record.ocr_status).ok_or_else(|| {
                DieselError::DeserializationError(
                    format!("Invalid ocr_status: '{}'", record.ocr_status).into(),
                )
            })?,
            ocr_processed_at: parse_datetime_opt(record.ocr_processed_at),
            updated_at: parse_datetime(&record.updated_at),
        })
    }
}

/// Repository over raw content and mirror tables.
#[derive(Clone)]
pub struct ContentRepository {
    pool: SqlitePool,
}

impl ContentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a post by id.
    pub async fn get_post(&self, post_id: i32) -> Result<Option<Post>, DieselError> {
        let mut conn = self.pool.get().await?;

        posts::table
            .find(post_id)
            .first::<PostRecord>(&mut conn)
            .await
            .optional()
            .map(|opt| opt.map(Post::from))
    }

    /// All posts, newest first.
    pub async fn list_posts_newest_first(&self) -> Result<Vec<Post>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records = posts::table
            .order(posts::created_at.desc())
            .load::<PostRecord>(&mut conn)
            .await?;

        Ok(records.into_iter().map(Post::from).collect())
    }

    /// Comments of a post, oldest first.
    pub async fn comments_for_post(&self, post_id: i32) -> Result<Vec<PostChild>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records = comments::table
            .filter(comments::post_id.eq(post_id))
            .order(comments::created_at.asc())
            .load::<CommentRecord>(&mut conn)
            .await?;

        Ok(records
            .into_iter()
            .map(|r| PostChild {
                id: r.id,
                content: r.content,
                updated_at: parse_datetime(&r.updated_at),
            })
            .collect())
    }

    /// Results of a post, oldest first.
    pub async fn results_for_post(&self, post_id: i32) -> Result<Vec<PostChild>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records = results::table
            .filter(results::post_id.eq(post_id))
            .order(results::created_at.asc())
            .load::<ResultRecord>(&mut conn)
            .await?;

        Ok(records
            .into_iter()
            .map(|r| PostChild {
                id: r.id,
                content: r.content,
                updated_at: parse_datetime(&r.updated_at),
            })
            .collect())
    }

    /// Ideas of a post, oldest first.
    pub async fn ideas_for_post(&self, post_id: i32) -> Result<Vec<PostChild>, DieselError> {
        let mut conn = self.pool.get().await?;

        let records = post_ideas::table
            .filter(post_ideas::post_id.eq(post_id))
            .order(post_ideas::created_at.asc())
            .load::<PostIdeaRecord>(&mut conn)
            .await?;

        Ok(records
            .into_iter()
            .map(|r| PostChild {
                id: r.id,
                content: r.content,
                updated_at: parse_datetime(&r.updated_at),
            })
            .collect())
    }

    /// Raw content column of any entity kind.
    pub async fn raw_content(
        &self,
        kind: ContentKind,
        entity_id: i32,
    ) -> Result<Option<String>, DieselError> {
        let mut conn = self.pool.get().await?;

        let sql = format!(
            "SELECT content FROM {} WHERE id = ?",
            kind.raw_table()
        );
        let rows: Vec<RawContentRow> = diesel::sql_query(sql)
            .bind::<diesel::sql_types::Integer, _>(entity_id)
            .load(&mut conn)
            .await?;

        Ok(rows.into_iter().next().map(|r| r.content))
    }

    /// Load the OCR mirror row of an entity, if any.
    pub async fn mirror(
        &self,
        kind: ContentKind,
        entity_id: i32,
    ) -> Result<Option<TextMirror>, DieselError> {
        let mut conn = self.pool.get().await?;

        let sql = format!(
            "SELECT {id} AS entity_id, content, ocr_status, ocr_processed_at, updated_at \
             FROM {table} WHERE {id} = ?",
            id = kind.mirror_id_column(),
            table = kind.mirror_table(),
        );
        let rows: Vec<TextMirrorRecord> = diesel::sql_query(sql)
            .bind::<diesel::sql_types::Integer, _>(entity_id)
            .load(&mut conn)
            .await?;

        rows.into_iter().next().map(TextMirror::try_from).transpose()
    }

    /// Upsert a mirror row with the given content and status.
    ///
    /// `ocr_processed_at` is set only when the status is `completed`.
    pub async fn upsert_mirror(
        &self,
        kind: ContentKind,
        entity_id: i32,
        content: &str,
        status: OcrStatus,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        let processed_at = match status {
            OcrStatus::Completed => Some(now.clone()),
            _ => None,
        };

        let sql = format!(
            "INSERT INTO {table} ({id}, content, ocr_status, ocr_processed_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT({id}) DO UPDATE SET \
                 content = excluded.content, \
                 ocr_status = excluded.ocr_status, \
                 ocr_processed_at = excluded.ocr_processed_at, \
                 updated_at = excluded.updated_at",
            id = kind.mirror_id_column(),
            table = kind.mirror_table(),
        );

        diesel::sql_query(sql)
            .bind::<diesel::sql_types::Integer, _>(entity_id)
            .bind::<diesel::sql_types::Text, _>(content)
            .bind::<diesel::sql_types::Text, _>(status.as_str())
            .bind::<diesel::sql_types::Nullable<diesel::sql_types::Text>, _>(
                processed_at.as_deref(),
            )
            .bind::<diesel::sql_types::Text, _>(&now)
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Reset a mirror to `pending` with fresh raw content.
    ///
    /// Called by the CRUD layer when an entity's content changes, paired
    /// with re-enqueueing its images.
    pub async fn mark_mirror_pending(
        &self,
        kind: ContentKind,
        entity_id: i32,
        raw_content: &str,
    ) -> Result<(), DieselError> {
        self.upsert_mirror(kind, entity_id, raw_content, OcrStatus::Pending)
            .await
    }

    /// Most recent content-affecting timestamp of a post: the post's own
    /// update or the latest comment/result/idea update.
    pub async fn last_activity(&self, post_id: i32) -> Result<Option<DateTime<Utc>>, DieselError> {
        let mut conn = self.pool.get().await?;

        let post_updated: Option<String> = posts::table
            .find(post_id)
            .select(posts::updated_at)
            .first(&mut conn)
            .await
            .optional()?;

        let latest_comment: Option<String> = comments::table
            .filter(comments::post_id.eq(post_id))
            .select(diesel::dsl::max(comments::updated_at))
            .first(&mut conn)
            .await?;

        let latest_result: Option<String> = results::table
            .filter(results::post_id.eq(post_id))
            .select(diesel::dsl::max(results::updated_at))
            .first(&mut conn)
            .await?;

        let latest_idea: Option<String> = post_ideas::table
            .filter(post_ideas::post_id.eq(post_id))
            .select(diesel::dsl::max(post_ideas::updated_at))
            .first(&mut conn)
            .await?;

        let latest = [post_updated, latest_comment, latest_result, latest_idea]
            .into_iter()
            .flatten()
            .max();

        Ok(latest.map(|s| parse_datetime(&s)))
    }
}
