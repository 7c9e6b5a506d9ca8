//! Post summary persistence.
//!
//! Full regeneration overwrites only the AI-original columns plus the
//! hash and snapshot bookkeeping. User overrides are written exclusively
//! through [`SummaryRepository::set_user_field`] and cleared only on
//! explicit request.

use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::pool::{DieselError, SqlitePool};
use super::records::PostSummaryRecord;
use super::{parse_datetime, parse_datetime_opt};
use crate::models::{PostSummary, SummaryField, SummaryPayload};
use crate::schema::post_summaries;

impl TryFrom<PostSummaryRecord> for PostSummary {
    type Error = DieselError;

    fn try_from(record: PostSummaryRecord) -> Result<Self, Self::Error> {
        Ok(PostSummary {
            id: record.id,
            post_id: record.post_id,
            main_topic: record.main_topic,
            main_logic: record.main_logic,
            factors: record.factors,
            key_concepts: record.key_concepts,
            summary: record.summary,
            user_main_topic: record.user_main_topic,
            user_main_logic: record.user_main_logic,
            user_factors: record.user_factors,
            user_key_concepts: record.user_key_concepts,
            user_summary: record.user_summary,
            ai_supplement_factors: record.ai_supplement_factors,
            ai_supplement_key_concepts: record.ai_supplement_key_concepts,
            ai_supplement_summary: record.ai_supplement_summary,
            ai_model: record.ai_model,
            is_degraded: record.is_degraded != 0,
            last_post_hash: record.last_post_hash,
            last_post_content_snapshot: record.last_post_content_snapshot,
            last_user_edit_at: parse_datetime_opt(record.last_user_edit_at),
            generated_at: parse_datetime(&record.generated_at),
            updated_at: parse_datetime(&record.updated_at),
        })
    }
}

/// Repository over the `post_summaries` table.
#[derive(Clone)]
pub struct SummaryRepository {
    pool: SqlitePool,
}

impl SummaryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the summary row for a post, if any.
    pub async fn get_by_post(&self, post_id: i32) -> Result<Option<PostSummary>, DieselError> {
        let mut conn = self.pool.get().await?;

        post_summaries::table
            .filter(post_summaries::post_id.eq(post_id))
            .first::<PostSummaryRecord>(&mut conn)
            .await
            .optional()
            .and_then(|opt| opt.map(PostSummary::try_from).transpose())
    }

    /// Store a full regeneration result.
    ///
    /// Overwrites the AI-original fields, model, degraded flag, hash and
    /// snapshot, and clears supplements (a full pass covers everything
    /// they carried). User overrides are untouched.
    pub async fn upsert_full(
        &self,
        post_id: i32,
        payload: &SummaryPayload,
        ai_model: &str,
        is_degraded: bool,
        content_hash: &str,
        content_snapshot: &str,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        let factors = serde_json::to_string(&payload.factors)
            .map_err(|e| DieselError::SerializationError(Box::new(e)))?;
        let key_concepts = serde_json::to_string(&payload.key_concepts)
            .map_err(|e| DieselError::SerializationError(Box::new(e)))?;

        diesel::insert_into(post_summaries::table)
            .values((
                post_summaries::post_id.eq(post_id),
                post_summaries::main_topic.eq(&payload.main_topic),
                post_summaries::main_logic.eq(&payload.main_logic),
                post_summaries::factors.eq(&factors),
                post_summaries::key_concepts.eq(&key_concepts),
                post_summaries::summary.eq(&payload.summary),
                post_summaries::ai_model.eq(ai_model),
                post_summaries::is_degraded.eq(is_degraded as i32),
                post_summaries::last_post_hash.eq(content_hash),
                post_summaries::last_post_content_snapshot.eq(content_snapshot),
                post_summaries::generated_at.eq(&now),
                post_summaries::updated_at.eq(&now),
            ))
            .on_conflict(post_summaries::post_id)
            .do_update()
            .set((
                post_summaries::main_topic.eq(&payload.main_topic),
                post_summaries::main_logic.eq(&payload.main_logic),
                post_summaries::factors.eq(&factors),
                post_summaries::key_concepts.eq(&key_concepts),
                post_summaries::summary.eq(&payload.summary),
                post_summaries::ai_supplement_factors.eq(None::<String>),
                post_summaries::ai_supplement_key_concepts.eq(None::<String>),
                post_summaries::ai_supplement_summary.eq(None::<String>),
                post_summaries::ai_model.eq(ai_model),
                post_summaries::is_degraded.eq(is_degraded as i32),
                post_summaries::last_post_hash.eq(content_hash),
                post_summaries::last_post_content_snapshot.eq(content_snapshot),
                post_summaries::generated_at.eq(&now),
                post_summaries::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Store an incremental supplement plus refreshed hash and snapshot.
    ///
    /// Never touches AI-original fields or user overrides.
    pub async fn apply_supplement(
        &self,
        post_id: i32,
        factors: Option<&str>,
        key_concepts: Option<&str>,
        summary: Option<&str>,
        content_hash: &str,
        content_snapshot: &str,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        diesel::update(post_summaries::table.filter(post_summaries::post_id.eq(post_id)))
            .set((
                post_summaries::ai_supplement_factors.eq(factors),
                post_summaries::ai_supplement_key_concepts.eq(key_concepts),
                post_summaries::ai_supplement_summary.eq(summary),
                post_summaries::last_post_hash.eq(content_hash),
                post_summaries::last_post_content_snapshot.eq(content_snapshot),
                post_summaries::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Refresh only the hash and snapshot bookkeeping.
    pub async fn refresh_snapshot(
        &self,
        post_id: i32,
        content_hash: &str,
        content_snapshot: &str,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        diesel::update(post_summaries::table.filter(post_summaries::post_id.eq(post_id)))
            .set((
                post_summaries::last_post_hash.eq(content_hash),
                post_summaries::last_post_content_snapshot.eq(content_snapshot),
                post_summaries::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Set or clear one user override.
    ///
    /// Clearing an override also clears that field's supplement, since
    /// the supplement was generated against the override baseline.
    pub async fn set_user_field(
        &self,
        post_id: i32,
        field: SummaryField,
        value: Option<&str>,
    ) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        let clear_supplement = value.is_none() && field.has_supplement();

        // One UPDATE per field variant keeps the typed DSL.
        let rows = match field {
            SummaryField::MainTopic => {
                diesel::update(post_summaries::table.filter(post_summaries::post_id.eq(post_id)))
                    .set((
                        post_summaries::user_main_topic.eq(value),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
            }
            SummaryField::MainLogic => {
                diesel::update(post_summaries::table.filter(post_summaries::post_id.eq(post_id)))
                    .set((
                        post_summaries::user_main_logic.eq(value),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
            }
            SummaryField::Factors => {
                if clear_supplement {
                    diesel::update(
                        post_summaries::table.filter(post_summaries::post_id.eq(post_id)),
                    )
                    .set((
                        post_summaries::user_factors.eq(value),
                        post_summaries::ai_supplement_factors.eq(None::<String>),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
                } else {
                    diesel::update(
                        post_summaries::table.filter(post_summaries::post_id.eq(post_id)),
                    )
                    .set((
                        post_summaries::user_factors.eq(value),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
                }
            }
            SummaryField::KeyConcepts => {
                if clear_supplement {
                    diesel::update(
                        post_summaries::table.filter(post_summaries::post_id.eq(post_id)),
                    )
                    .set((
                        post_summaries::user_key_concepts.eq(value),
                        post_summaries::ai_supplement_key_concepts.eq(None::<String>),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
                } else {
                    diesel::update(
                        post_summaries::table.filter(post_summaries::post_id.eq(post_id)),
                    )
                    .set((
                        post_summaries::user_key_concepts.eq(value),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
                }
            }
            SummaryField::Summary => {
                if clear_supplement {
                    diesel::update(
                        post_summaries::table.filter(post_summaries::post_id.eq(post_id)),
                    )
                    .set((
                        post_summaries::user_summary.eq(value),
                        post_summaries::ai_supplement_summary.eq(None::<String>),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
                } else {
                    diesel::update(
                        post_summaries::table.filter(post_summaries::post_id.eq(post_id)),
                    )
                    .set((
                        post_summaries::user_summary.eq(value),
                        post_summaries::last_user_edit_at.eq(&now),
                        post_summaries::updated_at.eq(&now),
                    ))
                    .execute(&mut conn)
                    .await?
                }
            }
        };

        if rows == 0 {
            return Err(DieselError::NotFound);
        }

        Ok(())
    }

    /// Clear all user overrides and supplements for a post.
    pub async fn clear_user_edits(&self, post_id: i32) -> Result<(), DieselError> {
        let mut conn = self.pool.get().await?;

        let now = Utc::now().to_rfc3339();
        diesel::update(post_summaries::table.filter(post_summaries::post_id.eq(post_id)))
            .set((
                post_summaries::user_main_topic.eq(None::<String>),
                post_summaries::user_main_logic.eq(None::<String>),
                post_summaries::user_factors.eq(None::<String>),
                post_summaries::user_key_concepts.eq(None::<String>),
                post_summaries::user_summary.eq(None::<String>),
                post_summaries::ai_supplement_factors.eq(None::<String>),
                post_summaries::ai_supplement_key_concepts.eq(None::<String>),
                post_summaries::ai_supplement_summary.eq(None::<String>),
                post_summaries::updated_at.eq(&now),
            ))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
