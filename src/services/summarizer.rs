//! Hash-gated summary generation.
//!
//! `smart_update` decides between a full regeneration and an incremental
//! supplement. Posts without user overrides regenerate in place, gated
//! on the MD5 hash of the merged content. Posts with overrides never get
//! their AI-original fields rewritten; new content is summarized
//! separately and stored as a supplement annotation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::diff::compute_diff;
use crate::llm::{prompts, repair, LlmClient, LlmError};
use crate::models::{ContentKind, OcrStatus, PostSummary, SummaryPayload};
use crate::repository::{
    ContentRepository, DieselError, Post, SqlitePool, SummaryRepository,
};

/// Errors from summary generation.
#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("Post {0} not found")]
    PostNotFound(i32),

    #[error("Database error: {0}")]
    Db(#[from] DieselError),

    #[error("Model error: {0}")]
    Model(#[from] LlmError),
}

/// Seam between the update logic and the model gateway.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Generate a full structured summary of a post.
    async fn generate_full(&self, title: &str, content: &str)
        -> Result<SummaryPayload, LlmError>;

    /// Summarize only content added since the last pass.
    async fn generate_supplement(
        &self,
        title: &str,
        new_content: &str,
    ) -> Result<SummaryPayload, LlmError>;

    /// Identifier recorded alongside generated rows.
    fn model_id(&self) -> String;
}

/// [`SummaryModel`] backed by the HTTP gateway.
///
/// The conversation session is created lazily on first use and shared by
/// all subsequent requests.
pub struct GatewayModel {
    client: LlmClient,
    session: OnceCell<String>,
}

impl GatewayModel {
    pub fn new(client: LlmClient) -> Self {
        Self {
            client,
            session: OnceCell::new(),
        }
    }

    async fn session_id(&self) -> Result<&str, LlmError> {
        self.session
            .get_or_try_init(|| self.client.create_session(prompts::SESSION_TITLE))
            .await
            .map(String::as_str)
    }

    async fn ask(&self, prompt: &str) -> Result<SummaryPayload, LlmError> {
        let session_id = self.session_id().await?;
        let reply = self
            .client
            .send_message(session_id, prompts::SYSTEM_PROMPT, prompt)
            .await?;

        repair::parse_summary_response(&reply)
            .ok_or_else(|| LlmError::Parse("Unparseable summary response".to_string()))
    }
}

#[async_trait]
impl SummaryModel for GatewayModel {
    async fn generate_full(
        &self,
        title: &str,
        content: &str,
    ) -> Result<SummaryPayload, LlmError> {
        self.ask(&prompts::full_summary_prompt(title, content)).await
    }

    async fn generate_supplement(
        &self,
        title: &str,
        new_content: &str,
    ) -> Result<SummaryPayload, LlmError> {
        self.ask(&prompts::supplement_prompt(title, new_content))
            .await
    }

    fn model_id(&self) -> String {
        self.client.config().model_id.clone()
    }
}

/// What `smart_update` did for a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// AI-original fields rewritten. `degraded` marks the title-only
    /// fallback stored after a model failure.
    Full { degraded: bool },
    /// Supplement annotations refreshed; originals and overrides intact.
    Supplement,
    /// Nothing to do.
    Skip { reason: String },
}

/// Outcome of one update together with the hash transition, for the
/// audit log.
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub outcome: UpdateOutcome,
    pub hash_before: Option<String>,
    pub hash_after: String,
}

/// MD5 hex digest of merged post content.
pub fn compute_hash(content: &str) -> String {
    format!("{:x}", md5::compute(content))
}

/// Summary generation service.
pub struct Summarizer {
    content: ContentRepository,
    summaries: SummaryRepository,
    model: Arc<dyn SummaryModel>,
}

impl Summarizer {
    pub fn new(pool: SqlitePool, model: Arc<dyn SummaryModel>) -> Self {
        Self {
            content: ContentRepository::new(pool.clone()),
            summaries: SummaryRepository::new(pool),
            model,
        }
    }

    pub fn summaries(&self) -> &SummaryRepository {
        &self.summaries
    }

    /// Prefer the completed OCR mirror of an entity over its raw text.
    async fn enriched(
        &self,
        kind: ContentKind,
        entity_id: i32,
        raw: &str,
    ) -> Result<String, DieselError> {
        match self.content.mirror(kind, entity_id).await? {
            Some(m) if m.ocr_status == OcrStatus::Completed && !m.content.is_empty() => {
                Ok(m.content)
            }
            _ => Ok(raw.to_string()),
        }
    }

    /// Assemble the merged content of a post: labeled sections in fixed
    /// order, each entity preferring its OCR mirror.
    pub async fn merged_content(&self, post: &Post) -> Result<String, DieselError> {
        let mut sections: Vec<(&str, String)> = Vec::new();

        let body = self.enriched(ContentKind::Post, post.id, &post.content).await?;
        sections.push(("正文", body));

        let mut ideas = Vec::new();
        for child in self.content.ideas_for_post(post.id).await? {
            ideas.push(self.enriched(ContentKind::Idea, child.id, &child.content).await?);
        }
        if !ideas.is_empty() {
            sections.push(("想法", ideas.join("\n\n")));
        }

        let mut results = Vec::new();
        for child in self.content.results_for_post(post.id).await? {
            results.push(
                self.enriched(ContentKind::Result, child.id, &child.content)
                    .await?,
            );
        }
        if !results.is_empty() {
            sections.push(("结果", results.join("\n\n")));
        }

        let mut comments = Vec::new();
        for child in self.content.comments_for_post(post.id).await? {
            comments.push(
                self.enriched(ContentKind::Comment, child.id, &child.content)
                    .await?,
            );
        }
        if !comments.is_empty() {
            sections.push(("评论", comments.join("\n\n")));
        }

        Ok(sections
            .into_iter()
            .map(|(label, text)| format!("【{}】\n{}", label, text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Update the summary of one post, choosing full regeneration or
    /// supplement based on overrides and the content hash.
    pub async fn smart_update(
        &self,
        post_id: i32,
        force_full: bool,
    ) -> Result<UpdateResult, SummarizerError> {
        let post = self
            .content
            .get_post(post_id)
            .await?
            .ok_or(SummarizerError::PostNotFound(post_id))?;

        let merged = self.merged_content(&post).await?;
        let hash = compute_hash(&merged);

        let existing = self.summaries.get_by_post(post_id).await?;
        let hash_before = existing.as_ref().and_then(|s| s.last_post_hash.clone());
        let has_edits = existing.as_ref().map(PostSummary::has_user_edits).unwrap_or(false);

        if force_full || !has_edits {
            if !force_full && hash_before.as_deref() == Some(hash.as_str()) {
                debug!(post_id, "content unchanged, summary skipped");
                return Ok(UpdateResult {
                    outcome: UpdateOutcome::Skip {
                        reason: "content unchanged".to_string(),
                    },
                    hash_before,
                    hash_after: hash,
                });
            }
            return self.full_update(&post, &merged, &hash, hash_before).await;
        }

        // Overrides present: never rewrite originals. Summarize only the
        // lines added since the last snapshot.
        let snapshot = existing
            .as_ref()
            .and_then(|s| s.last_post_content_snapshot.clone())
            .unwrap_or_default();
        let added = compute_diff(&snapshot, &merged);

        if added.trim().is_empty() {
            if hash_before.as_deref() != Some(hash.as_str()) {
                // Content changed by removal only; record the new baseline
                // so the diff is not recomputed every pass.
                self.summaries.refresh_snapshot(post_id, &hash, &merged).await?;
            }
            debug!(post_id, "no new content, supplement skipped");
            return Ok(UpdateResult {
                outcome: UpdateOutcome::Skip {
                    reason: "no new content".to_string(),
                },
                hash_before,
                hash_after: hash,
            });
        }

        self.supplement_update(&post, &added, &hash, &merged, hash_before)
            .await
    }

    async fn full_update(
        &self,
        post: &Post,
        merged: &str,
        hash: &str,
        hash_before: Option<String>,
    ) -> Result<UpdateResult, SummarizerError> {
        let (payload, degraded) = match self.model.generate_full(&post.title, merged).await {
            Ok(payload) => (payload, false),
            Err(e) => {
                warn!(post_id = post.id, error = %e, "full generation failed, storing degraded fallback");
                (degraded_payload(&post.title), true)
            }
        };

        self.summaries
            .upsert_full(post.id, &payload, &self.model.model_id(), degraded, hash, merged)
            .await?;

        info!(post_id = post.id, degraded, "summary regenerated");
        Ok(UpdateResult {
            outcome: UpdateOutcome::Full { degraded },
            hash_before,
            hash_after: hash.to_string(),
        })
    }

    async fn supplement_update(
        &self,
        post: &Post,
        added: &str,
        hash: &str,
        merged: &str,
        hash_before: Option<String>,
    ) -> Result<UpdateResult, SummarizerError> {
        let payload = self.model.generate_supplement(&post.title, added).await?;

        let factors = if payload.factors.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&payload.factors)
                    .map_err(|e| DieselError::SerializationError(Box::new(e)))?,
            )
        };
        let key_concepts = if payload.key_concepts.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&payload.key_concepts)
                    .map_err(|e| DieselError::SerializationError(Box::new(e)))?,
            )
        };
        let summary = if payload.summary.trim().is_empty() {
            None
        } else {
            Some(payload.summary.clone())
        };

        if factors.is_none() && key_concepts.is_none() && summary.is_none() {
            self.summaries.refresh_snapshot(post.id, hash, merged).await?;
            debug!(post_id = post.id, "supplement came back empty");
            return Ok(UpdateResult {
                outcome: UpdateOutcome::Skip {
                    reason: "supplement empty".to_string(),
                },
                hash_before,
                hash_after: hash.to_string(),
            });
        }

        self.summaries
            .apply_supplement(
                post.id,
                factors.as_deref(),
                key_concepts.as_deref(),
                summary.as_deref(),
                hash,
                merged,
            )
            .await?;

        info!(post_id = post.id, "supplement stored");
        Ok(UpdateResult {
            outcome: UpdateOutcome::Supplement,
            hash_before,
            hash_after: hash.to_string(),
        })
    }

    /// Force a full regeneration, optionally discarding user overrides
    /// first.
    pub async fn regenerate(
        &self,
        post_id: i32,
        clear_user_edits: bool,
    ) -> Result<UpdateResult, SummarizerError> {
        if clear_user_edits {
            self.summaries.clear_user_edits(post_id).await?;
        }
        self.smart_update(post_id, true).await
    }
}

/// Title-only fallback stored when the model is unavailable.
fn degraded_payload(title: &str) -> SummaryPayload {
    SummaryPayload {
        main_topic: title.to_string(),
        main_logic: format!("关于{}的研究", title),
        factors: Vec::new(),
        key_concepts: Vec::new(),
        summary: format!("帖子标题：{}", title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_hash_is_md5_hex() {
        assert_eq!(compute_hash(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(compute_hash("abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_hash_changes_with_content() {
        assert_ne!(compute_hash("a"), compute_hash("b"));
    }

    #[test]
    fn test_degraded_payload_from_title() {
        let payload = degraded_payload("动量因子研究");
        assert_eq!(payload.main_topic, "动量因子研究");
        assert_eq!(payload.main_logic, "关于动量因子研究的研究");
        assert_eq!(payload.summary, "帖子标题：动量因子研究");
        assert!(payload.factors.is_empty());
        assert!(payload.key_concepts.is_empty());
    }
}
