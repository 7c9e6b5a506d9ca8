//! Post summary records with user overrides and AI supplements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single factor extracted from a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Structured summary as produced by the model.
///
/// This is the deserialization target of the repair parser. List fields
/// are serialized to JSON text before storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    #[serde(default)]
    pub main_topic: String,
    #[serde(default)]
    pub main_logic: String,
    #[serde(default)]
    pub factors: Vec<Factor>,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub summary: String,
}

/// Summary fields a user may override.
///
/// List fields (`factors`, `key_concepts`) are stored as JSON text, the
/// same representation the AI-original columns use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    MainTopic,
    MainLogic,
    Factors,
    KeyConcepts,
    Summary,
}

impl SummaryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MainTopic => "main_topic",
            Self::MainLogic => "main_logic",
            Self::Factors => "factors",
            Self::KeyConcepts => "key_concepts",
            Self::Summary => "summary",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "main_topic" => Some(Self::MainTopic),
            "main_logic" => Some(Self::MainLogic),
            "factors" => Some(Self::Factors),
            "key_concepts" => Some(Self::KeyConcepts),
            "summary" => Some(Self::Summary),
            _ => None,
        }
    }

    /// Whether this field carries an AI supplement alongside overrides.
    /// Only the list/narrative fields do.
    pub fn has_supplement(&self) -> bool {
        matches!(self, Self::Factors | Self::KeyConcepts | Self::Summary)
    }

    pub const ALL: [SummaryField; 5] = [
        Self::MainTopic,
        Self::MainLogic,
        Self::Factors,
        Self::KeyConcepts,
        Self::Summary,
    ];
}

/// One summary row per post, created lazily on first generation.
///
/// AI-original fields are only ever written by full regeneration. User
/// overrides shadow them per field. AI supplements hold incremental
/// additions generated against the override baseline and are shown
/// alongside the effective value, never merged into it.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub id: i32,
    pub post_id: i32,

    pub main_topic: String,
    pub main_logic: String,
    /// JSON array of [`Factor`].
    pub factors: String,
    /// JSON array of strings.
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
    /// Set when the row is a degraded title-only fallback rather than a
    /// genuine model summary.
    pub is_degraded: bool,
    pub last_post_hash: Option<String>,
    pub last_post_content_snapshot: Option<String>,
    pub last_user_edit_at: Option<DateTime<Utc>>,
    pub generated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostSummary {
    /// Whether any field carries a user override.
    pub fn has_user_edits(&self) -> bool {
        self.user_main_topic.is_some()
            || self.user_main_logic.is_some()
            || self.user_factors.is_some()
            || self.user_key_concepts.is_some()
            || self.user_summary.is_some()
    }

    fn user_value(&self, field: SummaryField) -> Option<&str> {
        match field {
            SummaryField::MainTopic => self.user_main_topic.as_deref(),
            SummaryField::MainLogic => self.user_main_logic.as_deref(),
            SummaryField::Factors => self.user_factors.as_deref(),
            SummaryField::KeyConcepts => self.user_key_concepts.as_deref(),
            SummaryField::Summary => self.user_summary.as_deref(),
        }
    }

    fn ai_value(&self, field: SummaryField) -> &str {
        match field {
            SummaryField::MainTopic => &self.main_topic,
            SummaryField::MainLogic => &self.main_logic,
            SummaryField::Factors => &self.factors,
            SummaryField::KeyConcepts => &self.key_concepts,
            SummaryField::Summary => &self.summary,
        }
    }

    fn supplement_value(&self, field: SummaryField) -> Option<&str> {
        match field {
            SummaryField::Factors => self.ai_supplement_factors.as_deref(),
            SummaryField::KeyConcepts => self.ai_supplement_key_concepts.as_deref(),
            SummaryField::Summary => self.ai_supplement_summary.as_deref(),
            _ => None,
        }
    }

    /// Effective value of one field: user override if present, else the
    /// AI original.
    pub fn effective_field(&self, field: SummaryField) -> &str {
        self.user_value(field).unwrap_or_else(|| self.ai_value(field))
    }

    /// The view consumers should display.
    pub fn effective(&self) -> EffectiveSummary {
        EffectiveSummary {
            post_id: self.post_id,
            main_topic: self.effective_field(SummaryField::MainTopic).to_string(),
            main_logic: self.effective_field(SummaryField::MainLogic).to_string(),
            factors: self.effective_field(SummaryField::Factors).to_string(),
            key_concepts: self.effective_field(SummaryField::KeyConcepts).to_string(),
            summary: self.effective_field(SummaryField::Summary).to_string(),
            supplement_factors: self.supplement_value(SummaryField::Factors).map(String::from),
            supplement_key_concepts: self
                .supplement_value(SummaryField::KeyConcepts)
                .map(String::from),
            supplement_summary: self.supplement_value(SummaryField::Summary).map(String::from),
            is_degraded: self.is_degraded,
            ai_model: self.ai_model.clone(),
            generated_at: self.generated_at,
        }
    }
}

/// Display view of a summary: override-resolved fields plus any
/// supplement annotations shown alongside them.
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveSummary {
    pub post_id: i32,
    pub main_topic: String,
    pub main_logic: String,
    pub factors: String,
    pub key_concepts: String,
    pub summary: String,
    pub supplement_factors: Option<String>,
    pub supplement_key_concepts: Option<String>,
    pub supplement_summary: Option<String>,
    pub is_degraded: bool,
    pub ai_model: String,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> PostSummary {
        PostSummary {
            id: 1,
            post_id: 7,
            main_topic: "momentum factor".to_string(),
            main_logic: "close over ma20".to_string(),
            factors: r#"[{"name":"X","description":"close/ma20"}]"#.to_string(),
            key_concepts: r#"["ma20"]"#.to_string(),
            summary: "a momentum study".to_string(),
            user_main_topic: None,
            user_main_logic: None,
            user_factors: None,
            user_key_concepts: None,
            user_summary: None,
            ai_supplement_factors: None,
            ai_supplement_key_concepts: None,
            ai_supplement_summary: None,
            ai_model: "glm-4.7".to_string(),
            is_degraded: false,
            last_post_hash: None,
            last_post_content_snapshot: None,
            last_user_edit_at: None,
            generated_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_effective_prefers_override() {
        let mut s = summary();
        s.user_main_topic = Some("my topic".to_string());
        assert_eq!(s.effective_field(SummaryField::MainTopic), "my topic");
        assert_eq!(s.effective_field(SummaryField::MainLogic), "close over ma20");
    }

    #[test]
    fn test_effective_falls_back_to_ai() {
        let s = summary();
        assert_eq!(s.effective_field(SummaryField::Summary), "a momentum study");
    }

    #[test]
    fn test_has_user_edits() {
        let mut s = summary();
        assert!(!s.has_user_edits());
        s.user_summary = Some("edited".to_string());
        assert!(s.has_user_edits());
    }

    #[test]
    fn test_supplement_shown_alongside_not_merged() {
        let mut s = summary();
        s.user_summary = Some("edited".to_string());
        s.ai_supplement_summary = Some("new paragraph covers ma60".to_string());
        let eff = s.effective();
        assert_eq!(eff.summary, "edited");
        assert_eq!(
            eff.supplement_summary.as_deref(),
            Some("new paragraph covers ma60")
        );
    }

    #[test]
    fn test_supplement_only_on_list_fields() {
        assert!(!SummaryField::MainTopic.has_supplement());
        assert!(!SummaryField::MainLogic.has_supplement());
        assert!(SummaryField::Factors.has_supplement());
        assert!(SummaryField::KeyConcepts.has_supplement());
        assert!(SummaryField::Summary.has_supplement());
    }

    #[test]
    fn test_field_roundtrip() {
        for field in SummaryField::ALL {
            assert_eq!(SummaryField::from_str(field.as_str()), Some(field));
        }
        assert_eq!(SummaryField::from_str("title"), None);
    }
}
