use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::CardId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    pub card_id: CardId,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub correct_reviews: u32,
    #[serde(default)]
    pub next_review_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overdue_days: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardProgress {
    #[serde(default)]
    pub total_reviews: u32,
    #[serde(default)]
    pub correct_reviews: u32,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub next_review_date: Option<DateTime<Utc>>,
}

impl CardProgress {
    /// Reconstructs a pass/fail verdict from aggregate counts. Lossy: the
    /// per-attempt history is not available, so a majority of correct
    /// reviews reads as "previously correct".
    pub fn prior_outcome(&self) -> Option<bool> {
        if self.total_reviews == 0 {
            return None;
        }
        Some(self.correct_reviews as f64 > self.total_reviews as f64 / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub card_id: CardId,
    #[serde(default)]
    pub progress: CardProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    #[serde(default)]
    pub progress: CardProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest<'a> {
    pub text: &'a str,
    pub lang: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioResolution {
    pub url: String,
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadRequest<'a> {
    pub texts: &'a [String],
    pub lang: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreloadJob {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardResult {
    pub card_id: CardId,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub deck_id: String,
    pub cards_studied: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    /// Whole seconds.
    pub session_duration: u64,
    pub card_results: Vec<CardResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecorded {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardGradedEvent {
    pub card_id: CardId,
    pub is_correct: bool,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub streak: u32,
    pub total_reviews: u32,
    pub correct_reviews: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<DateTime<Utc>>,
}
