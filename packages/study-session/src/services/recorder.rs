use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::clients::http::with_timeout;
use crate::clients::{CardResult, ProgressService, ServiceKind, SessionSummary};
use crate::types::{CapabilityFlags, GradeOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded { session_id: String },
    SkippedNoCards,
    SkippedUnavailable,
    Failed,
}

pub struct SessionRecorder {
    progress: Arc<dyn ProgressService>,
    timeout: Duration,
}

impl SessionRecorder {
    pub fn new(progress: Arc<dyn ProgressService>, timeout: Duration) -> Self {
        Self { progress, timeout }
    }

    pub async fn record(
        &self,
        flags: &CapabilityFlags,
        deck_id: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        outcomes: &[GradeOutcome],
    ) -> RecordOutcome {
        if outcomes.is_empty() {
            return RecordOutcome::SkippedNoCards;
        }
        if !flags.progress_available {
            info!(graded = outcomes.len(), "progress service unavailable, session summary not recorded");
            return RecordOutcome::SkippedUnavailable;
        }

        let summary = build_summary(deck_id, started_at, ended_at, outcomes);
        match with_timeout(ServiceKind::Progress, self.timeout, self.progress.record_session(&summary)).await {
            Ok(recorded) => {
                info!(
                    session_id = %recorded.session_id,
                    cards = summary.cards_studied,
                    duration_secs = summary.session_duration,
                    "session recorded"
                );
                RecordOutcome::Recorded { session_id: recorded.session_id }
            }
            Err(err) => {
                warn!(error = %err, cards = summary.cards_studied, "session summary not recorded");
                RecordOutcome::Failed
            }
        }
    }
}

pub fn build_summary(
    deck_id: &str,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    outcomes: &[GradeOutcome],
) -> SessionSummary {
    let correct_answers = outcomes.iter().filter(|o| o.is_correct).count();
    let session_duration = (ended_at - started_at).num_seconds().max(0) as u64;

    SessionSummary {
        deck_id: deck_id.to_string(),
        cards_studied: outcomes.len(),
        correct_answers,
        incorrect_answers: outcomes.len() - correct_answers,
        session_duration,
        card_results: outcomes
            .iter()
            .map(|o| CardResult {
                card_id: o.card_id.clone(),
                is_correct: o.is_correct,
                timestamp: o.timestamp,
            })
            .collect(),
    }
}
