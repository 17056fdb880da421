use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clients::http::with_timeout;
use crate::clients::{
    CardGradedEvent, CardProgress, ProgressService, SchedulingService, ServiceError, ServiceKind,
};
use crate::identity::CardId;
use crate::services::grade_ledger::{Admission, GradeChange, GradeLedger};
use crate::types::{CapabilityFlags, GradeOutcome, SessionStatistics, StudyItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Acknowledged by the Scheduling Service.
    Synced,
    /// Scheduling is unavailable this session; kept locally.
    LocalOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeStatus {
    Recorded { change: GradeChange, sync: SyncState },
    Unchanged,
    InFlight,
}

#[derive(Debug, Error)]
pub enum GradeError {
    #[error("card {0} is not part of this session")]
    UnknownCard(CardId),
    #[error("a grade for card {0} is still being saved")]
    Busy(CardId),
    #[error("scheduling service unavailable")]
    SchedulingUnavailable,
    #[error("grade for {card_id} kept locally, remote save failed: {source}")]
    Transient {
        card_id: CardId,
        #[source]
        source: ServiceError,
    },
}

impl GradeError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Busy(_) | Self::SchedulingUnavailable)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardHistory {
    pub progress: CardProgress,
    pub prior_outcome: Option<bool>,
}

/// Releases a card's in-flight mark when the grading future finishes or
/// is dropped mid-request; a dropped request counts as undelivered.
struct InFlightGuard<'a> {
    ledger: &'a Mutex<GradeLedger>,
    card_id: &'a CardId,
    is_correct: bool,
    done: bool,
}

impl<'a> InFlightGuard<'a> {
    fn new(ledger: &'a Mutex<GradeLedger>, card_id: &'a CardId, is_correct: bool) -> Self {
        Self { ledger, card_id, is_correct, done: false }
    }

    fn finish(mut self, delivered: bool) {
        self.ledger.lock().complete(self.card_id, self.is_correct, delivered);
        self.done = true;
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.ledger.lock().complete(self.card_id, self.is_correct, false);
        }
    }
}

/// Holds a card in flight for the duration of a reset so no grade can be
/// admitted and then withdrawn by the reset's completion.
struct Reservation<'a> {
    ledger: &'a Mutex<GradeLedger>,
    card_id: &'a CardId,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.ledger.lock().release(self.card_id);
    }
}

pub struct GradingCoordinator {
    ledger: Mutex<GradeLedger>,
    scheduling: Arc<dyn SchedulingService>,
    progress: Arc<dyn ProgressService>,
    flags: CapabilityFlags,
    timeout: Duration,
    session_id: String,
}

impl GradingCoordinator {
    pub fn new(
        items: &[StudyItem],
        scheduling: Arc<dyn SchedulingService>,
        progress: Arc<dyn ProgressService>,
        flags: CapabilityFlags,
        timeout: Duration,
        session_id: String,
    ) -> Self {
        Self {
            ledger: Mutex::new(GradeLedger::new(items)),
            scheduling,
            progress,
            flags,
            timeout,
            session_id,
        }
    }

    pub fn set_capabilities(&mut self, flags: CapabilityFlags) {
        self.flags = flags;
    }

    pub async fn grade(&self, card_id: &CardId, is_correct: bool) -> Result<GradeStatus, GradeError> {
        let admission = self
            .ledger
            .lock()
            .begin(card_id, is_correct, Utc::now())
            .ok_or_else(|| GradeError::UnknownCard(card_id.clone()))?;

        let change = match admission {
            Admission::InFlight => {
                debug!(card_id = %card_id, "grade already in flight, ignored");
                return Ok(GradeStatus::InFlight);
            }
            Admission::Unchanged => return Ok(GradeStatus::Unchanged),
            Admission::Submit(change) => change,
        };

        let guard = InFlightGuard::new(&self.ledger, card_id, is_correct);

        if !self.flags.scheduling_available {
            guard.finish(false);
            if change == GradeChange::Resubmitted {
                return Ok(GradeStatus::Unchanged);
            }
            return Ok(GradeStatus::Recorded { change, sync: SyncState::LocalOnly });
        }

        let result = with_timeout(
            ServiceKind::Scheduling,
            self.timeout,
            self.scheduling.grade(card_id, is_correct),
        )
        .await;

        match result {
            Ok(response) => {
                guard.finish(true);
                debug!(card_id = %card_id, is_correct, ?change, "grade saved");
                self.forward_to_progress(card_id, is_correct, response.progress);
                Ok(GradeStatus::Recorded { change, sync: SyncState::Synced })
            }
            Err(err) => {
                guard.finish(false);
                warn!(card_id = %card_id, is_correct, error = %err, "grade write failed, kept locally");
                Err(GradeError::Transient { card_id: card_id.clone(), source: err })
            }
        }
    }

    fn forward_to_progress(&self, card_id: &CardId, is_correct: bool, progress: CardProgress) {
        if !self.flags.progress_available {
            return;
        }

        let timestamp = self
            .ledger
            .lock()
            .outcome(card_id)
            .map(|o| o.timestamp)
            .unwrap_or_else(Utc::now);

        let event = CardGradedEvent {
            card_id: card_id.clone(),
            is_correct,
            timestamp,
            session_id: self.session_id.clone(),
            streak: progress.streak,
            total_reviews: progress.total_reviews,
            correct_reviews: progress.correct_reviews,
            next_review_date: progress.next_review_date,
        };

        let service = Arc::clone(&self.progress);
        let timeout = self.timeout;
        tokio::spawn(async move {
            let result = with_timeout(ServiceKind::Progress, timeout, service.record_card_graded(&event)).await;
            if let Err(err) = result {
                warn!(card_id = %event.card_id, error = %err, "card graded event not recorded");
            }
        });
    }

    /// Re-sends every recorded outcome that has not been delivered yet.
    /// Returns how many were acknowledged.
    pub async fn retry_pending(&self) -> usize {
        if !self.flags.scheduling_available {
            return 0;
        }

        let pending = self.ledger.lock().unsent();
        let mut delivered = 0;
        for outcome in pending {
            match self.grade(&outcome.card_id, outcome.is_correct).await {
                Ok(GradeStatus::Recorded { sync: SyncState::Synced, .. }) => delivered += 1,
                Ok(_) => {}
                Err(err) => debug!(card_id = %outcome.card_id, error = %err, "retry failed"),
            }
        }
        if delivered > 0 {
            info!(delivered, "pending grades delivered");
        }
        delivered
    }

    pub async fn card_history(&self, card_id: &CardId) -> Option<CardHistory> {
        if !self.flags.scheduling_available {
            return None;
        }
        match with_timeout(ServiceKind::Scheduling, self.timeout, self.scheduling.progress(card_id)).await {
            Ok(progress) => Some(CardHistory {
                prior_outcome: progress.prior_outcome(),
                progress,
            }),
            Err(err) => {
                debug!(card_id = %card_id, error = %err, "card progress lookup failed");
                None
            }
        }
    }

    /// Resets the card's scheduling state and withdraws its local outcome.
    pub async fn reset_card(&self, card_id: &CardId) -> Result<CardProgress, GradeError> {
        if !self.ledger.lock().contains_card(card_id) {
            return Err(GradeError::UnknownCard(card_id.clone()));
        }
        if !self.flags.scheduling_available {
            return Err(GradeError::SchedulingUnavailable);
        }
        let reserved = self.ledger.lock().reserve(card_id);
        match reserved {
            Some(true) => {}
            Some(false) => return Err(GradeError::Busy(card_id.clone())),
            None => return Err(GradeError::UnknownCard(card_id.clone())),
        }
        let _reservation = Reservation { ledger: &self.ledger, card_id };

        let response = with_timeout(ServiceKind::Scheduling, self.timeout, self.scheduling.reset(card_id))
            .await
            .map_err(|source| GradeError::Transient { card_id: card_id.clone(), source })?;

        if self.ledger.lock().withdraw(card_id).is_some() {
            info!(card_id = %card_id, "card reset, local outcome withdrawn");
        }
        Ok(response.progress)
    }

    pub fn statistics(&self) -> SessionStatistics {
        self.ledger.lock().statistics()
    }

    pub fn outcomes(&self) -> Vec<GradeOutcome> {
        self.ledger.lock().outcomes()
    }

    pub fn outcome(&self, card_id: &CardId) -> Option<GradeOutcome> {
        self.ledger.lock().outcome(card_id).cloned()
    }

    pub fn pending_count(&self) -> usize {
        self.ledger.lock().unsent().len()
    }
}
