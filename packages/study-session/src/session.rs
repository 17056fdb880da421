use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, info_span, Instrument, Span};
use uuid::Uuid;

use crate::cache::{MediaCache, MediaContent, MediaKey};
use crate::clients::{CardProgress, Collaborators};
use crate::config::SessionConfig;
use crate::identity::CardId;
use crate::services::composer::{QueueSource, SessionComposer};
use crate::services::grading::{CardHistory, GradeError, GradeStatus, GradingCoordinator};
use crate::services::health::{HealthMonitor, ProbeResult};
use crate::services::prefetch::{PrefetchScheduler, PrefetchToggle};
use crate::services::recorder::{RecordOutcome, SessionRecorder};
use crate::services::search_terms::{audio_search_term, image_search_term};
use crate::types::{CapabilityFlags, Direction, SessionPreferences, SessionStatistics, StudyItem};
use crate::vocabulary::VocabularyIndex;

/// Result of asking for a new session.
#[allow(clippy::large_enum_variant)]
pub enum SessionStart {
    Ready(Session),
    /// The requested level has no vocabulary.
    NoCards,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemMedia {
    pub audio: Option<MediaContent>,
    pub image: Option<MediaContent>,
}

/// Long-lived entry point. Owns the collaborators, the process-wide media
/// cache and the prefetch toggle; hands out one [`Session`] per study run.
pub struct StudySessionManager {
    collaborators: Collaborators,
    config: SessionConfig,
    vocabulary: Arc<VocabularyIndex>,
    cache: Arc<MediaCache>,
    monitor: HealthMonitor,
    toggle: PrefetchToggle,
}

impl StudySessionManager {
    pub fn new(config: SessionConfig, collaborators: Collaborators, vocabulary: Arc<VocabularyIndex>) -> Self {
        let cache = Arc::new(MediaCache::new(config.media_cache.clone()));
        Self::with_cache(config, collaborators, vocabulary, cache)
    }

    pub fn with_cache(
        config: SessionConfig,
        collaborators: Collaborators,
        vocabulary: Arc<VocabularyIndex>,
        cache: Arc<MediaCache>,
    ) -> Self {
        let monitor = HealthMonitor::new(collaborators.clone(), config.timeouts.health);
        let toggle = PrefetchToggle::new(config.prefetch.enabled);
        Self {
            collaborators,
            config,
            vocabulary,
            cache,
            monitor,
            toggle,
        }
    }

    pub fn cache(&self) -> &Arc<MediaCache> {
        &self.cache
    }

    pub fn prefetch_toggle(&self) -> &PrefetchToggle {
        &self.toggle
    }

    pub async fn start_session(&self, prefs: SessionPreferences) -> SessionStart {
        let session_id = Uuid::new_v4().to_string();
        let span = info_span!("study_session", session_id = %session_id, level = prefs.level);

        async {
            let report = self.monitor.check().await;
            for result in &report.probes {
                info!(
                    service = %result.service,
                    healthy = result.healthy,
                    latency_ms = ?result.latency_ms,
                    error = ?result.error,
                    "service health"
                );
            }
            let flags = report.flags;
            if let Some(enabled) = prefs.prefetch_enabled {
                self.toggle.set_enabled(enabled);
            }

            let composer = SessionComposer::new(Arc::clone(&self.collaborators.scheduling), self.config.timeouts.request);
            let composed = composer.compose(&self.vocabulary, &prefs, &flags).await;
            if composed.items.is_empty() {
                info!("no cards available, session not started");
                return None;
            }

            let queue = composed.items;
            let coordinator = GradingCoordinator::new(
                &queue,
                Arc::clone(&self.collaborators.scheduling),
                Arc::clone(&self.collaborators.progress),
                flags,
                self.config.timeouts.request,
                session_id.clone(),
            );
            let prefetch = PrefetchScheduler::new(
                Arc::clone(&self.cache),
                Arc::clone(&self.collaborators.audio),
                Arc::clone(&self.collaborators.image),
                flags,
                prefs.character_set,
                self.config.prefetch.window,
                self.config.timeouts.media,
                self.toggle.clone(),
            );
            prefetch.schedule(&queue, 0);
            prefetch.preload_audio(&queue);

            info!(cards = queue.len(), source = ?composed.source, ?flags, "session started");

            Some(Session {
                id: session_id.clone(),
                prefs: prefs.clone(),
                queue,
                source: composed.source,
                position: 0,
                flags,
                probes: report.probes,
                started_at: Utc::now(),
                coordinator,
                prefetch,
                recorder: SessionRecorder::new(Arc::clone(&self.collaborators.progress), self.config.timeouts.request),
                monitor: self.monitor.clone(),
                span: Span::current(),
            })
        }
        .instrument(span)
        .await
        .map_or(SessionStart::NoCards, SessionStart::Ready)
    }
}

pub struct Session {
    id: String,
    prefs: SessionPreferences,
    queue: Vec<StudyItem>,
    source: QueueSource,
    position: usize,
    flags: CapabilityFlags,
    probes: Vec<ProbeResult>,
    started_at: DateTime<Utc>,
    coordinator: GradingCoordinator,
    prefetch: PrefetchScheduler,
    recorder: SessionRecorder,
    monitor: HealthMonitor,
    span: Span,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn preferences(&self) -> &SessionPreferences {
        &self.prefs
    }

    pub fn queue(&self) -> &[StudyItem] {
        &self.queue
    }

    pub fn source(&self) -> QueueSource {
        self.source
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current(&self) -> Option<&StudyItem> {
        self.queue.get(self.position)
    }

    pub fn capabilities(&self) -> CapabilityFlags {
        self.flags
    }

    /// Per-service results of the most recent health check.
    pub fn health_probes(&self) -> &[ProbeResult] {
        &self.probes
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn prefetch_toggle(&self) -> &PrefetchToggle {
        self.prefetch.toggle()
    }

    /// Moves the cursor (clamped to the queue) and kicks off prefetch for
    /// the new window without waiting on it.
    pub fn navigate(&mut self, direction: Direction) -> Option<&StudyItem> {
        let last = self.queue.len().checked_sub(1)?;
        let target = match direction {
            Direction::Next => (self.position + 1).min(last),
            Direction::Previous => self.position.saturating_sub(1),
            Direction::First => 0,
            Direction::Jump(index) => index.min(last),
        };

        if target != self.position {
            self.position = target;
            let _enter = self.span.enter();
            self.prefetch.schedule(&self.queue, target);
        }
        self.queue.get(target)
    }

    pub async fn grade(&self, card_id: &CardId, is_correct: bool) -> Result<GradeStatus, GradeError> {
        self.coordinator
            .grade(card_id, is_correct)
            .instrument(self.span.clone())
            .await
    }

    /// Grades the item under the cursor. `None` on an empty queue.
    pub async fn grade_current(&self, is_correct: bool) -> Option<Result<GradeStatus, GradeError>> {
        let card_id = self.current()?.card_id.clone();
        Some(self.grade(&card_id, is_correct).await)
    }

    pub async fn retry_pending(&self) -> usize {
        self.coordinator.retry_pending().instrument(self.span.clone()).await
    }

    pub fn pending_grades(&self) -> usize {
        self.coordinator.pending_count()
    }

    pub async fn card_history(&self, card_id: &CardId) -> Option<CardHistory> {
        self.coordinator.card_history(card_id).instrument(self.span.clone()).await
    }

    pub async fn reset_card(&self, card_id: &CardId) -> Result<CardProgress, GradeError> {
        self.coordinator.reset_card(card_id).instrument(self.span.clone()).await
    }

    /// Re-checks the collaborators and applies the new flags to grading and
    /// prefetch. Outcomes already recorded are kept.
    pub async fn recheck_health(&mut self) -> CapabilityFlags {
        let report = self.monitor.check().instrument(self.span.clone()).await;
        let flags = report.flags;
        self.probes = report.probes;
        if flags != self.flags {
            info!(parent: &self.span, ?flags, previous = ?self.flags, "capabilities changed");
        }
        self.flags = flags;
        self.coordinator.set_capabilities(flags);
        self.prefetch.set_capabilities(flags);
        flags
    }

    pub fn statistics(&self) -> SessionStatistics {
        self.coordinator.statistics()
    }

    /// Cached media for an item. Never touches the network.
    pub fn media(&self, item: &StudyItem) -> ItemMedia {
        let cache = self.prefetch.cache();
        let (text, lang) = audio_search_term(item, self.prefs.character_set);
        ItemMedia {
            audio: cache.get(&MediaKey::audio(&text, lang)),
            image: cache.get(&MediaKey::image(&image_search_term(item))),
        }
    }

    pub async fn end_session(self) -> SessionStatistics {
        self.finish().await.0
    }

    /// Ends the session and reports what happened to the summary.
    pub async fn finish(self) -> (SessionStatistics, RecordOutcome) {
        let statistics = self.coordinator.statistics();
        let outcomes = self.coordinator.outcomes();
        let record = self
            .recorder
            .record(&self.flags, &self.prefs.deck_id(), self.started_at, Utc::now(), &outcomes)
            .instrument(self.span.clone())
            .await;

        info!(
            parent: &self.span,
            reviewed = statistics.cards_reviewed,
            correct = statistics.correct_count,
            incorrect = statistics.incorrect_count,
            ?record,
            "session ended"
        );
        (statistics, record)
    }
}
