#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use danci_study_session::clients::{
    AudioResolution, AudioService, CardGradedEvent, CardProgress, Collaborators, DueCard, GradeResponse,
    ImageService, PreloadJob, ProgressService, ResetResponse, SchedulingService, ServiceError, ServiceKind,
    ServiceResult, SessionRecorded, SessionSummary,
};
use danci_study_session::config::SessionConfig;
use danci_study_session::{CardId, VocabularyEntry, VocabularyIndex};

async fn health_result(unhealthy: &AtomicBool, delay: Duration, kind: ServiceKind) -> ServiceResult<()> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if unhealthy.load(Ordering::SeqCst) {
        Err(ServiceError::Unavailable(kind))
    } else {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeScheduling {
    pub unhealthy: AtomicBool,
    pub due: Mutex<Vec<DueCard>>,
    pub fail_due: AtomicBool,
    pub fail_next_grades: AtomicUsize,
    pub grade_delay: Mutex<Duration>,
    pub grade_calls: Mutex<Vec<(CardId, bool)>>,
    pub reset_calls: Mutex<Vec<CardId>>,
    pub reset_delay: Mutex<Duration>,
    pub progress: Mutex<CardProgress>,
    pub health_calls: AtomicUsize,
}

impl FakeScheduling {
    pub fn grade_call_count(&self) -> usize {
        self.grade_calls.lock().len()
    }
}

#[async_trait]
impl SchedulingService for FakeScheduling {
    async fn health(&self) -> ServiceResult<()> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        health_result(&self.unhealthy, Duration::ZERO, ServiceKind::Scheduling).await
    }

    async fn due_items(&self) -> ServiceResult<Vec<DueCard>> {
        if self.fail_due.load(Ordering::SeqCst) {
            return Err(ServiceError::Rejected("due list exploded".to_string()));
        }
        Ok(self.due.lock().clone())
    }

    async fn grade(&self, card_id: &CardId, is_correct: bool) -> ServiceResult<GradeResponse> {
        let delay = *self.grade_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.grade_calls.lock().push((card_id.clone(), is_correct));

        let should_fail = self
            .fail_next_grades
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(ServiceError::Unavailable(ServiceKind::Scheduling));
        }

        Ok(GradeResponse {
            card_id: card_id.clone(),
            progress: CardProgress {
                total_reviews: 1,
                correct_reviews: u32::from(is_correct),
                streak: u32::from(is_correct),
                next_review_date: None,
            },
        })
    }

    async fn progress(&self, _card_id: &CardId) -> ServiceResult<CardProgress> {
        Ok(self.progress.lock().clone())
    }

    async fn reset(&self, card_id: &CardId) -> ServiceResult<ResetResponse> {
        let delay = *self.reset_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.reset_calls.lock().push(card_id.clone());
        Ok(ResetResponse { progress: CardProgress::default() })
    }
}

#[derive(Default)]
pub struct FakeAudio {
    pub unhealthy: AtomicBool,
    pub health_delay: Mutex<Duration>,
    pub failing_texts: Mutex<HashSet<String>>,
    pub delay: Mutex<Duration>,
    pub resolved: Mutex<Vec<String>>,
    pub preloads: Mutex<Vec<Vec<String>>>,
}

#[async_trait]
impl AudioService for FakeAudio {
    async fn health(&self) -> ServiceResult<()> {
        let delay = *self.health_delay.lock();
        health_result(&self.unhealthy, delay, ServiceKind::Audio).await
    }

    async fn resolve_audio(&self, text: &str, lang: &str) -> ServiceResult<AudioResolution> {
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.resolved.lock().push(text.to_string());
        if self.failing_texts.lock().contains(text) {
            return Err(ServiceError::Rejected(format!("no audio for {text}")));
        }
        Ok(AudioResolution {
            url: format!("https://audio.test/{lang}/{}", urlencoding::encode(text)),
            cached: false,
        })
    }

    async fn preload(&self, texts: &[String], _lang: &str) -> ServiceResult<PreloadJob> {
        self.preloads.lock().push(texts.to_vec());
        Ok(PreloadJob { job_id: "job-1".to_string() })
    }
}

#[derive(Default)]
pub struct FakeImage {
    pub unhealthy: AtomicBool,
    pub fail_all: AtomicBool,
    pub fetched: Mutex<Vec<String>>,
}

#[async_trait]
impl ImageService for FakeImage {
    async fn health(&self) -> ServiceResult<()> {
        health_result(&self.unhealthy, Duration::ZERO, ServiceKind::Image).await
    }

    async fn fetch_image(&self, search_term: &str) -> ServiceResult<Bytes> {
        self.fetched.lock().push(search_term.to_string());
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(ServiceKind::Image));
        }
        Ok(Bytes::from(format!("png:{search_term}")))
    }
}

#[derive(Default)]
pub struct FakeProgress {
    pub unhealthy: AtomicBool,
    pub health_delay: Mutex<Duration>,
    pub fail_sessions: AtomicBool,
    pub sessions: Mutex<Vec<SessionSummary>>,
    pub events: Mutex<Vec<CardGradedEvent>>,
}

#[async_trait]
impl ProgressService for FakeProgress {
    async fn health(&self) -> ServiceResult<()> {
        let delay = *self.health_delay.lock();
        health_result(&self.unhealthy, delay, ServiceKind::Progress).await
    }

    async fn record_session(&self, summary: &SessionSummary) -> ServiceResult<SessionRecorded> {
        self.sessions.lock().push(summary.clone());
        if self.fail_sessions.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(ServiceKind::Progress));
        }
        Ok(SessionRecorded { session_id: "recorded-1".to_string() })
    }

    async fn record_card_graded(&self, event: &CardGradedEvent) -> ServiceResult<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct Fakes {
    pub scheduling: Arc<FakeScheduling>,
    pub audio: Arc<FakeAudio>,
    pub image: Arc<FakeImage>,
    pub progress: Arc<FakeProgress>,
}

impl Fakes {
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            scheduling: self.scheduling.clone(),
            audio: self.audio.clone(),
            image: self.image.clone(),
            progress: self.progress.clone(),
        }
    }
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        log_level: "debug".to_string(),
        ..SessionConfig::default()
    }
}

/// `count` distinct level-`level` entries using consecutive CJK code points.
pub fn entries(level: u8, count: usize) -> Vec<VocabularyEntry> {
    let base = 0x4E00 + u32::from(level) * 0x200;
    (0..count as u32)
        .filter_map(|i| char::from_u32(base + i))
        .enumerate()
        .map(|(i, ch)| VocabularyEntry {
            simplified: ch.to_string(),
            traditional: ch.to_string(),
            pinyin: format!("py{i}"),
            english: vec![format!("meaning {i}")],
            level,
        })
        .collect()
}

pub fn vocabulary(level: u8, count: usize) -> Arc<VocabularyIndex> {
    Arc::new(VocabularyIndex::from_entries(entries(level, count)))
}

pub fn due_card(card_id: CardId) -> DueCard {
    DueCard {
        card_id,
        streak: 2,
        total_reviews: 3,
        correct_reviews: 2,
        next_review_date: None,
        overdue_days: 1,
    }
}

/// Polls `cond` until it holds, yielding to spawned tasks between checks.
pub async fn wait_until<F: Fn() -> bool>(cond: F) -> bool {
    for _ in 0..200 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
