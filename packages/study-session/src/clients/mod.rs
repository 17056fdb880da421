pub mod audio;
pub mod http;
pub mod image;
pub mod models;
pub mod progress;
pub mod scheduling;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::identity::CardId;

pub use audio::HttpAudioService;
pub use image::HttpImageService;
pub use models::*;
pub use progress::HttpProgressService;
pub use scheduling::HttpSchedulingService;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Scheduling,
    Audio,
    Image,
    Progress,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduling => "scheduling",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Progress => "progress",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} service not configured")]
    NotConfigured(ServiceKind),
    #[error("{0} service unavailable")]
    Unavailable(ServiceKind),
    #[error("{service} call timed out")]
    Timeout { service: ServiceKind },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Rejected(String),
}

impl ServiceError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Request(e) => e.is_timeout(),
            _ => false,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[async_trait]
pub trait SchedulingService: Send + Sync {
    async fn health(&self) -> ServiceResult<()>;
    async fn due_items(&self) -> ServiceResult<Vec<DueCard>>;
    async fn grade(&self, card_id: &CardId, is_correct: bool) -> ServiceResult<GradeResponse>;
    async fn progress(&self, card_id: &CardId) -> ServiceResult<CardProgress>;
    async fn reset(&self, card_id: &CardId) -> ServiceResult<ResetResponse>;
}

#[async_trait]
pub trait AudioService: Send + Sync {
    async fn health(&self) -> ServiceResult<()>;
    async fn resolve_audio(&self, text: &str, lang: &str) -> ServiceResult<AudioResolution>;
    async fn preload(&self, texts: &[String], lang: &str) -> ServiceResult<PreloadJob>;
}

#[async_trait]
pub trait ImageService: Send + Sync {
    async fn health(&self) -> ServiceResult<()>;
    async fn fetch_image(&self, search_term: &str) -> ServiceResult<Bytes>;
}

#[async_trait]
pub trait ProgressService: Send + Sync {
    async fn health(&self) -> ServiceResult<()>;
    async fn record_session(&self, summary: &SessionSummary) -> ServiceResult<SessionRecorded>;
    async fn record_card_graded(&self, event: &CardGradedEvent) -> ServiceResult<()>;
}

/// The four collaborators a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub scheduling: Arc<dyn SchedulingService>,
    pub audio: Arc<dyn AudioService>,
    pub image: Arc<dyn ImageService>,
    pub progress: Arc<dyn ProgressService>,
}

impl Collaborators {
    pub fn from_config(config: &crate::config::SessionConfig) -> Self {
        let endpoints = &config.endpoints;
        let timeouts = &config.timeouts;
        Self {
            scheduling: Arc::new(HttpSchedulingService::new(endpoints.scheduling.clone(), timeouts.request)),
            audio: Arc::new(HttpAudioService::new(endpoints.audio.clone(), timeouts.request)),
            image: Arc::new(HttpImageService::new(endpoints.image.clone(), timeouts.media)),
            progress: Arc::new(HttpProgressService::new(endpoints.progress.clone(), timeouts.request)),
        }
    }
}
