use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::clients::http::with_timeout;
use crate::clients::{Collaborators, ServiceKind, ServiceResult};
use crate::types::CapabilityFlags;

#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub service: ServiceKind,
    pub healthy: bool,
    pub latency_ms: Option<u64>,
    pub error: Option<String>,
}

impl ProbeResult {
    fn healthy(service: ServiceKind, latency: Duration) -> Self {
        Self {
            service,
            healthy: true,
            latency_ms: Some(latency.as_millis() as u64),
            error: None,
        }
    }

    fn unhealthy(service: ServiceKind, error: String) -> Self {
        Self {
            service,
            healthy: false,
            latency_ms: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub flags: CapabilityFlags,
    pub probes: Vec<ProbeResult>,
}

/// Probes all four collaborators concurrently. Each probe is bounded by its
/// own timeout, so a slow service never delays the verdict on the others.
#[derive(Clone)]
pub struct HealthMonitor {
    collaborators: Collaborators,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(collaborators: Collaborators, timeout: Duration) -> Self {
        Self { collaborators, timeout }
    }

    pub async fn check(&self) -> HealthReport {
        let c = &self.collaborators;
        let (scheduling, audio, image, progress) = tokio::join!(
            self.probe(ServiceKind::Scheduling, c.scheduling.health()),
            self.probe(ServiceKind::Audio, c.audio.health()),
            self.probe(ServiceKind::Image, c.image.health()),
            self.probe(ServiceKind::Progress, c.progress.health()),
        );

        let flags = CapabilityFlags {
            scheduling_available: scheduling.healthy,
            audio_available: audio.healthy,
            image_available: image.healthy,
            progress_available: progress.healthy,
        };

        debug!(?flags, "service health checked");

        HealthReport {
            flags,
            probes: vec![scheduling, audio, image, progress],
        }
    }

    async fn probe<F>(&self, service: ServiceKind, fut: F) -> ProbeResult
    where
        F: Future<Output = ServiceResult<()>>,
    {
        let started = Instant::now();
        match with_timeout(service, self.timeout, fut).await {
            Ok(()) => ProbeResult::healthy(service, started.elapsed()),
            Err(err) => {
                warn!(%service, error = %err, "service unavailable");
                ProbeResult::unhealthy(service, err.to_string())
            }
        }
    }
}
