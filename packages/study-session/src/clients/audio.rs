use std::time::Duration;

use async_trait::async_trait;

use super::http::ServiceHttp;
use super::{AudioRequest, AudioResolution, AudioService, PreloadJob, PreloadRequest, ServiceKind, ServiceResult};

#[derive(Clone)]
pub struct HttpAudioService {
    http: ServiceHttp,
}

impl HttpAudioService {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ServiceHttp::new(ServiceKind::Audio, base_url, timeout),
        }
    }
}

#[async_trait]
impl AudioService for HttpAudioService {
    async fn health(&self) -> ServiceResult<()> {
        self.http.probe().await
    }

    async fn resolve_audio(&self, text: &str, lang: &str) -> ServiceResult<AudioResolution> {
        let request = self.http.post("api/audio/resolve")?.json(&AudioRequest { text, lang });
        self.http.send_json(request).await
    }

    async fn preload(&self, texts: &[String], lang: &str) -> ServiceResult<PreloadJob> {
        let request = self.http.post("api/audio/preload")?.json(&PreloadRequest { texts, lang });
        self.http.send_json(request).await
    }
}
