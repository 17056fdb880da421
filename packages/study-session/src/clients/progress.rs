use std::time::Duration;

use async_trait::async_trait;

use super::http::{ensure_success, ServiceHttp};
use super::{CardGradedEvent, ProgressService, ServiceKind, ServiceResult, SessionRecorded, SessionSummary};

#[derive(Clone)]
pub struct HttpProgressService {
    http: ServiceHttp,
}

impl HttpProgressService {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ServiceHttp::new(ServiceKind::Progress, base_url, timeout),
        }
    }
}

#[async_trait]
impl ProgressService for HttpProgressService {
    async fn health(&self) -> ServiceResult<()> {
        self.http.probe().await
    }

    async fn record_session(&self, summary: &SessionSummary) -> ServiceResult<SessionRecorded> {
        let request = self.http.post("api/sessions")?.json(summary);
        self.http.send_json(request).await
    }

    async fn record_card_graded(&self, event: &CardGradedEvent) -> ServiceResult<()> {
        let request = self.http.post("api/events/card-graded")?.json(event);
        ensure_success(self.http.send(request).await?).await?;
        Ok(())
    }
}
