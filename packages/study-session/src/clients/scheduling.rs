use std::time::Duration;

use async_trait::async_trait;

use super::http::{encode_segment, ServiceHttp};
use super::{
    CardProgress, DueCard, GradeRequest, GradeResponse, ResetResponse, SchedulingService, ServiceKind,
    ServiceResult,
};
use crate::identity::CardId;

#[derive(Clone)]
pub struct HttpSchedulingService {
    http: ServiceHttp,
}

impl HttpSchedulingService {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ServiceHttp::new(ServiceKind::Scheduling, base_url, timeout),
        }
    }

    fn card_path(card_id: &CardId, action: &str) -> String {
        format!("api/cards/{}/{}", encode_segment(card_id.as_str()), action)
    }
}

#[async_trait]
impl SchedulingService for HttpSchedulingService {
    async fn health(&self) -> ServiceResult<()> {
        self.http.probe().await
    }

    async fn due_items(&self) -> ServiceResult<Vec<DueCard>> {
        self.http.send_json(self.http.get("api/cards/due")?).await
    }

    async fn grade(&self, card_id: &CardId, is_correct: bool) -> ServiceResult<GradeResponse> {
        let request = self
            .http
            .post(&Self::card_path(card_id, "grade"))?
            .json(&GradeRequest { is_correct });
        self.http.send_json(request).await
    }

    async fn progress(&self, card_id: &CardId) -> ServiceResult<CardProgress> {
        self.http
            .send_json(self.http.get(&Self::card_path(card_id, "progress"))?)
            .await
    }

    async fn reset(&self, card_id: &CardId) -> ServiceResult<ResetResponse> {
        self.http
            .send_json(self.http.post(&Self::card_path(card_id, "reset"))?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_paths_encode_identity() {
        let path = HttpSchedulingService::card_path(&CardId::from("L2_你好"), "grade");
        assert_eq!(path, "api/cards/L2_%E4%BD%A0%E5%A5%BD/grade");
    }

    #[tokio::test]
    async fn unconfigured_service_fails_without_network() {
        let service = HttpSchedulingService::new(None, Duration::from_secs(5));
        assert!(service.due_items().await.is_err());
        assert!(service.health().await.is_err());
    }
}
