use std::future::Future;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{ServiceError, ServiceKind, ServiceResult};

const CLIENT_USER_AGENT: &str = "danci-study-session/0.1 (+reqwest)";

/// Shared transport for one collaborator: a base URL plus a client whose
/// timeout bounds every request.
#[derive(Clone)]
pub struct ServiceHttp {
    kind: ServiceKind,
    base_url: Option<String>,
    client: Client,
}

impl ServiceHttp {
    pub fn new(kind: ServiceKind, base_url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            kind,
            base_url: base_url.map(|url| url.trim().trim_end_matches('/').to_string()),
            client,
        }
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn url(&self, path: &str) -> ServiceResult<String> {
        let base = self
            .base_url
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or(ServiceError::NotConfigured(self.kind))?;
        Ok(format!("{}/{}", base, path.trim_start_matches('/')))
    }

    pub fn get(&self, path: &str) -> ServiceResult<RequestBuilder> {
        Ok(self.client.get(self.url(path)?).header(USER_AGENT, CLIENT_USER_AGENT))
    }

    pub fn post(&self, path: &str) -> ServiceResult<RequestBuilder> {
        Ok(self.client.post(self.url(path)?).header(USER_AGENT, CLIENT_USER_AGENT))
    }

    pub async fn probe(&self) -> ServiceResult<()> {
        let resp = self.send(self.get("health")?).await?;
        ensure_success(resp).await.map(|_| ())
    }

    pub async fn send(&self, request: RequestBuilder) -> ServiceResult<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout { service: self.kind }
            } else {
                ServiceError::Request(e)
            }
        })
    }

    pub async fn send_json<T>(&self, request: RequestBuilder) -> ServiceResult<T>
    where
        T: DeserializeOwned,
    {
        let resp = ensure_success(self.send(request).await?).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(service = %self.kind, error = %e, "failed to decode response body");
            ServiceError::Json(e)
        })
    }
}

pub async fn ensure_success(resp: Response) -> ServiceResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ServiceError::HttpStatus { status, body })
}

pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

/// Bounds any collaborator future; elapsed deadlines surface as
/// [`ServiceError::Timeout`] so callers treat them like other recoverable failures.
pub async fn with_timeout<T, F>(kind: ServiceKind, limit: Duration, fut: F) -> ServiceResult<T>
where
    F: Future<Output = ServiceResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::Timeout { service: kind }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let http = ServiceHttp::new(
            ServiceKind::Scheduling,
            Some("http://localhost:4000/".to_string()),
            Duration::from_secs(5),
        );
        assert_eq!(http.url("/health").unwrap(), "http://localhost:4000/health");
        assert_eq!(http.url("api/cards/due").unwrap(), "http://localhost:4000/api/cards/due");
    }

    #[test]
    fn missing_base_url_is_not_configured() {
        let http = ServiceHttp::new(ServiceKind::Audio, None, Duration::from_secs(5));
        assert!(matches!(http.url("health"), Err(ServiceError::NotConfigured(ServiceKind::Audio))));
    }

    #[test]
    fn card_ids_are_percent_encoded() {
        assert_eq!(encode_segment("L1_水"), "L1_%E6%B0%B4");
    }

    #[tokio::test(start_paused = true)]
    async fn with_timeout_maps_elapsed_deadline() {
        let result: ServiceResult<()> = with_timeout(ServiceKind::Image, Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Timeout { service: ServiceKind::Image })));
    }
}
