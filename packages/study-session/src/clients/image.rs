use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::http::{ensure_success, ServiceHttp};
use super::{ImageService, ServiceError, ServiceKind, ServiceResult};

#[derive(Clone)]
pub struct HttpImageService {
    http: ServiceHttp,
}

impl HttpImageService {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            http: ServiceHttp::new(ServiceKind::Image, base_url, timeout),
        }
    }
}

#[async_trait]
impl ImageService for HttpImageService {
    async fn health(&self) -> ServiceResult<()> {
        self.http.probe().await
    }

    async fn fetch_image(&self, search_term: &str) -> ServiceResult<Bytes> {
        let request = self.http.get("api/images")?.query(&[("q", search_term)]);
        let resp = ensure_success(self.http.send(request).await?).await?;
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(ServiceError::Rejected(format!("empty image body for '{search_term}'")));
        }
        Ok(bytes)
    }
}
