//! Reference material table image for the material task.

use async_trait::async_trait;
use mechsel_suggest::{ImageAttachment, ImageKind};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference image request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("reference image {url} returned {status}")]
    Status { url: String, status: u16 },
}

#[async_trait]
pub trait ReferenceImageSource: Send + Sync {
    async fn fetch(&self) -> Result<ImageAttachment, ReferenceError>;
}

/// Fetches the image from a URL on every request; it is never cached.
#[derive(Debug, Clone)]
pub struct HttpReferenceImage {
    client: reqwest::Client,
    url: String,
}

impl HttpReferenceImage {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl ReferenceImageSource for HttpReferenceImage {
    async fn fetch(&self) -> Result<ImageAttachment, ReferenceError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReferenceError::Status {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let bytes = response.bytes().await?;
        debug!(url = %self.url, bytes = bytes.len(), mime = ?mime, "reference image fetched");
        Ok(ImageAttachment::from_mime(
            bytes.to_vec(),
            mime.as_deref(),
            ImageKind::Jpeg,
        ))
    }
}
