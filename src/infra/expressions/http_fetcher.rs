use crate::core::expressions::{AssetFetcher, ExpressionError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;

/// Downloads emoji and sticker images from Discord's CDN.
pub struct HttpAssetFetcher {
    client: Client,
}

impl HttpAssetFetcher {
    pub fn new() -> Result<Self, ExpressionError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "User-Agent",
            HeaderValue::from_static("GuildCogs/0.1 (+emoji copier)"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ExpressionError::Fetch(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExpressionError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExpressionError::Fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url, %status, "CDN fetch failed");
            return Err(ExpressionError::Fetch(format!("CDN returned {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ExpressionError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
