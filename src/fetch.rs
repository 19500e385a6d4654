use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Fetches image bytes from external URLs.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// GET the URL. Returns the body bytes on HTTP 200 and `None` on any
    /// other status. Transport failures (DNS, refused connection) are errors.
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, FetchError>;
}

/// Plain HTTP fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        // 200 is the only success signal; anything else keeps the caller's URL
        if resp.status() != reqwest::StatusCode::OK {
            return Ok(None);
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Some(data))
    }
}
