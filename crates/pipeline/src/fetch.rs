//! Download of generated assets into transient files.

use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;

/// Timeout for a whole model download.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download of {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Could not write transient file: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetches a remote asset into a file that is deleted when dropped.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<NamedTempFile, FetchError>;
}

/// [`AssetFetcher`] over plain HTTP(S).
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<NamedTempFile, FetchError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;

        let file = tempfile::Builder::new()
            .prefix("printloop-")
            .suffix(".model")
            .tempfile()?;
        tokio::fs::write(file.path(), &bytes).await?;

        tracing::debug!(url, bytes = bytes.len(), path = %file.path().display(), "Model downloaded");
        Ok(file)
    }
}
