use crate::domain::ports::Downloader;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Streams response bodies to disk chunk by chunk, so a large image never
/// sits fully in memory.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(BackupError::Download {
                message: format!("{} returned {}", url, response.status()),
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(())
    }
}
