use crate::domain::ports::Uploader;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct UploadTarget {
    href: String,
}

/// Yandex Disk destination: ask the API for an upload href, then PUT the
/// file bytes to it. Uses a static long-lived OAuth token.
pub struct YandexDisk {
    client: Client,
    api_base: String,
    token: String,
}

impl YandexDisk {
    pub fn new(client: Client, api_base: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            token: token.into(),
        }
    }

    fn error(&self, message: String) -> BackupError {
        BackupError::Upload {
            provider: "Yandex Disk".to_string(),
            message,
        }
    }
}

#[async_trait]
impl Uploader for YandexDisk {
    fn name(&self) -> &str {
        "Yandex Disk"
    }

    async fn upload(&self, local_path: &Path) -> Result<Option<String>> {
        let remote_path = local_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| self.error(format!("invalid local path {}", local_path.display())))?;

        let url = format!("{}/upload", self.api_base);
        let response = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("OAuth {}", self.token))
            .query(&[("path", remote_path), ("overwrite", "true")])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.error(format!(
                "upload href request returned {}",
                response.status()
            )));
        }

        let target: UploadTarget = response
            .json()
            .await
            .map_err(|e| self.error(format!("malformed upload href response: {}", e)))?;

        let bytes = tokio::fs::read(local_path).await?;
        let put = self.client.put(&target.href).body(bytes).send().await?;
        if !put.status().is_success() {
            return Err(self.error(format!("PUT to upload href returned {}", put.status())));
        }

        Ok(None)
    }
}
