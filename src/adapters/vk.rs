use crate::domain::model::Photo;
use crate::domain::ports::PhotoSource;
use crate::utils::error::{BackupError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

pub const VK_API_VERSION: &str = "5.131";

/// Result of the refresh-token exchange. The endpoint may rotate the
/// refresh token; persisting the rotated value is the caller's business.
#[derive(Debug, Clone, Deserialize)]
pub struct VkAccessToken {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct PhotosEnvelope {
    response: Option<PhotosResponse>,
    error: Option<VkApiError>,
}

#[derive(Debug, Deserialize)]
struct PhotosResponse {
    items: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
struct VkApiError {
    error_code: i64,
    error_msg: String,
}

pub struct VkClient {
    client: Client,
    api_base: String,
    access_token: String,
}

impl VkClient {
    /// Exchanges client credentials plus a refresh token for a fresh access
    /// token at the VK token endpoint.
    pub async fn refresh_access_token(
        client: &Client,
        oauth_url: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<VkAccessToken> {
        let params = [
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];

        let response = client.post(oauth_url).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(BackupError::Auth {
                message: format!("VK token endpoint returned {}", response.status()),
            });
        }

        response.json::<VkAccessToken>().await.map_err(|e| {
            BackupError::Auth {
                message: format!("malformed VK token response: {}", e),
            }
        })
    }

    pub fn with_token(
        client: Client,
        api_base: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            access_token: access_token.into(),
        }
    }
}

#[async_trait]
impl PhotoSource for VkClient {
    async fn list_photos(&self, owner_id: i64, album_id: &str, count: u32) -> Result<Vec<Photo>> {
        let url = format!("{}/photos.get", self.api_base);
        let owner_id = owner_id.to_string();
        let count = count.to_string();
        let params = [
            ("access_token", self.access_token.as_str()),
            ("v", VK_API_VERSION),
            ("owner_id", owner_id.as_str()),
            ("album_id", album_id),
            ("extended", "1"),
            ("photo_sizes", "1"),
            ("count", count.as_str()),
        ];

        tracing::debug!("Requesting photos.get for album {}", album_id);
        let response = self.client.get(&url).query(&params).send().await?;
        if !response.status().is_success() {
            return Err(BackupError::SourceApi {
                message: format!("photos.get returned {}", response.status()),
            });
        }

        let envelope: PhotosEnvelope =
            response.json().await.map_err(|e| BackupError::SourceApi {
                message: format!("malformed photos.get response: {}", e),
            })?;

        if let Some(error) = envelope.error {
            return Err(BackupError::SourceApi {
                message: format!("error {}: {}", error.error_code, error.error_msg),
            });
        }

        envelope
            .response
            .map(|r| r.items)
            .ok_or_else(|| BackupError::SourceApi {
                message: "response body is missing the result envelope".to_string(),
            })
    }
}
