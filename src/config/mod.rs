use crate::utils::error::{BackupError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_url, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

pub const VK_API_URL: &str = "https://api.vk.com/method";
pub const VK_OAUTH_URL: &str = "https://oauth.vk.com/access_token";
pub const YANDEX_DISK_API_URL: &str = "https://cloud-api.yandex.net/v1/disk/resources";
pub const GOOGLE_DRIVE_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "vk-photo-backup")]
#[command(about = "Backs up VK album photos to Yandex Disk and Google Drive")]
pub struct CliConfig {
    /// VK account id that owns the album
    #[arg(long)]
    pub owner_id: i64,

    /// Album to back up ("profile", "wall", "saved" or a numeric album id)
    #[arg(long, default_value = "profile")]
    pub album_id: String,

    /// How many photos to fetch from the album
    #[arg(long, default_value = "5")]
    pub count: u32,

    /// Directory for transient downloads
    #[arg(long, default_value = "photos")]
    pub photos_dir: String,

    /// Where the end-of-run manifest is written
    #[arg(long, default_value = "photos_info.json")]
    pub manifest_path: String,

    /// Persisted Google Drive credential
    #[arg(long, default_value = "token.json")]
    pub token_path: String,

    /// Google installed-app client secret, used by the interactive flow
    #[arg(long, default_value = "credentials.json")]
    pub credentials_path: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, default_value = VK_API_URL, hide = true)]
    pub vk_api_base: String,

    #[arg(long, default_value = VK_OAUTH_URL, hide = true)]
    pub vk_oauth_url: String,

    #[arg(long, default_value = YANDEX_DISK_API_URL, hide = true)]
    pub yandex_api_base: String,

    #[arg(long, default_value = GOOGLE_DRIVE_UPLOAD_URL, hide = true)]
    pub gdrive_upload_base: String,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("album_id", &self.album_id)?;
        validate_positive_number("count", self.count, 1)?;
        validate_non_empty_string("photos_dir", &self.photos_dir)?;
        validate_non_empty_string("manifest_path", &self.manifest_path)?;
        validate_non_empty_string("token_path", &self.token_path)?;
        validate_non_empty_string("credentials_path", &self.credentials_path)?;
        validate_url("vk_api_base", &self.vk_api_base)?;
        validate_url("vk_oauth_url", &self.vk_oauth_url)?;
        validate_url("yandex_api_base", &self.yandex_api_base)?;
        validate_url("gdrive_upload_base", &self.gdrive_upload_base)?;
        Ok(())
    }
}

/// Tokens and client credentials sourced from the environment, read once at
/// startup before any network call.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub vk_client_id: String,
    pub vk_client_secret: String,
    pub vk_refresh_token: String,
    pub yandex_token: String,
}

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            vk_client_id: require(&lookup, "VK_CLIENT_ID")?,
            vk_client_secret: require(&lookup, "VK_CLIENT_SECRET")?,
            vk_refresh_token: require(&lookup, "VK_REFRESH_TOKEN")?,
            yandex_token: require(&lookup, "YANDEX_TOKEN")?,
        })
    }
}

fn require<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| BackupError::Config {
            message: format!("environment variable {} is not set", name),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CliConfig {
        CliConfig {
            owner_id: 123,
            album_id: "profile".to_string(),
            count: 5,
            photos_dir: "photos".to_string(),
            manifest_path: "photos_info.json".to_string(),
            token_path: "token.json".to_string(),
            credentials_path: "credentials.json".to_string(),
            verbose: false,
            vk_api_base: VK_API_URL.to_string(),
            vk_oauth_url: VK_OAUTH_URL.to_string(),
            yandex_api_base: YANDEX_DISK_API_URL.to_string(),
            gdrive_upload_base: GOOGLE_DRIVE_UPLOAD_URL.to_string(),
        }
    }

    #[test]
    fn test_default_config_validates() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_empty_album_id_rejected() {
        let mut cfg = config();
        cfg.album_id = "".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut cfg = config();
        cfg.count = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        let mut cfg = config();
        cfg.vk_api_base = "not a url".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_secrets_from_complete_lookup() {
        let secrets = Secrets::from_lookup(|name| Some(format!("value-for-{}", name))).unwrap();
        assert_eq!(secrets.vk_client_id, "value-for-VK_CLIENT_ID");
        assert_eq!(secrets.yandex_token, "value-for-YANDEX_TOKEN");
    }

    #[test]
    fn test_secrets_missing_variable_fails() {
        let result = Secrets::from_lookup(|name| {
            if name == "YANDEX_TOKEN" {
                None
            } else {
                Some("x".to_string())
            }
        });

        match result {
            Err(BackupError::Config { message }) => assert!(message.contains("YANDEX_TOKEN")),
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_secrets_blank_variable_fails() {
        let result = Secrets::from_lookup(|name| {
            if name == "VK_REFRESH_TOKEN" {
                Some("   ".to_string())
            } else {
                Some("x".to_string())
            }
        });
        assert!(result.is_err());
    }
}
