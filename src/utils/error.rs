use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Authorization failed: {message}")]
    Auth { message: String },

    #[error("VK API error: {message}")]
    SourceApi { message: String },

    #[error("Download failed: {message}")]
    Download { message: String },

    #[error("Upload to {provider} failed: {message}")]
    Upload { provider: String, message: String },
}

pub type Result<T> = std::result::Result<T, BackupError>;
