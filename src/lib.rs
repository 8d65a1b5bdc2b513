pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::download::HttpDownloader;
pub use adapters::gdrive::{GoogleAuth, GoogleDrive};
pub use adapters::vk::VkClient;
pub use adapters::yandex::YandexDisk;
pub use config::{CliConfig, Secrets};
pub use crate::core::engine::{BackupEngine, BackupReport, BackupRequest};
pub use utils::error::{BackupError, Result};
