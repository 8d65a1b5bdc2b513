pub mod engine;

pub use crate::domain::model::{ManifestEntry, Photo};
pub use crate::domain::ports::{Downloader, PhotoSource, Uploader};
pub use crate::utils::error::Result;
