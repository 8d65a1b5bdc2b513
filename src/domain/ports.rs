use crate::domain::model::Photo;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Album listing seam. The real implementation talks to the VK API.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn list_photos(&self, owner_id: i64, album_id: &str, count: u32) -> Result<Vec<Photo>>;
}

/// Fetches a rendition's bytes to a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, dest: &Path) -> Result<()>;
}

/// One cloud destination. `upload` returns the provider-assigned identifier
/// when the backend issues one.
#[async_trait]
pub trait Uploader: Send + Sync {
    fn name(&self) -> &str;
    async fn upload(&self, local_path: &Path) -> Result<Option<String>>;
}
