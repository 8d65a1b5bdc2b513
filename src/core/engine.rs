use crate::core::{Downloader, ManifestEntry, Photo, PhotoSource, Result, Uploader};
use crate::utils::error::BackupError;
use chrono::Utc;
use std::path::{Path, PathBuf};

/// What one run should back up and where the artifacts go.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub owner_id: i64,
    pub album_id: String,
    pub count: u32,
    pub photos_dir: PathBuf,
    pub manifest_path: PathBuf,
}

#[derive(Debug)]
pub struct BackupReport {
    pub processed: usize,
    pub skipped: usize,
    pub manifest_path: PathBuf,
}

/// Drives one run end-to-end: list the album, then per photo select the
/// largest rendition, download it, push it to both destinations, record a
/// manifest entry, and drop the local file. A failure inside one photo's
/// sequence skips that photo only; listing and manifest failures abort the
/// run.
pub struct BackupEngine<S, D, A, B>
where
    S: PhotoSource,
    D: Downloader,
    A: Uploader,
    B: Uploader,
{
    source: S,
    downloader: D,
    primary: A,
    secondary: B,
    request: BackupRequest,
}

impl<S, D, A, B> BackupEngine<S, D, A, B>
where
    S: PhotoSource,
    D: Downloader,
    A: Uploader,
    B: Uploader,
{
    pub fn new(source: S, downloader: D, primary: A, secondary: B, request: BackupRequest) -> Self {
        Self {
            source,
            downloader,
            primary,
            secondary,
            request,
        }
    }

    pub async fn run(&self) -> Result<BackupReport> {
        tracing::info!(
            "Listing up to {} photos from album {}",
            self.request.count,
            self.request.album_id
        );
        let photos = self
            .source
            .list_photos(self.request.owner_id, &self.request.album_id, self.request.count)
            .await?;
        tracing::info!("Album listing returned {} photos", photos.len());

        std::fs::create_dir_all(&self.request.photos_dir)?;

        let mut manifest: Vec<ManifestEntry> = Vec::new();
        let mut skipped = 0usize;
        for (index, photo) in photos.iter().enumerate() {
            match self.process_photo(photo).await {
                Ok(entry) => {
                    tracing::info!(
                        "Backed up {} ({}/{})",
                        entry.file_name,
                        index + 1,
                        photos.len()
                    );
                    manifest.push(entry);
                }
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("Skipping photo {}: {}", photo.id, e);
                }
            }
        }

        self.write_manifest(&manifest)?;
        tracing::info!(
            "Manifest with {} entries written to {}",
            manifest.len(),
            self.request.manifest_path.display()
        );

        Ok(BackupReport {
            processed: manifest.len(),
            skipped,
            manifest_path: self.request.manifest_path.clone(),
        })
    }

    async fn process_photo(&self, photo: &Photo) -> Result<ManifestEntry> {
        let rendition = photo
            .largest_size()
            .ok_or_else(|| BackupError::SourceApi {
                message: format!("photo {} has no size variants", photo.id),
            })?;
        let url = rendition.url.clone();
        let size = rendition.kind.clone();

        let file_name = photo.file_name(Utc::now());
        let local_path = self.request.photos_dir.join(&file_name);

        let transferred = self.transfer(&url, &local_path).await;

        // The local file is transient whatever happened above.
        if local_path.exists() {
            if let Err(e) = std::fs::remove_file(&local_path) {
                tracing::warn!(
                    "Failed to remove temporary file {}: {}",
                    local_path.display(),
                    e
                );
            }
        }

        transferred.map(|_| ManifestEntry { file_name, size })
    }

    async fn transfer(&self, url: &str, local_path: &Path) -> Result<()> {
        self.downloader.download(url, local_path).await?;
        self.upload_with(&self.primary, local_path).await?;
        self.upload_with(&self.secondary, local_path).await?;
        Ok(())
    }

    async fn upload_with<U: Uploader>(&self, uploader: &U, local_path: &Path) -> Result<()> {
        let assigned = uploader.upload(local_path).await?;
        match assigned {
            Some(id) => tracing::info!("{} stored the file with id {}", uploader.name(), id),
            None => tracing::debug!("{} upload finished", uploader.name()),
        }
        Ok(())
    }

    fn write_manifest(&self, entries: &[ManifestEntry]) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.request.manifest_path, json)?;
        Ok(())
    }
}
