use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One rendered variant of a photo, as returned by `photos.get` with
/// `photo_sizes=1`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoSize {
    pub url: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(rename = "type")]
    pub kind: String,
}

impl PhotoSize {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Likes {
    pub count: u64,
}

/// A photo straight out of the album listing. Fetched fresh every run and
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Photo {
    pub id: i64,
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
    #[serde(default)]
    pub likes: Likes,
    /// Creation time as unix seconds; VK omits it for some legacy uploads.
    #[serde(default)]
    pub date: Option<i64>,
}

impl Photo {
    /// The variant with the largest pixel area. Comparison is strict, so the
    /// first variant wins a tie. `None` when the size list is empty.
    pub fn largest_size(&self) -> Option<&PhotoSize> {
        let mut best: Option<&PhotoSize> = None;
        for size in &self.sizes {
            match best {
                Some(current) if size.area() <= current.area() => {}
                _ => best = Some(size),
            }
        }
        best
    }

    /// Local file name: `{likes}_{YYYYMMDD_HHMMSS}.jpg`, stamped with the
    /// photo's own creation time when the listing carried one, otherwise
    /// with `now`.
    pub fn file_name(&self, now: DateTime<Utc>) -> String {
        let stamp = self
            .date
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or(now);
        format!("{}_{}.jpg", self.likes.count, stamp.format("%Y%m%d_%H%M%S"))
    }
}

/// One line of the end-of-run manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file_name: String,
    pub size: String,
}

/// Google Drive credential persisted as `token.json` in the authorized-user
/// layout, so a token written by other tooling keeps working here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    #[serde(rename = "token")]
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredToken {
    /// Expired or about to expire. Tokens without an expiry are taken at
    /// face value.
    pub fn is_expired(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        match self.expiry {
            Some(expiry) => now + skew >= expiry,
            None => false,
        }
    }
}
