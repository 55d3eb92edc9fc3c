use std::path::PathBuf;
use std::time::Duration;

use ahash::RandomState;
use bon::Builder;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

// Fixed seeds keep cache keys stable across runs.
const KEY_SEEDS: (u64, u64, u64, u64) = (0x6c65_6761, 0x6931_7374, 0x6874_7470, 0x6361_6368);

/// One cached response. The body is stored next to it in a `.body` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub fetched_at: DateTime<Utc>,
}

/// On-disk cache of successful GET responses, keyed by request URL.
#[derive(Debug, Clone, Builder)]
pub struct HttpCache {
    #[builder(into)]
    dir: PathBuf,
    expiration: Duration,
}

impl HttpCache {
    fn key(url: &str) -> String {
        let (a, b, c, d) = KEY_SEEDS;
        format!("{:016x}", RandomState::with_seeds(a, b, c, d).hash_one(url))
    }

    fn meta_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.json", Self::key(url)))
    }

    fn body_path(&self, url: &str) -> PathBuf {
        self.dir.join(format!("{}.body", Self::key(url)))
    }

    /// Returns the cached entry and body when present and not expired.
    /// A zero expiration never expires.
    pub async fn get(&self, url: &str) -> Option<(CacheEntry, String)> {
        let raw = fs::read_to_string(self.meta_path(url)).await.ok()?;
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                warn!(%url, error = %e, "http cache: unreadable entry");
                return None;
            }
        };
        if entry.url != url {
            return None;
        }
        if !self.expiration.is_zero() {
            let age = Utc::now().signed_duration_since(entry.fetched_at);
            if age.to_std().map(|a| a > self.expiration).unwrap_or(false) {
                debug!(%url, "http cache: entry expired");
                return None;
            }
        }
        let body = fs::read_to_string(self.body_path(url)).await.ok()?;
        Some((entry, body))
    }

    pub async fn put(
        &self,
        url: &str,
        final_url: &str,
        status: u16,
        body: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        fs::create_dir_all(&self.dir).await?;
        let entry = CacheEntry {
            url: url.to_string(),
            final_url: final_url.to_string(),
            status,
            fetched_at: Utc::now(),
        };
        fs::write(self.body_path(url), body).await?;
        fs::write(self.meta_path(url), serde_json::to_string(&entry)?).await?;
        Ok(())
    }
}
