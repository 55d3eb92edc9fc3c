use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::models::types::ScrapedRecord;

/// Counters reported by a finished crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_fetched: u64,
    pub records_sent: u64,
    pub skipped: u64,
    pub failed: u64,
}

#[async_trait]
pub trait Crawler: Send + Sync {
    fn name(&self) -> &str;

    /// Walks the site and streams every extracted record into `sender`.
    /// Returns when the frontier is exhausted or the receiver is gone.
    async fn crawl(&self, sender: mpsc::Sender<ScrapedRecord>) -> Result<CrawlStats, Box<dyn std::error::Error + Send + Sync>>;
}
