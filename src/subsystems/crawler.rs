use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use backon::{ExponentialBuilder, Retryable};
use bon::Builder;
use tokio::sync::mpsc;
use tokio_graceful_shutdown::errors::CancelledByShutdown;
use tokio_graceful_shutdown::{FutureExt, SubsystemHandle};
use tracing::{error, info};

use crate::models::types::ScrapedRecord;
use crate::traits::crawler::{CrawlStats, Crawler};

#[derive(Builder)]
pub struct CrawlerSubsystem {
    pub(crate) crawler: Arc<dyn Crawler>,
    pub(crate) sender: mpsc::Sender<ScrapedRecord>,
    pub(crate) max_retry_attempts: usize,
}

impl CrawlerSubsystem {
    pub async fn run(self, subsys: SubsystemHandle) -> std::io::Result<()> {
        let name = self.crawler.name().to_string();
        info!(crawler = %name, "Starting crawler subsystem");

        let fut = async {
            match self.crawl_with_retry().await {
                Ok(stats) => info!(
                    crawler = %name,
                    pages = stats.pages_fetched,
                    records = stats.records_sent,
                    "crawler: done"
                ),
                Err(e) => {
                    error!(crawler = %name, error = %e, "crawler: failed after retries");
                    return Err(std::io::Error::other(e.to_string()));
                }
            }
            Ok::<(), std::io::Error>(())
        };

        match fut.cancel_on_shutdown(&subsys).await {
            Ok(Ok(())) => info!(crawler = %name, "Crawler subsystem finished"),
            Ok(Err(e)) => return Err(e),
            Err(CancelledByShutdown) => info!(crawler = %name, "Crawler subsystem cancelled by shutdown"),
        }
        // The sender is dropped here; the persister sees the channel close
        // once every crawler subsystem is gone.
        Ok(())
    }

    async fn crawl_with_retry(&self) -> anyhow::Result<CrawlStats> {
        let crawl = || async {
            self.crawler
                .crawl(self.sender.clone())
                .await
                .map_err(|e| anyhow!("{} crawl failed: {}", self.crawler.name(), e))
        };

        crawl
            .retry(ExponentialBuilder::default().with_max_times(self.max_retry_attempts))
            .sleep(tokio::time::sleep)
            .when(|_: &anyhow::Error| !self.sender.is_closed())
            .notify(|err: &anyhow::Error, dur: Duration| {
                info!("Retrying crawler after {:?} due to error: {}", dur, err);
            })
            .await
    }
}
