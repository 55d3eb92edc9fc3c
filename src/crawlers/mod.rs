pub mod contract_crawler;
pub mod legal_crawler;

use std::sync::Arc;

pub use contract_crawler::ContractCrawler;
pub use legal_crawler::LegalCrawler;

use crate::models::config::AppConfig;
use crate::models::kinds::CrawlTarget;
use crate::traits::crawler::Crawler;
use crate::traits::document_store::DocumentStore;

/// Builds the crawler for `target` from its config section (defaults when absent).
pub fn build_crawler(
    target: CrawlTarget,
    config: &AppConfig,
    store: Arc<dyn DocumentStore>,
) -> Result<Arc<dyn Crawler>, Box<dyn std::error::Error + Send + Sync>> {
    Ok(match target {
        CrawlTarget::Legal => Arc::new(
            LegalCrawler::builder()
                .config(config.legal.clone().unwrap_or_default())
                .store(store)
                .build()?,
        ),
        CrawlTarget::Contracts => Arc::new(
            ContractCrawler::builder()
                .config(config.contracts.clone().unwrap_or_default())
                .store(store)
                .build()?,
        ),
    })
}

/// Targets enabled in the config, in crawl order.
pub fn enabled_targets(config: &AppConfig) -> Vec<CrawlTarget> {
    CrawlTarget::all()
        .into_iter()
        .filter(|t| match t {
            CrawlTarget::Legal => config.legal.as_ref().and_then(|l| l.enabled).unwrap_or(true),
            CrawlTarget::Contracts => config.contracts.as_ref().and_then(|c| c.enabled).unwrap_or(true),
        })
        .collect()
}
