use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bon::bon;
use futures_util::future::join_all;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::extractors::contract::{extract_contract_list, extract_contract_page};
use crate::extractors::text::clean_filename;
use crate::extractors::url::{normalize_contract_url, with_page};
use crate::models::config::ContractCrawlerConfig;
use crate::models::types::{ContractTemplate, ScrapedRecord};
use crate::services::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::services::frontier::{Frontier, Request};
use crate::traits::crawler::{CrawlStats, Crawler};
use crate::traits::document_store::DocumentStore;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_DOCUMENTS_DIR: &str = "contracts";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    List,
    Detail,
}

/// Crawler for the contract-template section of the portal.
pub struct ContractCrawler {
    config: ContractCrawlerConfig,
    fetcher: Fetcher,
    store: Arc<dyn DocumentStore>,
}

#[bon]
impl ContractCrawler {
    #[builder]
    pub fn new(
        config: ContractCrawlerConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let fetcher = Fetcher::builder().settings(config.http_settings()).build()?;
        Ok(Self { config, fetcher, store })
    }
}

impl ContractCrawler {
    fn seed(&self, frontier: &mut Frontier<PageKind>) {
        for category in self.config.categories() {
            frontier.push(Request::new(category.clone(), PageKind::List));
            for page in 2..=self.config.seed_pages() {
                frontier.push(Request::new(with_page(&category, page), PageKind::List));
            }
        }
        info!(queued = frontier.len(), "contracts: seeded list pages");
    }

    async fn parse_list(&self, page: &FetchedPage, frontier: &mut Frontier<PageKind>) {
        let list = extract_contract_list(&page.body, &page.url, self.config.page_limit());
        info!(url = %page.url, count = list.detail_links.len(), "contracts: found template links");

        let checks = list.detail_links.iter().map(|link| {
            let normalized = normalize_contract_url(link);
            let store = Arc::clone(&self.store);
            async move {
                match store.is_url_scraped(normalized.as_str()).await {
                    Ok(scraped) => scraped,
                    Err(e) => {
                        error!(url = %normalized, error = %e, "contracts: scraped url check failed");
                        false
                    }
                }
            }
        });
        let scraped = join_all(checks).await;

        let limit = self.config.document_limit();
        let mut scheduled = 0;
        for (link, already) in list.detail_links.into_iter().zip(scraped) {
            if already {
                info!(url = %link, "contracts: skipping scraped url");
                continue;
            }
            if scheduled >= limit {
                info!(limit, "contracts: document limit reached for this page");
                break;
            }
            scheduled += 1;
            frontier.push(Request::new(link, PageKind::Detail));
        }

        for next in list.next_pages {
            if frontier.push(Request::new(next.clone(), PageKind::List)) {
                info!(%next, "contracts: next page");
            }
        }
    }

    async fn parse_detail(&self, page: &FetchedPage) -> Option<ContractTemplate> {
        let normalized = normalize_contract_url(&page.url);
        match self.store.is_url_scraped(normalized.as_str()).await {
            Ok(true) => {
                info!(url = %normalized, "contracts: url already scraped");
                return None;
            }
            Ok(false) => {}
            Err(e) => error!(url = %normalized, error = %e, "contracts: scraped url check failed"),
        }

        let mut template = extract_contract_page(&page.body, &page.url, &self.config.files_base_url());
        template.source_url = normalized.to_string();

        if let Err(e) = self.store.mark_url_scraped(normalized.as_str(), Some("processing")).await {
            error!(url = %normalized, error = %e, "contracts: failed to record scraped url");
        }

        if template.title.is_empty() {
            warn!(url = %normalized, "contracts: template without title, skipping");
            return None;
        }

        if self.config.save_documents.unwrap_or(false) {
            if let Some(download_url) = template.download_url.clone() {
                template.file_path = self.download(&download_url, &template.title).await;
            } else {
                info!(url = %normalized, "contracts: no download link");
            }
        }
        Some(template)
    }

    async fn download(&self, url: &str, title: &str) -> Option<String> {
        let dir = PathBuf::from(self.config.documents_dir.as_deref().unwrap_or(DEFAULT_DOCUMENTS_DIR));
        let path = dir.join(format!("{}.doc", clean_filename(title)));
        info!(%url, path = %path.display(), "contracts: downloading template file");

        let bytes = match self.fetcher.get_bytes(url, DOWNLOAD_TIMEOUT).await {
            Ok(b) => b,
            Err(e) => {
                warn!(%url, error = %e, "contracts: download failed");
                return None;
            }
        };
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(dir = %dir.display(), error = %e, "contracts: cannot create documents dir");
            return None;
        }
        match tokio::fs::write(&path, bytes).await {
            Ok(()) => Some(path.display().to_string()),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "contracts: cannot write template file");
                None
            }
        }
    }
}

#[async_trait]
impl Crawler for ContractCrawler {
    fn name(&self) -> &str {
        "contracts"
    }

    async fn crawl(&self, sender: mpsc::Sender<ScrapedRecord>) -> Result<CrawlStats, Box<dyn std::error::Error + Send + Sync>> {
        let mut frontier = Frontier::new();
        let mut stats = CrawlStats::default();
        self.seed(&mut frontier);

        while let Some(request) = frontier.pop() {
            let page = match self.fetcher.get_text(&request.url).await {
                Ok(p) => p,
                Err(FetchError::BudgetExhausted(max)) => {
                    info!(max, "contracts: page budget reached, closing");
                    break;
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "contracts: fetch failed");
                    stats.failed += 1;
                    continue;
                }
            };
            stats.pages_fetched += 1;

            match request.kind {
                PageKind::List => self.parse_list(&page, &mut frontier).await,
                PageKind::Detail => match self.parse_detail(&page).await {
                    Some(template) => {
                        info!(title = %template.title, kind = %template.template_type, "contracts: template extracted");
                        if sender.send(ScrapedRecord::Contract(template)).await.is_err() {
                            info!("contracts: receiver dropped, stopping");
                            break;
                        }
                        stats.records_sent += 1;
                    }
                    None => stats.skipped += 1,
                },
            }
        }

        info!(
            pages = stats.pages_fetched,
            records = stats.records_sent,
            skipped = stats.skipped,
            failed = stats.failed,
            "contracts: crawl finished"
        );
        if stats.pages_fetched == 0 && stats.failed > 0 {
            return Err(format!("contracts: none of {} requests succeeded", stats.failed).into());
        }
        Ok(stats)
    }
}
