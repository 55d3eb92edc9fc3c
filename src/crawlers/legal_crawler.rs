use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashSet;
use async_trait::async_trait;
use bon::bon;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::extractors::legal::{ContentSource, LegalPage, extract_legal_list, extract_legal_page, login_succeeded, requires_login};
use crate::extractors::url::{is_legal_detail_url, last_segment, normalize_legal_url, page_param, with_page};
use crate::models::config::{DEFAULT_PORTAL_URL, LegalCrawlerConfig};
use crate::models::types::{NormalizedUrl, ScrapedRecord};
use crate::services::fetcher::{FetchError, FetchedPage, Fetcher};
use crate::services::frontier::{Frontier, Request};
use crate::services::pdf::pdf_to_text;
use crate::traits::crawler::{CrawlStats, Crawler};
use crate::traits::document_store::DocumentStore;

const PDF_TIMEOUT: Duration = Duration::from_secs(10);
const FIRST_PAGE_PRIORITY: i32 = 100;
const PAGINATED_PRIORITY: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageKind {
    List,
    Detail { after_login: bool },
}

/// What handling a detail page produced.
enum DetailOutcome {
    Record(ScrapedRecord),
    Skipped,
    LoginRetry(Request<PageKind>),
}

/// Crawler for the legal-document portal: category list pages fan out to
/// document detail pages.
pub struct LegalCrawler {
    config: LegalCrawlerConfig,
    fetcher: Fetcher,
    store: Arc<dyn DocumentStore>,
}

#[bon]
impl LegalCrawler {
    #[builder]
    pub fn new(
        config: LegalCrawlerConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let fetcher = Fetcher::builder().settings(config.http_settings()).build()?;
        Ok(Self { config, fetcher, store })
    }
}

impl LegalCrawler {
    fn seed(&self, frontier: &mut Frontier<PageKind>) {
        for category in self.config.categories() {
            frontier.push(Request::new(category.clone(), PageKind::List));
            for page in 2..=self.config.seed_pages() {
                frontier.push(Request::new(with_page(&category, page), PageKind::List));
            }
        }
        info!(queued = frontier.len(), "legal: seeded list pages");
    }

    fn parse_list(&self, page: &FetchedPage, frontier: &mut Frontier<PageKind>, seen_lists: &mut AHashSet<String>) {
        if !seen_lists.insert(page.url.clone()) {
            info!(url = %page.url, "legal: list page already parsed");
            return;
        }

        let list = extract_legal_list(&page.body, &page.url);
        info!(url = %page.url, count = list.document_links.len(), "legal: found document links");

        let base = if page.url.contains("page=") { PAGINATED_PRIORITY } else { FIRST_PAGE_PRIORITY };
        for (idx, link) in list.document_links.into_iter().take(self.config.document_limit()).enumerate() {
            let priority = base - idx as i32;
            frontier.push(Request::new(link, PageKind::Detail { after_login: false }).with_priority(priority));
        }

        if self.config.light_mode.unwrap_or(false) {
            return;
        }
        if let Some(next) = list.next_page {
            match page_param(&next) {
                Some(n) if n > 1 && n <= self.config.page_limit() => {
                    info!(%next, "legal: found next page");
                    frontier.push(Request::new(next, PageKind::List));
                }
                _ => debug!(%next, "legal: next link is not a usable page"),
            }
        }
    }

    async fn handle_detail(&self, page: FetchedPage, after_login: bool) -> DetailOutcome {
        let normalized = normalize_legal_url(&page.url);
        if !is_legal_detail_url(normalized.as_str()) {
            info!(url = %normalized, "legal: not a document detail page, skipping");
            return DetailOutcome::Skipped;
        }

        let save_all = self.config.save_all.unwrap_or(false);
        if !save_all && !after_login {
            match self.store.is_url_scraped(normalized.as_str()).await {
                Ok(true) => {
                    info!(url = %normalized, "legal: document url already scraped");
                    return DetailOutcome::Skipped;
                }
                Ok(false) => {
                    if let Err(e) = self.store.mark_url_scraped(normalized.as_str(), None).await {
                        error!(url = %normalized, error = %e, "legal: failed to record scraped url");
                    }
                }
                Err(e) => error!(url = %normalized, error = %e, "legal: scraped url check failed"),
            }
        }

        if let Some(dir) = &self.config.save_html_dir {
            self.save_html(dir, &normalized, &page.body).await;
        }

        if requires_login(&page.body) {
            if after_login {
                warn!(url = %normalized, "legal: still behind login wall after login, skipping");
                return DetailOutcome::Skipped;
            }
            return self.login(&page.url).await;
        }

        let debug = self.config.debug.unwrap_or(false);
        let extracted = extract_legal_page(&page.body, &page.url, debug);
        match self.resolve_document(extracted, &normalized).await {
            Some(record) => DetailOutcome::Record(record),
            None => {
                warn!(url = %normalized, "legal: title or content is empty, skipping");
                DetailOutcome::Skipped
            }
        }
    }

    async fn resolve_document(&self, page: LegalPage, url: &NormalizedUrl) -> Option<ScrapedRecord> {
        let content = match &page.content {
            ContentSource::Html { html, .. } => Some(html.clone()),
            ContentSource::Body(body) => Some(body.clone()),
            ContentSource::Missing => None,
            ContentSource::Pdf { url: pdf_url, body_html } => {
                info!(%pdf_url, "legal: extracting content from pdf");
                match self.fetcher.get_bytes(pdf_url, PDF_TIMEOUT).await {
                    Ok(bytes) => pdf_to_text(&bytes).or_else(|| body_html.clone()),
                    Err(e) => {
                        error!(%pdf_url, error = %e, "legal: pdf download failed");
                        body_html.clone()
                    }
                }
            }
        };
        page.into_document(content, url).map(ScrapedRecord::Legal)
    }

    async fn login(&self, original_url: &str) -> DetailOutcome {
        let Some(login) = &self.config.login else {
            warn!(url = %original_url, "legal: login required but no credentials configured");
            return DetailOutcome::Skipped;
        };
        warn!(url = %original_url, "legal: login required, attempting login");
        let login_url = login
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/dang-nhap", DEFAULT_PORTAL_URL));
        let form = [("username", login.username.as_str()), ("password", login.password.as_str())];
        match self.fetcher.post_form(&login_url, &form).await {
            Ok(resp) if login_succeeded(&resp.body) => {
                info!("legal: login successful, retrying original url");
                DetailOutcome::LoginRetry(
                    Request::new(original_url, PageKind::Detail { after_login: true }).dont_filter(),
                )
            }
            Ok(_) => {
                error!("legal: login failed");
                DetailOutcome::Skipped
            }
            Err(e) => {
                error!(error = %e, "legal: login request failed");
                DetailOutcome::Skipped
            }
        }
    }

    async fn save_html(&self, dir: &str, url: &NormalizedUrl, body: &str) {
        let name = last_segment(url.as_str()).unwrap_or_else(|| "index".to_string()).replace('?', "_");
        let path = PathBuf::from(dir).join(format!("debug_doc_{}.html", name));
        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            warn!(%dir, error = %e, "legal: cannot create html dump dir");
            return;
        }
        if let Err(e) = tokio::fs::write(&path, body).await {
            warn!(path = %path.display(), error = %e, "legal: cannot dump html");
        }
    }
}

#[async_trait]
impl Crawler for LegalCrawler {
    fn name(&self) -> &str {
        "legal"
    }

    async fn crawl(&self, sender: mpsc::Sender<ScrapedRecord>) -> Result<CrawlStats, Box<dyn std::error::Error + Send + Sync>> {
        let mut frontier = Frontier::new();
        let mut seen_lists = AHashSet::new();
        let mut stats = CrawlStats::default();
        self.seed(&mut frontier);

        while let Some(request) = frontier.pop() {
            let fetched = match request.kind {
                PageKind::Detail { after_login: true } => self.fetcher.get_text_fresh(&request.url).await,
                _ => self.fetcher.get_text(&request.url).await,
            };
            let page = match fetched {
                Ok(p) => p,
                Err(FetchError::BudgetExhausted(max)) => {
                    info!(max, "legal: page budget reached, closing");
                    break;
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "legal: fetch failed");
                    stats.failed += 1;
                    continue;
                }
            };
            stats.pages_fetched += 1;

            match request.kind {
                PageKind::List => self.parse_list(&page, &mut frontier, &mut seen_lists),
                PageKind::Detail { after_login } => match self.handle_detail(page, after_login).await {
                    DetailOutcome::Record(record) => {
                        info!(title = record.title(), "legal: document extracted");
                        if sender.send(record).await.is_err() {
                            info!("legal: receiver dropped, stopping");
                            break;
                        }
                        stats.records_sent += 1;
                    }
                    DetailOutcome::LoginRetry(retry) => {
                        frontier.push(retry);
                    }
                    DetailOutcome::Skipped => stats.skipped += 1,
                },
            }
        }

        info!(
            pages = stats.pages_fetched,
            records = stats.records_sent,
            skipped = stats.skipped,
            failed = stats.failed,
            "legal: crawl finished"
        );
        if stats.pages_fetched == 0 && stats.failed > 0 {
            return Err(format!("legal: none of {} requests succeeded", stats.failed).into());
        }
        Ok(stats)
    }
}
