use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};
use bon::bon;
use reqwest::Client;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::config::HttpSettings;
use crate::services::http_cache::HttpCache;

/// A fetched HTML page. `url` is the final URL after redirects.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub from_cache: bool,
}

#[derive(Debug)]
pub enum FetchError {
    OffSite(String),
    BudgetExhausted(u64),
    Status { url: String, status: u16 },
    Transport(reqwest::Error),
}

impl FetchError {
    fn is_retryable(&self, codes: &[u16]) -> bool {
        match self {
            FetchError::Status { status, .. } => codes.contains(status),
            FetchError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::OffSite(url) => write!(f, "offsite request filtered: {}", url),
            FetchError::BudgetExhausted(max) => write!(f, "page budget of {} exhausted", max),
            FetchError::Status { url, status } => write!(f, "http status {} for {}", status, url),
            FetchError::Transport(e) => write!(f, "transport error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e)
    }
}

struct Throttle {
    delay: Duration,
    last_request: Option<Instant>,
}

/// Polite HTTP client shared by the crawlers: domain filter, page budget,
/// download delay with auto-throttle, retries and an optional disk cache.
pub struct Fetcher {
    client: Client,
    settings: HttpSettings,
    cache: Option<HttpCache>,
    pages: AtomicU64,
    throttle: Mutex<Throttle>,
}

#[bon]
impl Fetcher {
    #[builder]
    pub fn new(settings: HttpSettings) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout)
            .cookie_store(settings.cookies_enabled)
            .build()?;
        let cache = settings.cache_dir.as_ref().map(|dir| {
            HttpCache::builder()
                .dir(dir.as_str())
                .expiration(settings.cache_expiration)
                .build()
        });
        let start_delay = settings
            .autothrottle
            .as_ref()
            .map(|at| at.start_delay.max(settings.download_delay))
            .unwrap_or(settings.download_delay);
        Ok(Self {
            client,
            cache,
            pages: AtomicU64::new(0),
            throttle: Mutex::new(Throttle { delay: start_delay, last_request: None }),
            settings,
        })
    }
}

impl Fetcher {
    pub fn pages_fetched(&self) -> u64 {
        self.pages.load(Ordering::Relaxed)
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        if self.settings.allowed_domains.is_empty() {
            return true;
        }
        let Some(host) = Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_lowercase)) else {
            return false;
        };
        self.settings
            .allowed_domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }

    fn take_page(&self) -> Result<(), FetchError> {
        let max = self.settings.max_pages;
        if self.pages.fetch_add(1, Ordering::Relaxed) >= max {
            return Err(FetchError::BudgetExhausted(max));
        }
        Ok(())
    }

    /// Waits out the current delay and returns the instant the request starts.
    async fn wait_turn(&self) -> Instant {
        let mut throttle = self.throttle.lock().await;
        if let Some(last) = throttle.last_request {
            let ready = last + throttle.delay;
            tokio::time::sleep_until(ready).await;
        }
        let now = Instant::now();
        throttle.last_request = Some(now);
        now
    }

    async fn record_latency(&self, latency: Duration) {
        let Some(at) = self.settings.autothrottle.as_ref() else { return };
        let mut throttle = self.throttle.lock().await;
        let target = latency.div_f64(at.target_concurrency);
        let next = ((throttle.delay + target) / 2).min(at.max_delay).max(self.settings.download_delay);
        debug!(latency_ms = latency.as_millis() as u64, delay_ms = next.as_millis() as u64, "fetcher: throttle");
        throttle.delay = next;
    }

    async fn get_once(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let started = self.wait_turn().await;
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        if !response.status().is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        let body = response.text().await?;
        self.record_latency(started.elapsed()).await;
        Ok(FetchedPage { url: final_url, status, body, from_cache: false })
    }

    /// GETs an HTML page, counting it against the page budget.
    pub async fn get_text(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_text(url, true).await
    }

    /// Like [`Fetcher::get_text`] but always goes to the network. The fresh
    /// body replaces any cached entry.
    pub async fn get_text_fresh(&self, url: &str) -> Result<FetchedPage, FetchError> {
        self.fetch_text(url, false).await
    }

    async fn fetch_text(&self, url: &str, read_cache: bool) -> Result<FetchedPage, FetchError> {
        if !self.is_allowed(url) {
            return Err(FetchError::OffSite(url.to_string()));
        }
        self.take_page()?;

        if let Some(cache) = self.cache.as_ref().filter(|_| read_cache) {
            if let Some((entry, body)) = cache.get(url).await {
                debug!(%url, "fetcher: cache hit");
                return Ok(FetchedPage { url: entry.final_url, status: entry.status, body, from_cache: true });
            }
        }

        let codes = self.settings.retry_http_codes.clone();
        let page = (|| self.get_once(url))
            .retry(ExponentialBuilder::default().with_max_times(self.settings.retry_times))
            .sleep(tokio::time::sleep)
            .when(|e: &FetchError| e.is_retryable(&codes))
            .notify(|err: &FetchError, dur: Duration| {
                info!(%url, "Retrying fetch after {:?} due to error: {}", dur, err);
            })
            .await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(url, &page.url, page.status, &page.body).await {
                warn!(%url, error = %e, "fetcher: cache write failed");
            }
        }
        Ok(page)
    }

    /// Submits a form, e.g. the portal login. Never cached or retried.
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<FetchedPage, FetchError> {
        if !self.is_allowed(url) {
            return Err(FetchError::OffSite(url.to_string()));
        }
        self.wait_turn().await;
        let response = self.client.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        if !response.status().is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        let body = response.text().await?;
        Ok(FetchedPage { url: final_url, status, body, from_cache: false })
    }

    /// Downloads a binary resource (PDF, .doc). Outside the page budget,
    /// the delay and the domain filter.
    pub async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::HttpSettings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> HttpSettings {
        let mut s = HttpSettings::legal_defaults();
        s.download_delay = Duration::ZERO;
        s.autothrottle = None;
        s.cache_dir = None;
        s.retry_times = 2;
        s.allowed_domains = vec![Url::parse(&server.uri()).unwrap().host_str().unwrap().to_string()];
        s
    }

    #[tokio::test]
    async fn retries_configured_status_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let fetcher = Fetcher::builder().settings(settings(&server)).build().unwrap();
        let page = fetcher.get_text(&format!("{}/flaky", server.uri())).await.unwrap();
        assert_eq!(page.body, "ok");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = Fetcher::builder().settings(settings(&server)).build().unwrap();
        let err = fetcher.get_text(&format!("{}/missing", server.uri())).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn filters_offsite_and_enforces_budget() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x"))
            .mount(&server)
            .await;

        let mut s = settings(&server);
        s.max_pages = 1;
        let fetcher = Fetcher::builder().settings(s).build().unwrap();

        let offsite = fetcher.get_text("https://example.org/a").await.unwrap_err();
        assert!(matches!(offsite, FetchError::OffSite(_)));

        fetcher.get_text(&format!("{}/a", server.uri())).await.unwrap();
        let over = fetcher.get_text(&format!("{}/b", server.uri())).await.unwrap_err();
        assert!(matches!(over, FetchError::BudgetExhausted(1)));
    }

    #[tokio::test]
    async fn serves_repeat_requests_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("cached"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let mut s = settings(&server);
        s.cache_dir = Some(dir.path().to_string_lossy().to_string());
        let fetcher = Fetcher::builder().settings(s).build().unwrap();

        let url = format!("{}/page", server.uri());
        assert!(!fetcher.get_text(&url).await.unwrap().from_cache);
        let again = fetcher.get_text(&url).await.unwrap();
        assert!(again.from_cache);
        assert_eq!(again.body, "cached");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fresh_fetch_bypasses_and_refreshes_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("wall"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("document"))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let mut s = settings(&server);
        s.cache_dir = Some(dir.path().to_string_lossy().to_string());
        let fetcher = Fetcher::builder().settings(s).build().unwrap();

        let url = format!("{}/page", server.uri());
        assert_eq!(fetcher.get_text(&url).await.unwrap().body, "wall");
        let fresh = fetcher.get_text_fresh(&url).await.unwrap();
        assert!(!fresh.from_cache);
        assert_eq!(fresh.body, "document");

        let cached = fetcher.get_text(&url).await.unwrap();
        assert!(cached.from_cache);
        assert_eq!(cached.body, "document");
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[test]
    fn subdomains_are_allowed() {
        let mut s = HttpSettings::contract_defaults();
        s.cache_dir = None;
        let fetcher = Fetcher::builder().settings(s).build().unwrap();
        assert!(fetcher.is_allowed("https://thuvienphapluat.vn/hopdong"));
        assert!(fetcher.is_allowed("https://files.thuvienphapluat.vn/uploads/a.doc"));
        assert!(!fetcher.is_allowed("https://evilthuvienphapluat.vn/"));
    }
}
