use std::sync::Arc;

use assert_fs::TempDir;
use assert_fs::prelude::*;
use legai::crawlers::build_crawler;
use legai::models::config::load_config;
use legai::models::kinds::CrawlTarget;
use legai::models::types::ScrapedRecord;
use legai::services::memory_store::MemoryDocumentStore;
use legai::services::persister::{PersistOutcome, Persister};
use legai::traits::crawler::Crawler;
use legai::traits::document_store::DocumentStore;
use pretty_assertions::assert_eq;
use serial_test::serial;
use tokio::sync::mpsc;
use wiremock::MockServer;

mod common;

use crate::common::{ConfigParams, mount_contract_portal, render_config};

async fn crawl_once(cfg_path: &std::path::Path, store: Arc<MemoryDocumentStore>) -> (Vec<ScrapedRecord>, u64) {
    let cfg = load_config(cfg_path).unwrap();
    let crawler = build_crawler(CrawlTarget::Contracts, &cfg, store as Arc<dyn DocumentStore>).unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let stats = crawler.crawl(tx).await.unwrap();

    let mut records = Vec::new();
    while let Some(r) = rx.recv().await {
        records.push(r);
    }
    (records, stats.pages_fetched)
}

#[tokio::test]
#[serial]
async fn crawls_templates_and_downloads_files() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_contract_portal(&server).await;

    let documents = TempDir::new().unwrap();
    let cfg_file = render_config(&ConfigParams {
        base: &base,
        jsonl: "",
        documents_dir: documents.path().to_str().unwrap(),
        legal_enabled: false,
        contracts_enabled: true,
        with_login: false,
        max_retry_attempts: 0,
        cache_dir: "",
    });

    let store = Arc::new(MemoryDocumentStore::new());
    let (records, pages) = crawl_once(cfg_file.path(), Arc::clone(&store)).await;
    assert_eq!(pages, 3);
    assert_eq!(records.len(), 2);

    let templates: Vec<_> = records
        .iter()
        .map(|r| match r {
            ScrapedRecord::Contract(t) => t.clone(),
            other => panic!("unexpected record {:?}", other),
        })
        .collect();

    let lease = templates.iter().find(|t| t.title == "Mẫu hợp đồng thuê nhà").unwrap();
    assert_eq!(lease.template_type, "Hợp đồng");
    assert_eq!(lease.update_date.as_deref(), Some("12/03/2024"));
    assert_eq!(lease.keyword_list(), vec!["hợp đồng", "thuê nhà", "nhà ở"]);
    assert_eq!(
        lease.download_url.as_deref(),
        Some(format!("{}/uploads/hopdong/mau-hop-dong-thue-nha.doc", base).as_str())
    );
    assert!(lease.content.contains("HỢP ĐỒNG THUÊ NHÀ"));

    let saved = documents.child("Mẫu_hợp_đồng_thuê_nhà.doc");
    assert_eq!(lease.file_path.as_deref(), Some(saved.path().to_str().unwrap()));
    assert_eq!(std::fs::read(saved.path()).unwrap(), b"DOC-BYTES");

    let application = templates.iter().find(|t| t.title == "Đơn xin việc").unwrap();
    assert_eq!(application.template_type, "Đơn");
    assert_eq!(application.source_url, format!("{}/hopdong/102/don-xin-viec", base), "tracking params are dropped");
    assert_eq!(application.keywords.as_deref(), Some("đơn, việc làm"));
    assert_eq!(
        application.download_url.as_deref(),
        Some(format!("{}/files/ĐƠN%20XIN%20VIỆC.doc", base).as_str())
    );
    assert_eq!(application.file_path, None, "failed download leaves no file path");

    assert_eq!(
        store.url_status(&format!("{}/hopdong/101/mau-hop-dong-thue-nha", base)),
        Some(Some("processing".to_string()))
    );
}

#[tokio::test]
#[serial]
async fn second_crawl_skips_scraped_templates() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_contract_portal(&server).await;

    let documents = TempDir::new().unwrap();
    let cfg_file = render_config(&ConfigParams {
        base: &base,
        jsonl: "",
        documents_dir: documents.path().to_str().unwrap(),
        legal_enabled: false,
        contracts_enabled: true,
        with_login: false,
        max_retry_attempts: 0,
        cache_dir: "",
    });

    let store = Arc::new(MemoryDocumentStore::new());
    let (first, _) = crawl_once(cfg_file.path(), Arc::clone(&store)).await;
    assert_eq!(first.len(), 2);

    let (second, pages) = crawl_once(cfg_file.path(), Arc::clone(&store)).await;
    assert!(second.is_empty());
    assert_eq!(pages, 1, "only the list page is fetched again");
}

#[tokio::test]
#[serial]
async fn persisted_templates_land_in_store_and_jsonl() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_contract_portal(&server).await;

    let work = TempDir::new().unwrap();
    let jsonl = work.child("out/records.jsonl");
    let cfg_file = render_config(&ConfigParams {
        base: &base,
        jsonl: jsonl.path().to_str().unwrap(),
        documents_dir: work.child("docs").path().to_str().unwrap(),
        legal_enabled: false,
        contracts_enabled: true,
        with_login: false,
        max_retry_attempts: 0,
        cache_dir: "",
    });

    let store = Arc::new(MemoryDocumentStore::new());
    let (records, _) = crawl_once(cfg_file.path(), Arc::clone(&store)).await;

    let mut persister = Persister::builder()
        .store(Arc::clone(&store) as Arc<dyn DocumentStore>)
        .jsonl_path(jsonl.path())
        .jsonl_append(false)
        .build()
        .await
        .unwrap();
    for record in &records {
        assert!(matches!(persister.persist(record).await.unwrap(), PersistOutcome::Inserted(_)));
    }
    persister.flush().await;

    let stored = store.templates();
    assert_eq!(stored.len(), 2);
    let lease_content = &stored.iter().find(|(t, _)| t.title == "Mẫu hợp đồng thuê nhà").unwrap().1;
    assert!(lease_content.contains("HỢP ĐỒNG THUÊ NHÀ"));

    let lines = common::read_jsonl(jsonl.path());
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l["kind"] == "contract"));
}
