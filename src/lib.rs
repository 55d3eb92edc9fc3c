pub mod actions;
pub mod crawlers;
pub mod extractors;
pub mod models;
pub mod services;
pub mod subsystems;
pub mod traits;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_graceful_shutdown::{SubsystemBuilder, Toplevel};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

use crate::actions::replies::Replies;
use crate::actions::server::ActionServerState;
use crate::actions::{ActionContext, ActionRegistry};
use crate::crawlers::build_crawler;
use crate::models::config::{AppConfig, LoggingConfig, load_config};
use crate::models::kinds::CrawlTarget;
use crate::services::backend_client::HttpBackendApi;
use crate::services::maintenance::{inspect_store, retype_documents};
use crate::services::memory_store::MemoryDocumentStore;
use crate::services::persister::Persister;
use crate::services::pg_store::PgDocumentStore;
use crate::subsystems::{ActionServerSubsystem, CrawlerSubsystem, PersistSubsystem};
use crate::traits::document_store::DocumentStore;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

const DEFAULT_BIND: &str = "0.0.0.0:5055";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const RECORD_CHANNEL_CAPACITY: usize = 100;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Crawl the given targets; an empty list means every enabled target.
    Crawl(Vec<CrawlTarget>),
    Serve,
    Retype,
    Inspect,
}

fn io_err(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

/// Installs the global subscriber. The returned guard flushes the log file
/// and must live as long as the program.
pub fn init_logging(cfg: Option<&LoggingConfig>) -> Option<WorkerGuard> {
    let log_spec = std::env::var("RUST_LOG")
        .ok()
        .or_else(|| cfg.and_then(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let json = cfg.and_then(|l| l.json).unwrap_or(false);

    let (writer, guard) = match cfg.and_then(|l| l.file_dir.as_deref()) {
        Some(dir) => {
            let prefix = cfg.and_then(|l| l.file_prefix.as_deref()).unwrap_or("legai.log");
            let (file, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, prefix));
            (BoxMakeWriter::new(std::io::stdout.and(file)), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_spec))
        .with_target(false)
        .with_writer(writer);
    let _ = if json { builder.json().try_init() } else { builder.compact().try_init() };
    guard
}

/// High-level entrypoint: load config, init logging, run the command.
pub async fn run_with_config_path(path: &str, command: Command) -> std::io::Result<()> {
    let cfg: AppConfig =
        load_config(path).map_err(|e| io_err(format!("Failed to load {}: {}", path, e)))?;
    let _guard = init_logging(cfg.logging.as_ref());
    info!(config = %path, ?command, "legai starting");

    match command {
        Command::Crawl(targets) => run_crawl(cfg, targets).await,
        Command::Serve => run_action_server(cfg).await,
        Command::Retype => {
            let store = require_database(&cfg).await?;
            let report = retype_documents(store.as_ref()).await.map_err(io_err)?;
            println!("{}", report);
            Ok(())
        }
        Command::Inspect => {
            let store = require_database(&cfg).await?;
            let report = inspect_store(store.as_ref()).await.map_err(io_err)?;
            println!("{}", report);
            Ok(())
        }
    }
}

async fn connect_database(cfg: &AppConfig, url: &str) -> Result<PgDocumentStore, BoxedError> {
    let db = cfg.database.clone().unwrap_or_default();
    PgDocumentStore::connect()
        .url(url)
        .maybe_max_connections(db.max_connections)
        .maybe_acquire_timeout(db.acquire_timeout_secs.map(Duration::from_secs))
        .maybe_run_migrations(db.run_migrations)
        .call()
        .await
}

/// Postgres when configured and reachable, otherwise an in-memory store.
pub async fn open_store(cfg: &AppConfig) -> Arc<dyn DocumentStore> {
    let Some(url) = cfg.database_url() else {
        warn!("store: no database configured, records are kept in memory only");
        return Arc::new(MemoryDocumentStore::new());
    };
    match connect_database(cfg, &url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, "store: database unavailable, falling back to memory");
            Arc::new(MemoryDocumentStore::new())
        }
    }
}

async fn require_database(cfg: &AppConfig) -> std::io::Result<Arc<dyn DocumentStore>> {
    let url = cfg
        .database_url()
        .ok_or_else(|| io_err("database.url (or DATABASE_URL) is required for this command"))?;
    let store = connect_database(cfg, &url).await.map_err(io_err)?;
    Ok(Arc::new(store))
}

async fn run_crawl(cfg: AppConfig, targets: Vec<CrawlTarget>) -> std::io::Result<()> {
    let targets = if targets.is_empty() { crawlers::enabled_targets(&cfg) } else { targets };
    if targets.is_empty() {
        warn!("crawl: no target enabled");
        return Ok(());
    }

    let store = open_store(&cfg).await;
    let output = cfg.output.clone().unwrap_or_default();
    let persister = Persister::builder()
        .store(Arc::clone(&store))
        .maybe_save_all(cfg.legal.as_ref().and_then(|l| l.save_all))
        .maybe_jsonl_path(output.jsonl_path.as_deref().map(Path::new))
        .maybe_jsonl_append(output.jsonl_append)
        .build()
        .await?;

    let mut crawler_subsystems = Vec::new();
    let (tx, rx) = mpsc::channel(RECORD_CHANNEL_CAPACITY);
    for target in targets {
        let crawler = build_crawler(target, &cfg, Arc::clone(&store)).map_err(io_err)?;
        let subsystem = CrawlerSubsystem::builder()
            .crawler(crawler)
            .sender(tx.clone())
            .max_retry_attempts(cfg.max_retry_attempts(target))
            .build();
        crawler_subsystems.push((target, subsystem));
    }
    drop(tx);
    let persist = PersistSubsystem::builder().persister(persister).receiver(rx).build();

    Toplevel::<BoxedError>::new(move |s| async move {
        for (target, subsystem) in crawler_subsystems {
            s.start(SubsystemBuilder::new(target.as_str(), move |h| subsystem.run(h)));
        }
        s.start(SubsystemBuilder::new("persister", move |h| persist.run(h)));
    })
    .catch_signals()
    .handle_shutdown_requests(SHUTDOWN_TIMEOUT)
    .await
    .map_err(io_err)
}

async fn run_action_server(cfg: AppConfig) -> std::io::Result<()> {
    let actions_cfg = cfg.actions.clone().unwrap_or_default();
    let api = HttpBackendApi::builder()
        .base_url(cfg.api_url())
        .maybe_timeout(actions_cfg.request_timeout_secs.map(Duration::from_secs))
        .build()
        .map_err(io_err)?;
    let replies = Replies::new(actions_cfg.templates.as_ref()).map_err(io_err)?;
    info!(api = %cfg.api_url(), "actions: backend api configured");

    let server = ActionServerSubsystem::builder()
        .bind(actions_cfg.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()))
        .state(ActionServerState {
            registry: Arc::new(ActionRegistry::with_default_actions()),
            context: Arc::new(ActionContext { api: Arc::new(api), replies }),
        })
        .build();

    Toplevel::<BoxedError>::new(move |s| async move {
        s.start(SubsystemBuilder::new("action-server", move |h| server.run(h)));
    })
    .catch_signals()
    .handle_shutdown_requests(SHUTDOWN_TIMEOUT)
    .await
    .map_err(io_err)
}
