pub mod backend_client;
pub mod fetcher;
pub mod frontier;
pub mod http_cache;
pub mod maintenance;
pub mod memory_store;
pub mod pdf;
pub mod persister;
pub mod pg_store;
