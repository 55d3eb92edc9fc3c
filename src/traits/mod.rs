pub mod backend_api;
pub mod crawler;
pub mod document_store;
