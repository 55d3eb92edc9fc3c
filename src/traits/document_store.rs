use async_trait::async_trait;
use chrono::NaiveDate;
use std::error::Error;

use crate::models::types::{ContractTemplate, DocumentId, LegalDocument, StoredDocument, TypeCount};

pub type StoreResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Persistence of scraped documents and of the scraped-URL ledger.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn is_url_scraped(&self, url: &str) -> StoreResult<bool>;

    /// Records `url` as scraped. Marking an already known URL is a no-op.
    async fn mark_url_scraped(&self, url: &str, status: Option<&str>) -> StoreResult<()>;

    /// Id of a stored document with the same title and issue date. Without an
    /// issue date, of one whose source URL starts with `base_url`.
    async fn find_duplicate_document(
        &self,
        title: &str,
        issued_date: Option<NaiveDate>,
        base_url: &str,
    ) -> StoreResult<Option<DocumentId>>;

    /// Stores the document and its keywords atomically.
    async fn insert_legal_document(&self, doc: &LegalDocument) -> StoreResult<DocumentId>;

    async fn insert_template(&self, template: &ContractTemplate, content: &str) -> StoreResult<DocumentId>;

    async fn documents_missing_type(&self) -> StoreResult<Vec<StoredDocument>>;

    async fn update_document_type(&self, id: DocumentId, label: &str) -> StoreResult<()>;

    async fn document_type_counts(&self) -> StoreResult<Vec<TypeCount>>;

    async fn document_count(&self) -> StoreResult<i64>;

    async fn sample_documents(&self, limit: i64) -> StoreResult<Vec<StoredDocument>>;

    async fn list_tables(&self) -> StoreResult<Vec<String>>;

    async fn has_table(&self, name: &str) -> StoreResult<bool> {
        Ok(self.list_tables().await?.iter().any(|t| t == name))
    }
}
