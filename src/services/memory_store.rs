use std::sync::atomic::{AtomicI32, Ordering};

use ahash::AHashMap;
use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;

use crate::models::kinds::DocumentType;
use crate::models::types::{ContractTemplate, DocumentId, LegalDocument, StoredDocument, TypeCount};
use crate::traits::document_store::{DocumentStore, StoreResult};

/// In-process store used when no database is configured.
#[derive(Default)]
pub struct MemoryDocumentStore {
    urls: DashMap<String, Option<String>>,
    documents: DashMap<i32, LegalDocument>,
    templates: DashMap<i32, (ContractTemplate, String)>,
    next_id: AtomicI32,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> i32 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn url_status(&self, url: &str) -> Option<Option<String>> {
        self.urls.get(url).map(|s| s.value().clone())
    }

    pub fn legal_documents(&self) -> Vec<LegalDocument> {
        let mut ids: Vec<i32> = self.documents.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.documents.get(&id).map(|d| d.value().clone()))
            .collect()
    }

    pub fn templates(&self) -> Vec<(ContractTemplate, String)> {
        let mut ids: Vec<i32> = self.templates.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(|id| self.templates.get(&id).map(|t| t.value().clone()))
            .collect()
    }

    fn stored(id: i32, doc: &LegalDocument) -> StoredDocument {
        StoredDocument {
            id: DocumentId::from(id),
            title: doc.title.clone(),
            document_type: doc.document_type.clone(),
            source_url: Some(doc.source_url.clone()),
        }
    }

    fn sorted_documents(&self) -> Vec<StoredDocument> {
        let mut rows: Vec<StoredDocument> = self
            .documents
            .iter()
            .map(|e| Self::stored(*e.key(), e.value()))
            .collect();
        rows.sort_by_key(|r| r.id.value());
        rows
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn is_url_scraped(&self, url: &str) -> StoreResult<bool> {
        Ok(self.urls.contains_key(url))
    }

    async fn mark_url_scraped(&self, url: &str, status: Option<&str>) -> StoreResult<()> {
        self.urls
            .entry(url.to_string())
            .or_insert_with(|| status.map(str::to_string));
        Ok(())
    }

    async fn find_duplicate_document(
        &self,
        title: &str,
        issued_date: Option<NaiveDate>,
        base_url: &str,
    ) -> StoreResult<Option<DocumentId>> {
        let rows = self.sorted_documents();
        if issued_date.is_some() {
            let by_title = rows.iter().find(|r| {
                r.title == title
                    && self
                        .documents
                        .get(&r.id.value())
                        .map(|d| d.issued_date == issued_date)
                        .unwrap_or(false)
            });
            return Ok(by_title.map(|r| r.id));
        }
        Ok(rows
            .iter()
            .find(|r| r.source_url.as_deref().is_some_and(|u| u.starts_with(base_url)))
            .map(|r| r.id))
    }

    async fn insert_legal_document(&self, doc: &LegalDocument) -> StoreResult<DocumentId> {
        let id = self.next_id();
        let mut doc = doc.clone();
        let mut seen = ahash::AHashSet::new();
        doc.keywords.retain(|k| seen.insert(k.clone()));
        self.documents.insert(id, doc);
        Ok(DocumentId::from(id))
    }

    async fn insert_template(&self, template: &ContractTemplate, content: &str) -> StoreResult<DocumentId> {
        let id = self.next_id();
        self.templates.insert(id, (template.clone(), content.to_string()));
        Ok(DocumentId::from(id))
    }

    async fn documents_missing_type(&self) -> StoreResult<Vec<StoredDocument>> {
        let other = DocumentType::Other.as_str();
        Ok(self
            .sorted_documents()
            .into_iter()
            .filter(|r| match r.document_type.as_deref() {
                None | Some("") => true,
                Some(t) => t == other,
            })
            .collect())
    }

    async fn update_document_type(&self, id: DocumentId, label: &str) -> StoreResult<()> {
        if let Some(mut doc) = self.documents.get_mut(&id.value()) {
            doc.document_type = Some(label.to_string());
        }
        Ok(())
    }

    async fn document_type_counts(&self) -> StoreResult<Vec<TypeCount>> {
        let mut counts: AHashMap<Option<String>, i64> = AHashMap::new();
        for e in self.documents.iter() {
            *counts.entry(e.value().document_type.clone()).or_default() += 1;
        }
        let mut rows: Vec<TypeCount> = counts
            .into_iter()
            .map(|(document_type, count)| TypeCount { document_type, count })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.document_type.cmp(&b.document_type)));
        Ok(rows)
    }

    async fn document_count(&self) -> StoreResult<i64> {
        Ok(self.documents.len() as i64)
    }

    async fn sample_documents(&self, limit: i64) -> StoreResult<Vec<StoredDocument>> {
        Ok(self
            .sorted_documents()
            .into_iter()
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        Ok(["documenttemplates", "legaldocuments", "legalkeywords", "scrapedurls"]
            .iter()
            .map(|t| t.to_string())
            .collect())
    }
}
