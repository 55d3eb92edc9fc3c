//! One-off database maintenance: re-typing untyped documents and a quick
//! inventory of what has been stored.

use std::fmt;

use tracing::{info, warn};

use crate::extractors::doc_type::classify_stored_url;
use crate::models::types::{StoredDocument, TypeCount};
use crate::traits::document_store::{DocumentStore, StoreResult};

#[derive(Debug, Clone, PartialEq)]
pub struct RetypeReport {
    pub before: Vec<TypeCount>,
    pub after: Vec<TypeCount>,
    pub candidates: usize,
    pub updated: usize,
}

/// Re-classifies documents without a type (or with the catch-all type) from
/// their source URL.
pub async fn retype_documents(store: &dyn DocumentStore) -> StoreResult<RetypeReport> {
    let before = store.document_type_counts().await?;
    let candidates = store.documents_missing_type().await?;
    info!(count = candidates.len(), "retype: documents to check");

    let mut updated = 0;
    for doc in &candidates {
        let Some(url) = doc.source_url.as_deref() else { continue };
        let Some(kind) = classify_stored_url(url) else { continue };
        if doc.document_type.as_deref() == Some(kind.as_str()) {
            continue;
        }
        match store.update_document_type(doc.id, kind.as_str()).await {
            Ok(()) => {
                info!(id = %doc.id, label = kind.as_str(), "retype: updated");
                updated += 1;
            }
            Err(e) => warn!(id = %doc.id, error = %e, "retype: update failed"),
        }
    }

    let after = store.document_type_counts().await?;
    Ok(RetypeReport { before, after, candidates: candidates.len(), updated })
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectReport {
    pub tables: Vec<String>,
    pub has_documents_table: bool,
    pub total: i64,
    pub by_type: Vec<TypeCount>,
    pub samples: Vec<StoredDocument>,
}

pub async fn inspect_store(store: &dyn DocumentStore) -> StoreResult<InspectReport> {
    let tables = store.list_tables().await?;
    let has_documents_table = store.has_table("legaldocuments").await?;
    if !has_documents_table {
        return Ok(InspectReport { tables, has_documents_table, total: 0, by_type: vec![], samples: vec![] });
    }
    Ok(InspectReport {
        tables,
        has_documents_table,
        total: store.document_count().await?,
        by_type: store.document_type_counts().await?,
        samples: store.sample_documents(5).await?,
    })
}

fn write_counts(f: &mut fmt::Formatter<'_>, counts: &[TypeCount]) -> fmt::Result {
    for c in counts {
        writeln!(f, "  {}: {}", c.document_type.as_deref().unwrap_or("NULL"), c.count)?;
    }
    Ok(())
}

impl fmt::Display for RetypeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Document types before:")?;
        write_counts(f, &self.before)?;
        writeln!(f, "Checked {} documents, updated {}", self.candidates, self.updated)?;
        writeln!(f, "Document types after:")?;
        write_counts(f, &self.after)
    }
}

impl fmt::Display for InspectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tables: {}", self.tables.join(", "))?;
        if !self.has_documents_table {
            return writeln!(f, "Table legaldocuments does not exist");
        }
        writeln!(f, "Total documents: {}", self.total)?;
        writeln!(f, "By type:")?;
        write_counts(f, &self.by_type)?;
        writeln!(f, "Samples:")?;
        for d in &self.samples {
            writeln!(
                f,
                "  #{} [{}] {} ({})",
                d.id,
                d.document_type.as_deref().unwrap_or("NULL"),
                d.title,
                d.source_url.as_deref().unwrap_or("-")
            )?;
        }
        Ok(())
    }
}
