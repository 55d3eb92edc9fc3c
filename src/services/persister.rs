use std::path::Path;
use std::sync::Arc;

use bon::bon;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::extractors::url::base_url;
use crate::models::types::{ContractTemplate, DocumentId, ScrapedRecord};
use crate::traits::document_store::{DocumentStore, StoreResult};

/// Below this length the scraped HTML is not trusted as template content.
const MIN_TEMPLATE_CONTENT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Inserted(DocumentId),
    Duplicate(DocumentId),
}

/// Writes scraped records to the store and, optionally, a JSON-lines file.
pub struct Persister {
    store: Arc<dyn DocumentStore>,
    save_all: bool,
    jsonl: Option<File>,
}

#[bon]
impl Persister {
    #[builder]
    pub async fn new(
        store: Arc<dyn DocumentStore>,
        save_all: Option<bool>,
        jsonl_path: Option<&Path>,
        jsonl_append: Option<bool>,
    ) -> std::io::Result<Self> {
        let jsonl = match jsonl_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                let append = jsonl_append.unwrap_or(true);
                let file = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .append(append)
                    .truncate(!append)
                    .open(path)
                    .await?;
                info!(path = %path.display(), append, "persist: writing json lines");
                Some(file)
            }
            None => None,
        };
        Ok(Self { store, save_all: save_all.unwrap_or(false), jsonl })
    }
}

impl Persister {
    pub async fn persist(&mut self, record: &ScrapedRecord) -> StoreResult<PersistOutcome> {
        let outcome = match record {
            ScrapedRecord::Legal(doc) => {
                if !self.save_all {
                    let base = base_url(&doc.source_url);
                    if let Some(id) = self.store.find_duplicate_document(&doc.title, doc.issued_date, &base).await? {
                        info!(title = %doc.title, %id, "persist: duplicate document, skipping");
                        return Ok(PersistOutcome::Duplicate(id));
                    }
                }
                let id = self.store.insert_legal_document(doc).await?;
                info!(title = %doc.title, %id, keywords = doc.keywords.len(), "persist: document saved");
                PersistOutcome::Inserted(id)
            }
            ScrapedRecord::Contract(template) => {
                let content = template_content(template);
                let id = self.store.insert_template(template, &content).await?;
                info!(title = %template.title, %id, "persist: template saved");
                PersistOutcome::Inserted(id)
            }
        };

        if let Some(file) = self.jsonl.as_mut() {
            let mut line = serde_json::to_string(record)?;
            line.push('\n');
            if let Err(e) = file.write_all(line.as_bytes()).await {
                warn!(error = %e, "persist: json lines write failed");
            }
        }
        Ok(outcome)
    }

    pub async fn flush(&mut self) {
        if let Some(file) = self.jsonl.as_mut() {
            if let Err(e) = file.flush().await {
                warn!(error = %e, "persist: json lines flush failed");
            }
        }
    }
}

/// Stored template content: the scraped HTML, or the download link (plus the
/// saved file path) when the HTML is too short to be the template itself.
pub fn template_content(template: &ContractTemplate) -> String {
    if template.content.chars().count() >= MIN_TEMPLATE_CONTENT_CHARS {
        return template.content.clone();
    }
    let mut content = template
        .download_url
        .clone()
        .unwrap_or_else(|| template.source_url.clone());
    if let Some(path) = &template.file_path {
        content.push_str(&format!("\nFile đã lưu: {}", path));
    }
    content
}
