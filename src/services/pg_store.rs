use std::time::Duration;

use async_trait::async_trait;
use bon::bon;
use chrono::NaiveDate;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::models::types::{ContractTemplate, DocumentId, LegalDocument, StoredDocument, TypeCount};
use crate::traits::document_store::{DocumentStore, StoreResult};

const KEYWORD_MAX_CHARS: usize = 100;

#[derive(sqlx::FromRow)]
struct StoredDocumentRow {
    id: i32,
    title: String,
    document_type: Option<String>,
    source_url: Option<String>,
}

impl From<StoredDocumentRow> for StoredDocument {
    fn from(r: StoredDocumentRow) -> Self {
        StoredDocument {
            id: DocumentId::from(r.id),
            title: r.title,
            document_type: r.document_type,
            source_url: r.source_url,
        }
    }
}

/// Postgres-backed store.
pub struct PgDocumentStore {
    pool: PgPool,
}

#[bon]
impl PgDocumentStore {
    /// Connects and, unless disabled, applies the embedded migrations.
    #[builder]
    pub async fn connect(
        url: &str,
        max_connections: Option<u32>,
        acquire_timeout: Option<Duration>,
        run_migrations: Option<bool>,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.unwrap_or(5))
            .acquire_timeout(acquire_timeout.unwrap_or(Duration::from_secs(5)))
            .connect(url)
            .await?;
        info!("store: connected to postgres");

        if run_migrations.unwrap_or(true) {
            match sqlx::migrate!("./migrations").run(&pool).await {
                Ok(()) => info!("store: migrations applied"),
                Err(e) => warn!(error = %e, "store: migrations failed"),
            }
        }
        Ok(Self { pool })
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn is_url_scraped(&self, url: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scrapedurls WHERE url = $1")
            .bind(url)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn mark_url_scraped(&self, url: &str, status: Option<&str>) -> StoreResult<()> {
        sqlx::query("INSERT INTO scrapedurls (url, status) VALUES ($1, $2) ON CONFLICT (url) DO NOTHING")
            .bind(url)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_duplicate_document(
        &self,
        title: &str,
        issued_date: Option<NaiveDate>,
        base_url: &str,
    ) -> StoreResult<Option<DocumentId>> {
        if let Some(date) = issued_date {
            let id: Option<i32> =
                sqlx::query_scalar("SELECT id FROM legaldocuments WHERE title = $1 AND issued_date = $2 LIMIT 1")
                    .bind(title)
                    .bind(date)
                    .fetch_optional(&self.pool)
                    .await?;
            return Ok(id.map(DocumentId::from));
        }
        let id: Option<i32> = sqlx::query_scalar("SELECT id FROM legaldocuments WHERE source_url LIKE $1 LIMIT 1")
            .bind(format!("{}%", base_url))
            .fetch_optional(&self.pool)
            .await?;
        Ok(id.map(DocumentId::from))
    }

    async fn insert_legal_document(&self, doc: &LegalDocument) -> StoreResult<DocumentId> {
        let mut tx = self.pool.begin().await?;
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO legaldocuments (title, document_type, document_number, issuing_body, version, \
             content, summary, issued_date, effective_date, expiry_date, language, source_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) RETURNING id",
        )
        .bind(&doc.title)
        .bind(&doc.document_type)
        .bind(&doc.document_number)
        .bind(&doc.issuing_body)
        .bind(&doc.version)
        .bind(&doc.content)
        .bind(&doc.summary)
        .bind(doc.issued_date)
        .bind(doc.effective_date)
        .bind(doc.expiry_date)
        .bind(&doc.language)
        .bind(&doc.source_url)
        .fetch_one(&mut *tx)
        .await?;

        for keyword in &doc.keywords {
            let keyword: String = keyword.chars().take(KEYWORD_MAX_CHARS).collect();
            sqlx::query(
                "INSERT INTO legalkeywords (document_id, keyword) VALUES ($1, $2) \
                 ON CONFLICT (document_id, keyword) DO NOTHING",
            )
            .bind(id)
            .bind(keyword)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(DocumentId::from(id))
    }

    async fn insert_template(&self, template: &ContractTemplate, content: &str) -> StoreResult<DocumentId> {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO documenttemplates (title, template_type, content, language) VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&template.title)
        .bind(&template.template_type)
        .bind(content)
        .bind(&template.language)
        .fetch_one(&self.pool)
        .await?;
        Ok(DocumentId::from(id))
    }

    async fn documents_missing_type(&self) -> StoreResult<Vec<StoredDocument>> {
        let rows = sqlx::query_as::<_, StoredDocumentRow>(
            "SELECT id, title, document_type, source_url FROM legaldocuments \
             WHERE document_type IS NULL OR document_type = '' OR document_type = 'VĂN BẢN KHÁC' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn update_document_type(&self, id: DocumentId, label: &str) -> StoreResult<()> {
        sqlx::query("UPDATE legaldocuments SET document_type = $1 WHERE id = $2")
            .bind(label)
            .bind(id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn document_type_counts(&self) -> StoreResult<Vec<TypeCount>> {
        let rows: Vec<(Option<String>, i64)> = sqlx::query_as(
            "SELECT document_type, COUNT(*) FROM legaldocuments GROUP BY document_type ORDER BY COUNT(*) DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(document_type, count)| TypeCount { document_type, count })
            .collect())
    }

    async fn document_count(&self) -> StoreResult<i64> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM legaldocuments")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn sample_documents(&self, limit: i64) -> StoreResult<Vec<StoredDocument>> {
        let rows = sqlx::query_as::<_, StoredDocumentRow>(
            "SELECT id, title, document_type, source_url FROM legaldocuments ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        Ok(sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables WHERE table_schema = 'public' ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?)
    }
}
