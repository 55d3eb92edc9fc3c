use bon::{Builder, bon};
use chrono::NaiveDate;
use derive_more::{AsRef, Display, From, FromStr, Into};
use serde::{Deserialize, Serialize};

/// URL after site-specific normalization; the key of the scraped-URL table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into, Display, AsRef, FromStr)]
#[from(String, &str)]
pub struct NormalizedUrl(String);

#[bon]
impl NormalizedUrl {
    #[builder]
    pub fn new(url: String) -> Self {
        Self(url)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Primary key of a stored legal document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into, Display)]
pub struct DocumentId(i32);

impl DocumentId {
    pub fn value(&self) -> i32 {
        self.0
    }
}

/// A legal document extracted from a detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct LegalDocument {
    pub title: String,
    pub document_type: Option<String>,
    pub document_number: Option<String>,
    pub issuing_body: Option<String>,
    pub version: Option<String>,
    pub content: String,
    pub summary: Option<String>,
    pub issued_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub language: String,
    pub source_url: String,
    #[builder(default)]
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// A contract or form template extracted from a detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct ContractTemplate {
    pub title: String,
    pub template_type: String,
    pub content: String,
    pub download_url: Option<String>,
    pub file_path: Option<String>,
    pub keywords: Option<String>,
    pub update_date: Option<String>,
    pub language: String,
    pub source_url: String,
}

impl ContractTemplate {
    /// Keywords as stored on the page ("a, b, c"), split and trimmed.
    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .as_deref()
            .map(|k| {
                k.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Items flowing from the crawler subsystem to the persist subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScrapedRecord {
    Legal(LegalDocument),
    Contract(ContractTemplate),
}

impl ScrapedRecord {
    pub fn title(&self) -> &str {
        match self {
            ScrapedRecord::Legal(d) => &d.title,
            ScrapedRecord::Contract(c) => &c.title,
        }
    }

    pub fn source_url(&self) -> &str {
        match self {
            ScrapedRecord::Legal(d) => &d.source_url,
            ScrapedRecord::Contract(c) => &c.source_url,
        }
    }
}

/// Row summary used by the maintenance commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: DocumentId,
    pub title: String,
    pub document_type: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCount {
    pub document_type: Option<String>,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_normalized_url() {
        let url = NormalizedUrl::from("https://thuvienphapluat.vn/van-ban/a.aspx");
        assert_eq!(url.as_str(), "https://thuvienphapluat.vn/van-ban/a.aspx");
        assert_eq!(url.to_string(), "https://thuvienphapluat.vn/van-ban/a.aspx");

        let parsed = NormalizedUrl::from_str("https://x.vn/hopdong/1").unwrap();
        assert_eq!(parsed.into_inner(), "https://x.vn/hopdong/1");

        let built = NormalizedUrl::builder().url("https://x.vn".to_string()).build();
        assert_eq!(built.as_str(), "https://x.vn");
    }

    #[test]
    fn test_keyword_list_splits_and_trims() {
        let tpl = ContractTemplate::builder()
            .title("Mẫu hợp đồng thuê nhà".to_string())
            .template_type("Hợp đồng".to_string())
            .content(String::new())
            .keywords("hợp đồng,  thuê nhà , ,nhà ở".to_string())
            .language("vi".to_string())
            .source_url("https://x.vn/hopdong/1".to_string())
            .build();
        assert_eq!(tpl.keyword_list(), vec!["hợp đồng", "thuê nhà", "nhà ở"]);
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let record = ScrapedRecord::Contract(
            ContractTemplate::builder()
                .title("Đơn xin việc".to_string())
                .template_type("Đơn".to_string())
                .content("<p>x</p>".to_string())
                .language("vi".to_string())
                .source_url("https://x.vn/hopdong/2".to_string())
                .build(),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "contract");
        assert_eq!(json["template_type"], "Đơn");
        assert_eq!(record.title(), "Đơn xin việc");
    }
}
