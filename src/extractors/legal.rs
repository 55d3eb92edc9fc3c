use chrono::NaiveDate;
use scraper::Html;
use tracing::{info, warn};

use super::doc_type::{Classification, classify_page};
use super::dom::{self, full_text, own_texts};
use super::text::{extract_keywords, parse_vn_date, parse_vn_long_date, summarize};
use super::url::{join, last_segment, path_part_count};
use crate::models::types::{LegalDocument, NormalizedUrl};

pub const LOGIN_REQUIRED_MARKER: &str = "Bạn vui lòng đăng nhập";
pub const LOGIN_SUCCESS_MARKER: &str = "Đăng nhập thành công";

const INFO_BOX: &str = "div.box-info";
const CENTERED_P: &str = r#"p[align="center"], p[style*="text-align:center"]"#;
const RIGHT_ALIGNED_ITALIC: &str = r#"p[style*="text-align:right"] i, p[align="right"] i"#;
const TITLE_MARKER: &str = "VỀ VIỆC";

const CONTENT_SELECTORS: &[&str] = &[
    "div.content1",
    "div#bodyContent",
    "div.vbContent",
    "div#divContentDoc",
    "div.cldivContentDocVn",
];
const CONTAINER_SELECTOR: &str = "div.container, div.main-content, div#main";
const PDF_LINK_SELECTOR: &str = r#"a[href*=".pdf"]"#;

/// Document links on a list page, tried in order until one yields links.
const LIST_LINK_SELECTORS: &[&str] = &[
    r#"div.vb-item a[href*="/van-ban/"], table.vb-list a[href*="/van-ban/"]"#,
    r#"ul.list-van-ban li a[href*="/van-ban/"]"#,
];
const ANY_DOCUMENT_LINK: &str = r#"a[href*="/van-ban/"]"#;

const NEXT_PAGE_SELECTORS: &[&str] = &[
    "a.next",
    "a.pager-next",
    r#"a[title*="Next"]"#,
    r#"a[rel="next"]"#,
    "a.next-page",
    r#"a[href*="page="]"#,
];

/// Where the body of a document comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentSource {
    /// HTML of a known content container.
    Html { selector: &'static str, html: String },
    /// Only a PDF link was found; the caller downloads and converts it.
    Pdf { url: String, body_html: Option<String> },
    /// Whole `<body>` as the last resort.
    Body(String),
    Missing,
}

/// Everything taken from a detail page. Owns its data so that no DOM is
/// held across an await point.
#[derive(Debug, Clone, PartialEq)]
pub struct LegalPage {
    pub title: String,
    pub document_type: Classification,
    pub document_number: Option<String>,
    pub issuing_body: Option<String>,
    pub version: String,
    pub issued_date: Option<NaiveDate>,
    pub effective_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub content: ContentSource,
}

impl LegalPage {
    /// Builds the record once the body is known. Title and content must
    /// both be present.
    pub fn into_document(self, content: Option<String>, source_url: &NormalizedUrl) -> Option<LegalDocument> {
        let content = content.filter(|c| !c.trim().is_empty())?;
        if self.title.trim().is_empty() {
            return None;
        }
        let keywords = extract_keywords(&self.title);
        Some(
            LegalDocument::builder()
                .title(self.title)
                .document_type(self.document_type.label)
                .maybe_document_number(self.document_number)
                .maybe_issuing_body(self.issuing_body)
                .version(self.version)
                .summary(summarize(&content))
                .content(content)
                .maybe_issued_date(self.issued_date)
                .maybe_effective_date(self.effective_date)
                .maybe_expiry_date(self.expiry_date)
                .language("vi".to_string())
                .source_url(source_url.to_string())
                .keywords(keywords)
                .build(),
        )
    }
}

pub fn requires_login(html: &str) -> bool {
    html.contains(LOGIN_REQUIRED_MARKER)
}

pub fn login_succeeded(html: &str) -> bool {
    html.contains(LOGIN_SUCCESS_MARKER)
}

pub fn extract_legal_page(html: &str, url: &str, debug: bool) -> LegalPage {
    let doc = Html::parse_document(html);

    let document_type = classify_page(&doc, url);
    if debug {
        info!(%url, label = %document_type.label, rule = document_type.rule, "legal: document type");
    }

    let document_number = dom::labeled_value(&doc, INFO_BOX, "Số hiệu");
    let issuing_body = dom::labeled_value(&doc, INFO_BOX, "Cơ quan ban hành");
    let effective_date = meta_date(&doc, "Ngày hiệu lực");
    let expiry_date = dom::labeled_value(&doc, INFO_BOX, "Ngày hết hiệu lực")
        .filter(|v| !v.to_lowercase().contains("còn hiệu lực"))
        .and_then(|v| {
            let parsed = parse_vn_date(&v);
            if parsed.is_none() {
                warn!(value = %v, "legal: invalid expiry date");
            }
            parsed
        });
    let issued_date = meta_date(&doc, "Ngày ban hành").or_else(|| {
        dom::first_own_text(&doc, RIGHT_ALIGNED_ITALIC)
            .or_else(|| dom::first_own_text(&doc, r#"td p[align*="right"] i"#))
            .and_then(|t| parse_vn_long_date(&t))
    });
    let version = dom::first_own_text(&doc, "span.version").unwrap_or_else(|| "1.0".to_string());

    let title = extract_title(&doc, url, document_number.as_deref());
    let content = extract_content(&doc, url);
    if debug {
        info!(%url, %title, content = content_kind(&content), "legal: extracted page");
    }

    LegalPage {
        title,
        document_type,
        document_number,
        issuing_body,
        version,
        issued_date,
        effective_date,
        expiry_date,
        content,
    }
}

fn meta_date(doc: &Html, label: &str) -> Option<NaiveDate> {
    let raw = dom::labeled_value(doc, INFO_BOX, label)?;
    let parsed = parse_vn_date(&raw);
    if parsed.is_none() {
        warn!(label, value = %raw, "legal: invalid date in info box");
    }
    parsed
}

fn extract_title(doc: &Html, url: &str, document_number: Option<&str>) -> String {
    if let Some(t) = dom::first_own_text(doc, "div.box-title h1") {
        return t;
    }

    let centered = dom::select(doc, CENTERED_P);
    if let Some(p) = centered.iter().find(|p| full_text(**p).contains(TITLE_MARKER)) {
        let text = own_texts(*p).into_iter().next().unwrap_or_else(|| full_text(*p));
        if !text.is_empty() {
            return text;
        }
    }

    let marked: Vec<String> = dom::select(doc, "p")
        .into_iter()
        .filter_map(|p| own_texts(p).into_iter().next())
        .filter(|t| t.contains(TITLE_MARKER))
        .collect();
    if !marked.is_empty() {
        return marked.join(" ");
    }

    if let Some(t) = centered
        .iter()
        .flat_map(|p| own_texts(*p))
        .find(|t| t.chars().count() > 30)
    {
        return t;
    }

    let doc_type = dom::labeled_value(doc, INFO_BOX, "Loại văn bản");
    match (document_number, doc_type) {
        (Some(number), Some(kind)) => return format!("{} số {}", kind, number),
        (Some(number), None) => return format!("Văn bản số {}", number),
        _ => {}
    }

    if path_part_count(url) > 2 {
        if let Some(segment) = last_segment(url) {
            return format!("Văn bản: {}", segment.replace('-', " ").replace(".aspx", ""));
        }
    }
    format!("Văn bản pháp luật - {}", url)
}

fn extract_content(doc: &Html, url: &str) -> ContentSource {
    if let Some((selector, html)) = dom::first_html_of(doc, CONTENT_SELECTORS) {
        return ContentSource::Html { selector, html };
    }
    if let Some(html) = dom::first_html(doc, CONTAINER_SELECTOR) {
        return ContentSource::Html { selector: CONTAINER_SELECTOR, html };
    }
    let body_html = dom::first_html(doc, "body");
    if let Some(pdf) = dom::first_attr(doc, PDF_LINK_SELECTOR, "href").and_then(|href| join(url, &href)) {
        return ContentSource::Pdf { url: pdf, body_html };
    }
    match body_html {
        Some(body) => ContentSource::Body(body),
        None => ContentSource::Missing,
    }
}

fn content_kind(content: &ContentSource) -> &'static str {
    match content {
        ContentSource::Html { selector, .. } => *selector,
        ContentSource::Pdf { .. } => "pdf",
        ContentSource::Body(_) => "body",
        ContentSource::Missing => "missing",
    }
}

/// Document links and the next-page link of a list page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegalListPage {
    pub document_links: Vec<String>,
    pub next_page: Option<String>,
}

pub fn extract_legal_list(html: &str, url: &str) -> LegalListPage {
    let doc = Html::parse_document(html);

    let mut hrefs = LIST_LINK_SELECTORS
        .iter()
        .map(|css| dom::all_attrs(&doc, css, "href"))
        .find(|links| !links.is_empty())
        .unwrap_or_default();
    if hrefs.is_empty() {
        hrefs = dom::all_attrs(&doc, ANY_DOCUMENT_LINK, "href")
            .into_iter()
            .filter(|h| !h.contains("tim-van-ban") && !h.contains("dang-nhap"))
            .collect();
    }

    let document_links = hrefs.iter().filter_map(|h| join(url, h)).collect();
    let next_page = NEXT_PAGE_SELECTORS
        .iter()
        .find_map(|css| dom::first_attr(&doc, css, "href"))
        .and_then(|h| join(url, &h));

    LegalListPage { document_links, next_page }
}
