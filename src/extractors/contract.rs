use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use super::dom::{self, own_texts};
use super::text::{find_accented_match, has_vietnamese_accent, looks_unaccented_vietnamese, strip_html};
use super::url::{join, last_segment, page_param, with_page};
use crate::models::kinds::TemplateType;
use crate::models::types::ContractTemplate;

static ONCLICK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"window\.open\('([^']+)'\)").unwrap());
static SHORT_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,2}/\d{1,2}/\d{4})").unwrap());
static CONTRACT_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/hopdong/\d+/").unwrap());

const TITLE_SELECTORS: &[&str] = &[
    "h1.detailcom-title",
    ".detailsame-title h1",
    ".detailcom-title-pc",
    "h1.articletitle",
    ".content-detail h1",
    "h1",
];

const ACCENT_META: &str = r#"meta[property="og:title"], meta[name="title"]"#;
const BREADCRUMB_ACTIVE: &str = ".breadcrumb li:last-child, .breadcrumb-item.active";
const BODY_TEXT_SELECTORS: &[&str] = &["div.divTNPL", "div.contract-content", "div#bodyContent", "div.vbContent"];

const CONTENT_SELECTORS: &[&str] = &[
    "div.divTNPL",
    "div.contract-content",
    "div.content1",
    "div#bodyContent",
    "div.vbContent",
    "div.nq_chitiet",
    "div.detail_content",
];
const FOLLOWING_PARAGRAPHS: usize = 20;

const DOWNLOAD_SELECTORS: &[&str] = &[
    "a.download-button",
    r#"a[href*="download"]"#,
    r#"a[href*=".doc"]"#,
    r#"a[href*=".docx"]"#,
    r#"a[href*="uploads"]"#,
    "p b.btaive a",
    ".resource-button a",
];
const DOWNLOAD_ONCLICK: &str = "p b.btaive a";

/// Lower-case title fragments and the template type they imply, in order.
const TITLE_TYPE_RULES: &[(&str, TemplateType)] = &[
    ("hợp đồng", TemplateType::Contract),
    ("mẫu hợp đồng", TemplateType::Contract),
    ("mẫu đơn", TemplateType::Application),
    ("đơn", TemplateType::Application),
    ("biên bản", TemplateType::Minutes),
    ("bản cam kết", TemplateType::Commitment),
    ("cam kết", TemplateType::Commitment),
    ("giấy ủy quyền", TemplateType::PowerOfAttorney),
    ("quyết định", TemplateType::Decision),
    ("thông báo", TemplateType::Notice),
    ("công văn", TemplateType::OfficialLetter),
    ("tờ khai", TemplateType::Declaration),
];

const URL_TYPE_RULES: &[(&str, TemplateType)] = &[
    ("maudon", TemplateType::Application),
    ("bienban", TemplateType::Minutes),
    ("camket", TemplateType::Commitment),
    ("uyquyen", TemplateType::PowerOfAttorney),
    ("hopdong", TemplateType::Contract),
];

const UPDATE_DATE_SELECTORS: &[&str] = &[".detailcom-time", ".news_time", ".fl.ng-scope time"];

/// Extracts a template from a contract detail page. `content` is empty when
/// no body could be located; the persist step decides what to store then.
pub fn extract_contract_page(html: &str, url: &str, files_base_url: &str) -> ContractTemplate {
    let doc = Html::parse_document(html);

    let title = extract_title(&doc, url);
    let content = extract_content(&doc, &title);
    let download_url = extract_download_url(&doc, url, &title, files_base_url);
    let template_type = classify_template(&title, url);

    let keywords = dom::first_attr(&doc, r#"meta[name="keywords"]"#, "content").or_else(|| {
        let tags = dom::all_own_texts(&doc, ".tagbox a");
        (!tags.is_empty()).then(|| tags.join(", "))
    });

    let update_date = UPDATE_DATE_SELECTORS.iter().find_map(|css| {
        let text = dom::first_own_text(&doc, css)?;
        SHORT_DATE_RE.captures(&text).map(|c| c[1].to_string())
    });

    ContractTemplate::builder()
        .title(title)
        .template_type(template_type.as_str().to_string())
        .content(content.unwrap_or_default())
        .maybe_download_url(download_url)
        .maybe_keywords(keywords)
        .maybe_update_date(update_date)
        .language("vi".to_string())
        .source_url(url.to_string())
        .build()
}

fn extract_title(doc: &Html, url: &str) -> String {
    let found = TITLE_SELECTORS
        .iter()
        .find_map(|css| dom::first_own_text(doc, css));
    match found {
        Some(title) => restore_accents(doc, title),
        None => {
            let from_url = last_segment(url)
                .map(|s| s.replace('-', " ").replace(".aspx", ""))
                .unwrap_or_default();
            restore_accents(doc, from_url)
        }
    }
}

/// Titles are sometimes rendered without diacritics; the page usually
/// carries the accented form elsewhere.
fn restore_accents(doc: &Html, title: String) -> String {
    if title.is_empty() || has_vietnamese_accent(&title) || !looks_unaccented_vietnamese(&title) {
        return title;
    }

    let candidates = dom::all_attrs(doc, ACCENT_META, "content")
        .into_iter()
        .chain(dom::all_own_texts(doc, BREADCRUMB_ACTIVE));
    for candidate in candidates {
        if has_vietnamese_accent(&candidate) {
            return candidate;
        }
    }

    if let Some((_, body)) = dom::first_html_of(doc, BODY_TEXT_SELECTORS) {
        if let Some(accented) = find_accented_match(&strip_html(&body), &title) {
            return accented;
        }
    }
    title
}

fn extract_content(doc: &Html, title: &str) -> Option<String> {
    if let Some((_, html)) = dom::first_html_of(doc, CONTENT_SELECTORS) {
        return Some(html);
    }

    if !title.is_empty() {
        let heading_div = dom::select(doc, "h1")
            .into_iter()
            .filter(|h1| own_texts(*h1).iter().any(|t| t.contains(title)))
            .find_map(|h1| h1.ancestors().filter_map(ElementRef::wrap).find(|a| a.value().name() == "div"));
        if let Some(div) = heading_div {
            return Some(div.html());
        }
    }

    if let Some(html) = paragraphs_after_first_heading(doc) {
        return Some(html);
    }

    dom::first_html(doc, "div.container").or_else(|| dom::first_html(doc, "body"))
}

/// Outer HTML of the paragraphs that follow the first `h1` in document order.
fn paragraphs_after_first_heading(doc: &Html) -> Option<String> {
    let h1 = dom::select(doc, "h1").into_iter().next()?;
    let mut seen_heading = false;
    let mut parts = Vec::new();
    for node in doc.root_element().descendants() {
        if node.id() == h1.id() {
            seen_heading = true;
            continue;
        }
        if !seen_heading {
            continue;
        }
        let Some(el) = ElementRef::wrap(node) else { continue };
        if el.value().name() != "p" || el.ancestors().any(|a| a.id() == h1.id()) {
            continue;
        }
        parts.push(el.html());
        if parts.len() == FOLLOWING_PARAGRAPHS {
            break;
        }
    }
    (!parts.is_empty()).then(|| parts.concat())
}

fn extract_download_url(doc: &Html, url: &str, title: &str, files_base_url: &str) -> Option<String> {
    let href = DOWNLOAD_SELECTORS
        .iter()
        .find_map(|css| dom::first_attr(doc, css, "href"))
        .filter(|h| !h.starts_with("javascript:"))
        .and_then(|h| join(url, &h));
    if href.is_some() {
        return href;
    }

    let from_onclick = dom::first_attr(doc, DOWNLOAD_ONCLICK, "onclick")
        .and_then(|js| ONCLICK_RE.captures(&js).map(|c| c[1].to_string()))
        .and_then(|target| join(url, &target));
    if from_onclick.is_some() {
        return from_onclick;
    }

    if title.is_empty() {
        return None;
    }
    Some(format!(
        "{}/{}.doc",
        files_base_url.trim_end_matches('/'),
        title.to_uppercase().replace(' ', "%20")
    ))
}

/// Template type from the title, then the URL, defaulting to a contract.
pub fn classify_template(title: &str, url: &str) -> TemplateType {
    let title_lower = title.to_lowercase();
    if let Some((_, kind)) = TITLE_TYPE_RULES.iter().find(|(key, _)| title_lower.contains(key)) {
        return *kind;
    }
    let url_lower = url.to_lowercase();
    URL_TYPE_RULES
        .iter()
        .find(|(word, _)| url_lower.contains(word))
        .map(|(_, kind)| *kind)
        .unwrap_or(TemplateType::Contract)
}

/// Detail links and pagination of a contract list page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContractListPage {
    pub detail_links: Vec<String>,
    pub next_pages: Vec<String>,
}

/// `page_limit` bounds the next-page links derived from the current page
/// number; explicit pager links are followed as they are.
pub fn extract_contract_list(html: &str, url: &str, page_limit: u32) -> ContractListPage {
    let doc = Html::parse_document(html);

    let mut hrefs = dom::all_attrs(&doc, "a.news_title, a.link_blue_under", "href");
    if hrefs.is_empty() {
        hrefs = dom::all_attrs(&doc, r#"div.content-list a[href*="/hopdong/"]"#, "href");
    }
    if hrefs.is_empty() {
        hrefs = dom::all_attrs(&doc, r#"a[href*="/hopdong/"]"#, "href")
            .into_iter()
            .filter(|h| CONTRACT_ID_RE.is_match(h))
            .collect();
    }
    let detail_links = hrefs.iter().filter_map(|h| join(url, h)).collect();

    let current = page_param(url).unwrap_or(1);
    let pager: Vec<String> = dom::all_attrs(&doc, "div.pager a", "href")
        .into_iter()
        .filter(|h| h.contains("page="))
        .filter_map(|h| join(url, &h))
        .collect();

    let next_pages = if !pager.is_empty() {
        pager
    } else if let Some(next) = dom::first_attr(&doc, r#"a.next, a[rel="next"]"#, "href") {
        if current < page_limit {
            join(url, &next).into_iter().collect()
        } else {
            Vec::new()
        }
    } else if current < page_limit {
        vec![next_page_url(url, current + 1)]
    } else {
        Vec::new()
    };

    ContractListPage { detail_links, next_pages }
}

fn next_page_url(url: &str, page: u32) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            let kept: Vec<(String, String)> = parsed
                .query_pairs()
                .filter(|(k, _)| k != "page")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            parsed.set_fragment(None);
            parsed
                .query_pairs_mut()
                .clear()
                .extend_pairs(kept.iter())
                .append_pair("page", &page.to_string());
            parsed.to_string()
        }
        Err(_) => with_page(url, page),
    }
}
