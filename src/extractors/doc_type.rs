//! Legal document type inference.
//!
//! Rules are tried strictly in order and the first hit wins. URL rules work
//! on the whole lower-cased URL, host included, so the bare `luat` path rule
//! also fires on the portal host. Page rules work on the parsed detail page.

use scraper::Html;

use super::dom::{self, full_text, own_texts};
use crate::models::kinds::DocumentType;

/// File-name fragments, e.g. `/nghi-dinh-15-2024-nd-cp.aspx`.
const FILENAME_RULES: &[(&str, &str, DocumentType)] = &[
    ("/luat-", "-l-", DocumentType::Law),
    ("/nghi-quyet-", "-nq-", DocumentType::Resolution),
    ("/nghi-dinh-", "-nd-", DocumentType::Decree),
    ("/thong-tu-", "-tt-", DocumentType::Circular),
    ("/quyet-dinh-", "-qd-", DocumentType::Decision),
    ("/chi-thi-", "-ct-", DocumentType::Directive),
    ("/cong-van-", "-cv-", DocumentType::OfficialLetter),
    ("/thong-bao-", "-tb-", DocumentType::Notice),
];

/// Document number codes, e.g. `15/2024/NĐ-CP` slugged as `15-2024-nd-cp`.
const CODE_RULES: &[(&str, DocumentType)] = &[
    ("nq-", DocumentType::Resolution),
    ("nd-", DocumentType::Decree),
    ("tt-", DocumentType::Circular),
    ("qd-", DocumentType::Decision),
    ("ct-", DocumentType::Directive),
    ("cv-", DocumentType::OfficialLetter),
    ("tb-", DocumentType::Notice),
];

const PATH_RULES: &[(&str, DocumentType)] = &[
    ("nghi-quyet", DocumentType::Resolution),
    ("nghi-dinh", DocumentType::Decree),
    ("thong-tu", DocumentType::Circular),
    ("quyet-dinh", DocumentType::Decision),
    ("chi-thi", DocumentType::Directive),
    ("cong-van", DocumentType::OfficialLetter),
    ("thong-bao", DocumentType::Notice),
];

const MAJOR_KIND_WORDS: &[&str] = &["nghi-dinh", "thong-tu", "quyet-dinh", "nghi-quyet"];

const CENTERED_P: &[&str] = &[r#"p[align="center"]"#, r#"p[style*="text-align:center"]"#];

const LEAD_PARAGRAPHS: &str = "div.content1 p, div#bodyContent p, div.vbContent p";

const DISPATCH_SELECTORS: &[&str] = &[
    r#"p[align="center"] b span"#,
    r#"p[style*="text-align:center"] b span"#,
    r#"p[align="center"] b"#,
    r#"p[style*="text-align:center"] b"#,
];

/// Outcome of page classification: the stored label and the rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: String,
    pub rule: &'static str,
}

impl Classification {
    fn of(kind: DocumentType, rule: &'static str) -> Self {
        Self { label: kind.as_str().to_string(), rule }
    }
}

fn url_key(url: &str) -> String {
    url.to_lowercase()
}

fn by_filename(url_lower: &str, include_law: bool) -> Option<DocumentType> {
    FILENAME_RULES
        .iter()
        .filter(|(_, _, kind)| include_law || *kind != DocumentType::Law)
        .find(|(slug, code, _)| url_lower.contains(slug) || url_lower.contains(code))
        .map(|(_, _, kind)| *kind)
}

fn by_code(url_lower: &str) -> Option<DocumentType> {
    CODE_RULES
        .iter()
        .find(|(code, _)| url_lower.contains(code))
        .map(|(_, kind)| *kind)
}

fn by_path(url_lower: &str) -> Option<DocumentType> {
    if let Some((_, kind)) = PATH_RULES.iter().find(|(word, _)| url_lower.contains(word)) {
        return Some(*kind);
    }
    if url_lower.contains("luat") && !MAJOR_KIND_WORDS.iter().any(|w| url_lower.contains(w)) {
        return Some(DocumentType::Law);
    }
    None
}

/// First dictionary kind whose keyword occurs in `text`, ignoring case.
pub fn match_keyword(text: &str) -> Option<DocumentType> {
    let lower = text.to_lowercase();
    DocumentType::all()
        .into_iter()
        .find(|kind| lower.contains(&kind.keyword().to_lowercase()))
}

/// Type of an already stored document, judged by its source URL alone.
/// The file-name tier leaves laws to the path tier.
pub fn classify_stored_url(url: &str) -> Option<DocumentType> {
    let lower = url_key(url);
    by_filename(&lower, false)
        .or_else(|| by_code(&lower))
        .or_else(|| by_path(&lower))
}

/// Full cascade over a detail page.
pub fn classify_page(doc: &Html, url: &str) -> Classification {
    let lower = url_key(url);

    if let Some(kind) = by_filename(&lower, true) {
        return Classification::of(kind, "url file name");
    }
    if let Some(kind) = by_code(&lower) {
        return Classification::of(kind, "url code");
    }

    if let Some(meta) = dom::labeled_value(doc, "div.box-info", "Loại văn bản") {
        return match match_keyword(&meta) {
            Some(kind) => Classification::of(kind, "meta"),
            None => Classification { label: meta.to_uppercase(), rule: "meta verbatim" },
        };
    }

    if let Some(title) = dom::first_own_text(doc, "div.box-title h1") {
        let upper = title.to_uppercase();
        if let Some(kind) = DocumentType::all()
            .into_iter()
            .find(|k| upper.contains(&k.keyword().to_uppercase()))
        {
            return Classification::of(kind, "title");
        }
    }

    let lead: Vec<String> = dom::all_own_texts(doc, LEAD_PARAGRAPHS).into_iter().take(10).collect();
    for kind in DocumentType::all() {
        let key = kind.keyword();
        if centered_mentions(doc, key) {
            return Classification::of(kind, "centered text");
        }
        if bold_or_span_mentions(doc, key) {
            return Classification::of(kind, "b/span text");
        }
        let key_upper = key.to_uppercase();
        if lead.iter().any(|p| p.to_uppercase().contains(&key_upper)) {
            return Classification::of(kind, "lead paragraph");
        }
    }

    let is_dispatch = DISPATCH_SELECTORS.iter().any(|css| {
        dom::select(doc, css)
            .into_iter()
            .flat_map(own_texts)
            .any(|t| t.to_uppercase().contains("CÔNG ĐIỆN"))
    });
    if is_dispatch {
        return Classification::of(DocumentType::Dispatch, "dispatch heading");
    }

    let body = dom::first_html(doc, "div.content1")
        .or_else(|| dom::first_html(doc, "div#bodyContent"))
        .or_else(|| dom::first_html(doc, "div.vbContent"));
    if let Some(kind) = body.as_deref().and_then(match_keyword) {
        return Classification::of(kind, "content html");
    }

    if let Some(kind) = by_path(&lower) {
        return Classification::of(kind, "url path");
    }
    Classification::of(DocumentType::Other, "default")
}

fn centered_mentions(doc: &Html, key: &str) -> bool {
    CENTERED_P.iter().any(|css| {
        dom::select(doc, &format!("{} *", css))
            .into_iter()
            .any(|el| full_text(el).contains(key) && !own_texts(el).is_empty())
    })
}

fn bold_or_span_mentions(doc: &Html, key: &str) -> bool {
    dom::select(doc, "b, span")
        .into_iter()
        .any(|el| own_texts(el).iter().any(|t| t.contains(key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><body>{}</body></html>", body))
    }

    #[rstest]
    #[case("https://thuvienphapluat.vn/van-ban/Thue/Thong-tu-12-2024-TT-BTC-601234.aspx", "THÔNG TƯ", "url file name")]
    #[case("https://thuvienphapluat.vn/van-ban/Bo-may/Nghi-quyet-103-NQ-CP-2025-650001.aspx", "NGHỊ QUYẾT", "url file name")]
    #[case("https://thuvienphapluat.vn/van-ban/Dat-dai/Luat-Dat-dai-2024-31-2024-QH15-523642.aspx", "LUẬT", "url file name")]
    #[case("http://127.0.0.1/van-ban/x/so-15nd-cp.aspx", "NGHỊ ĐỊNH", "url code")]
    fn url_rules_win_over_page(#[case] url: &str, #[case] label: &str, #[case] rule: &str) {
        let doc = page(r#"<div class="box-info"><span>Loại văn bản</span><span>Công văn</span></div>"#);
        let c = classify_page(&doc, url);
        assert_eq!(c.label, label);
        assert_eq!(c.rule, rule);
    }

    #[test]
    fn meta_matches_dictionary_or_is_kept_verbatim() {
        let url = "http://127.0.0.1/van-ban/x/van-ban-so-1.aspx";
        let doc = page(r#"<div class="box-info"><span>Loại văn bản</span><span>Bộ luật</span></div>"#);
        // "Luật" precedes "Bộ luật" in the dictionary
        assert_eq!(classify_page(&doc, url).label, "LUẬT");

        let doc = page(r#"<div class="box-info"><span>Loại văn bản</span><span>Hướng dẫn</span></div>"#);
        let c = classify_page(&doc, url);
        assert_eq!(c.label, "HƯỚNG DẪN");
        assert_eq!(c.rule, "meta verbatim");
    }

    #[test]
    fn falls_back_through_page_rules() {
        let url = "http://127.0.0.1/van-ban/x/van-ban-so-1.aspx";

        let doc = page(r#"<div class="box-title"><h1>Chỉ thị về phòng cháy</h1></div>"#);
        assert_eq!(classify_page(&doc, url), Classification::of(DocumentType::Directive, "title"));

        let doc = page(r#"<p align="center"><b>QUYẾT ĐỊNH</b></p><p align="center"><b>Về việc Quyết định bổ nhiệm</b></p>"#);
        assert_eq!(classify_page(&doc, url).rule, "centered text");

        let doc = page(r#"<p style="text-align:center"><b><span>CÔNG ĐIỆN</span></b></p>"#);
        assert_eq!(classify_page(&doc, url), Classification::of(DocumentType::Dispatch, "dispatch heading"));

        let doc = page(r#"<div class="content1"><div>căn cứ thông báo số 5</div></div>"#);
        assert_eq!(classify_page(&doc, url), Classification::of(DocumentType::Notice, "content html"));

        let doc = page("<div>nothing here</div>");
        assert_eq!(classify_page(&doc, "http://127.0.0.1/van-ban/chi-thi/abc.aspx").label, "CHỈ THỊ");
        assert_eq!(classify_page(&doc, url), Classification::of(DocumentType::Other, "default"));
    }

    #[rstest]
    #[case("https://thuvienphapluat.vn/van-ban/Thue/Thong-tu-12-2024-TT-BTC.aspx", Some(DocumentType::Circular))]
    #[case("https://thuvienphapluat.vn/van-ban/Dat-dai/Luat-Dat-dai-2024.aspx", Some(DocumentType::Law))]
    #[case("https://example.org/van-ban/x/ban-tin.aspx", None)]
    #[case("https://thuvienphapluat.vn/van-ban/x/ban-tin.aspx", Some(DocumentType::Law))]
    #[case("https://thuvienphapluat.vn/van-ban/x/quyet-dinh-ve-luat.aspx", Some(DocumentType::Decision))]
    fn classifies_stored_urls(#[case] url: &str, #[case] expected: Option<DocumentType>) {
        assert_eq!(classify_stored_url(url), expected);
    }
}
