use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).unwrap());
static LONG_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ngày\s+(\d{1,2})\s+tháng\s+(\d{1,2})\s+năm\s+(\d{4})").unwrap());

const SUMMARY_MAX_CHARS: usize = 500;
const MAX_KEYWORDS: usize = 10;

const STOP_WORDS: &[&str] = &[
    "về", "của", "trong", "nghị", "định", "luật", "thông", "tư", "quyết", "và", "các", "với", "theo", "cho",
    "đến",
];

const IMPORTANT_PHRASES: &[&str] = &[
    "bảo hiểm xã hội",
    "thuế thu nhập",
    "đất đai",
    "nhà ở",
    "xây dựng",
    "kinh doanh",
    "doanh nghiệp",
    "lao động",
    "việc làm",
    "giáo dục",
    "y tế",
    "môi trường",
    "đầu tư",
    "chứng khoán",
    "ngân hàng",
    "tài chính",
    "xuất nhập khẩu",
];

/// Common Vietnamese words that show up in titles typed without diacritics.
const UNACCENTED_WORDS: &[&str] = &[
    "hop dong",
    "quyen",
    "nghia vu",
    "thoa thuan",
    "dich vu",
    "kinh doanh",
    "mua ban",
    "cho thue",
    "so huu",
    "tai san",
    "thanh ly",
    "uy quyen",
    "thue",
    "lao dong",
    "chuyen nhuong",
    "phan phoi",
    "nha dat",
    "xay dung",
];

pub fn collapse_whitespace(s: &str) -> String {
    WS_RE.replace_all(s, " ").trim().to_string()
}

/// Drops markup and collapses whitespace.
pub fn strip_html(html: &str) -> String {
    collapse_whitespace(&TAG_RE.replace_all(html, " "))
}

/// Cuts `text` to `max_chars` characters and appends "..." when it was longer.
pub fn truncate_with_dots(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut s: String = text.chars().take(max_chars).collect();
    s.push_str("...");
    s
}

/// Plain-text summary of a document body. Empty when the body has no text.
pub fn summarize(content_html: &str) -> String {
    truncate_with_dots(&strip_html(content_html), SUMMARY_MAX_CHARS)
}

/// Keywords of a document title: known topic phrases first, then the
/// remaining significant words.
pub fn extract_keywords(title: &str) -> Vec<String> {
    let lower = title.to_lowercase();
    let phrases = IMPORTANT_PHRASES
        .iter()
        .filter(|p| lower.contains(*p))
        .map(|p| p.to_string());
    let words = lower
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w) && w.chars().count() > 3)
        .map(str::to_string);
    phrases.chain(words).take(MAX_KEYWORDS).collect()
}

/// Parses the portal's `dd/mm/yyyy` dates.
pub fn parse_vn_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%d/%m/%Y").ok()
}

/// Parses "ngày 5 tháng 3 năm 2024" anywhere in `text`.
pub fn parse_vn_long_date(text: &str) -> Option<NaiveDate> {
    let caps = LONG_DATE_RE.captures(text)?;
    let day = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    let year = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Base letter of a Vietnamese character, lower-cased. Other characters are
/// only lower-cased. Always maps one char to one char.
pub fn fold_char(c: char) -> char {
    let lower = c.to_lowercase().next().unwrap_or(c);
    match lower {
        'á' | 'à' | 'ả' | 'ã' | 'ạ' | 'ă' | 'ắ' | 'ằ' | 'ẳ' | 'ẵ' | 'ặ' | 'â' | 'ấ' | 'ầ' | 'ẩ' | 'ẫ' | 'ậ' => 'a',
        'é' | 'è' | 'ẻ' | 'ẽ' | 'ẹ' | 'ê' | 'ế' | 'ề' | 'ể' | 'ễ' | 'ệ' => 'e',
        'í' | 'ì' | 'ỉ' | 'ĩ' | 'ị' => 'i',
        'ó' | 'ò' | 'ỏ' | 'õ' | 'ọ' | 'ô' | 'ố' | 'ồ' | 'ổ' | 'ỗ' | 'ộ' | 'ơ' | 'ớ' | 'ờ' | 'ở' | 'ỡ' | 'ợ' => 'o',
        'ú' | 'ù' | 'ủ' | 'ũ' | 'ụ' | 'ư' | 'ứ' | 'ừ' | 'ử' | 'ữ' | 'ự' => 'u',
        'ý' | 'ỳ' | 'ỷ' | 'ỹ' | 'ỵ' => 'y',
        'đ' => 'd',
        other => other,
    }
}

pub fn has_vietnamese_accent(text: &str) -> bool {
    text.chars().any(|c| {
        let lower = c.to_lowercase().next().unwrap_or(c);
        fold_char(lower) != lower
    })
}

pub fn looks_unaccented_vietnamese(text: &str) -> bool {
    let lower = text.to_lowercase();
    UNACCENTED_WORDS.iter().any(|w| lower.contains(w))
}

/// Finds `needle` in `haystack` ignoring case, diacritics and runs of
/// whitespace, and returns the matching slice of `haystack` when that slice
/// carries diacritics.
pub fn find_accented_match(haystack: &str, needle: &str) -> Option<String> {
    let needle: Vec<char> = collapse_whitespace(needle).chars().map(fold_char).collect();
    if needle.is_empty() {
        return None;
    }
    let hay = collapse_whitespace(haystack);
    let chars: Vec<char> = hay.chars().collect();
    let folded: Vec<char> = chars.iter().copied().map(fold_char).collect();
    if folded.len() < needle.len() {
        return None;
    }
    (0..=folded.len() - needle.len())
        .filter(|&i| folded[i..i + needle.len()] == needle[..])
        .map(|i| chars[i..i + needle.len()].iter().collect::<String>())
        .find(|candidate| has_vietnamese_accent(candidate))
}

/// File-system safe name derived from a title.
pub fn clean_filename(name: &str) -> String {
    let stripped = FILENAME_RE.replace_all(name.trim(), "");
    let underscored = WS_RE.replace_all(&stripped, "_");
    let cleaned: String = underscored.chars().take(100).collect();
    if cleaned.is_empty() {
        "contract_unknown".to_string()
    } else {
        cleaned
    }
}
