use url::Url;

use crate::models::types::NormalizedUrl;

/// Path fragments of listing and search pages that also contain "/van-ban".
const LEGAL_NON_DETAIL: &[&str] = &[
    "/van-ban-moi/",
    "/van-ban-phap-luat/",
    "/van-ban-hop-nhat/",
    "/chu-de-van-ban/",
    "/tim-van-ban",
];

/// Removes the `tab` parameter, blank parameters and repeated keys.
pub fn normalize_legal_url(raw: &str) -> NormalizedUrl {
    let Ok(mut url) = Url::parse(raw) else {
        return NormalizedUrl::from(raw);
    };

    let mut kept: Vec<(String, String)> = Vec::new();
    for (k, v) in url.query_pairs() {
        if k == "tab" || v.is_empty() || kept.iter().any(|(seen, _)| *seen == k) {
            continue;
        }
        kept.push((k.into_owned(), v.into_owned()));
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }
    NormalizedUrl::from(url.to_string())
}

/// Removes tracking parameters and the trailing slash.
pub fn normalize_contract_url(raw: &str) -> NormalizedUrl {
    let Ok(mut url) = Url::parse(raw) else {
        return NormalizedUrl::from(raw.trim_end_matches('/'));
    };

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, v)| !v.is_empty() && !k.starts_with("utm_") && k != "ref" && k != "source")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(&path[..path.len() - 1]);
    }
    NormalizedUrl::from(url.to_string())
}

/// `scheme://host/path` without query or fragment.
pub fn base_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw.split(['?', '#']).next().unwrap_or(raw).to_string(),
    }
}

pub fn is_legal_detail_url(url: &str) -> bool {
    url.contains("/van-ban/") && !LEGAL_NON_DETAIL.iter().any(|p| url.contains(p))
}

/// Appends `page=n` to a listing URL.
pub fn with_page(url: &str, page: u32) -> String {
    let sep = if url.contains('?') { '&' } else { '?' };
    format!("{}{}page={}", url, sep, page)
}

/// Value of the `page` query parameter, when it is a number.
pub fn page_param(url: &str) -> Option<u32> {
    let parsed = Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(k, _)| k == "page")
        .map(|(_, v)| v.into_owned())?;
    value.trim().parse().ok()
}

/// Resolves `href` against the page it was found on.
pub fn join(base: &str, href: &str) -> Option<String> {
    Url::parse(base).ok()?.join(href.trim()).ok().map(|u| u.to_string())
}

/// Last non-empty path segment of a URL.
pub fn last_segment(url: &str) -> Option<String> {
    let path = Url::parse(url).map(|u| u.path().to_string()).unwrap_or_else(|_| url.to_string());
    path.split('/').filter(|s| !s.is_empty()).last().map(str::to_string)
}

/// Number of '/'-separated parts of the URL path, counting the leading empty one.
pub fn path_part_count(url: &str) -> usize {
    Url::parse(url).map(|u| u.path().split('/').count()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "https://thuvienphapluat.vn/van-ban/Thue/Thong-tu-12-2024-TT-BTC-601234.aspx?tab=1",
        "https://thuvienphapluat.vn/van-ban/Thue/Thong-tu-12-2024-TT-BTC-601234.aspx"
    )]
    #[case(
        "https://thuvienphapluat.vn/van-ban/a.aspx?anchor=dieu_1&tab=7&anchor=dieu_2&empty=",
        "https://thuvienphapluat.vn/van-ban/a.aspx?anchor=dieu_1"
    )]
    #[case("https://thuvienphapluat.vn/van-ban/a.aspx", "https://thuvienphapluat.vn/van-ban/a.aspx")]
    fn normalizes_legal_urls(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_legal_url(input).as_str(), expected);
    }

    #[rstest]
    #[case("https://ThuVienPhapLuat.vn/hopdong/123/mau-hop-dong/", "https://thuvienphapluat.vn/hopdong/123/mau-hop-dong")]
    #[case(
        "https://thuvienphapluat.vn/hopdong/123/x?utm_source=fb&ref=home&id=5&source=zalo",
        "https://thuvienphapluat.vn/hopdong/123/x?id=5"
    )]
    #[case("https://thuvienphapluat.vn/", "https://thuvienphapluat.vn/")]
    fn normalizes_contract_urls(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_contract_url(input).as_str(), expected);
    }

    #[rstest]
    #[case("https://thuvienphapluat.vn/van-ban/Dat-dai/Luat-Dat-dai-2024-31-2024-QH15-523642.aspx", true)]
    #[case("https://thuvienphapluat.vn/van-ban-moi", false)]
    #[case("https://thuvienphapluat.vn/van-ban-moi/", false)]
    #[case("https://thuvienphapluat.vn/van-ban/tim-van-ban.aspx?keyword=thue", false)]
    #[case("https://thuvienphapluat.vn/chu-de-van-ban/12/", false)]
    fn detects_legal_detail_pages(#[case] url: &str, #[case] expected: bool) {
        assert_eq!(is_legal_detail_url(url), expected);
    }

    #[test]
    fn builds_and_reads_page_params() {
        assert_eq!(with_page("https://x.vn/van-ban-moi", 2), "https://x.vn/van-ban-moi?page=2");
        assert_eq!(with_page("https://x.vn/hopdong?cat=3", 4), "https://x.vn/hopdong?cat=3&page=4");
        assert_eq!(page_param("https://x.vn/hopdong?cat=3&page=4"), Some(4));
        assert_eq!(page_param("https://x.vn/hopdong?page=abc"), None);
        assert_eq!(page_param("https://x.vn/hopdong"), None);
    }

    #[test]
    fn computes_base_url_and_segments() {
        assert_eq!(base_url("https://x.vn/van-ban/a.aspx?tab=1#d1"), "https://x.vn/van-ban/a.aspx");
        assert_eq!(last_segment("https://x.vn/van-ban/Thue/Nghi-dinh-15.aspx").as_deref(), Some("Nghi-dinh-15.aspx"));
        assert_eq!(path_part_count("https://x.vn/van-ban/Thue/a.aspx"), 4);
        assert_eq!(join("https://x.vn/van-ban-moi?page=2", "/van-ban/a.aspx").as_deref(), Some("https://x.vn/van-ban/a.aspx"));
    }
}
