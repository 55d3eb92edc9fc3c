#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use serde_json::Value;
use tera::{Context, Tera};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn read_html(name: &str) -> String {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources/html").join(name);
    fs::read_to_string(p).unwrap()
}

pub fn load_test_config_template() -> String {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/resources/configs/crawl.yaml");
    fs::read_to_string(p).unwrap()
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).insert_header("content-type", "text/html; charset=utf-8").set_body_string(body)
}

/// Legal portal: a two-page category listing three documents, the last one
/// behind a login wall the first time it is requested.
pub async fn mount_legal_portal(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/van-ban-moi"))
        .and(query_param("page", "2"))
        .respond_with(html(read_html("legal_list_page2.html")))
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/van-ban-moi"))
        .respond_with(html(read_html("legal_list.html")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/van-ban/Thue-Phi-Le-Phi/Thong-tu-12-2024-TT-BTC-601234.aspx"))
        .respond_with(html(read_html("legal_circular.html")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/van-ban/Bat-dong-san/Nghi-dinh-45-2024-ND-CP-602000.aspx"))
        .respond_with(html(read_html("legal_decree.html")))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/van-ban/Lao-dong-Tien-luong/Bo-luat-lao-dong-2019-333670.aspx"))
        .respond_with(html(read_html("legal_login_wall.html")))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/van-ban/Lao-dong-Tien-luong/Bo-luat-lao-dong-2019-333670.aspx"))
        .respond_with(html(read_html("legal_code.html")))
        .mount(server)
        .await;
}

/// Keeps the protected legal document behind the login wall for good.
pub async fn mount_permanent_login_wall(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/van-ban/Lao-dong-Tien-luong/Bo-luat-lao-dong-2019-333670.aspx"))
        .respond_with(html(read_html("legal_login_wall.html")))
        .with_priority(1)
        .mount(server)
        .await;
}

pub async fn mount_login(server: &MockServer, succeed: bool) {
    let body = if succeed { "<p>Đăng nhập thành công</p>" } else { "<p>Sai mật khẩu</p>" };
    Mock::given(method("POST"))
        .and(path("/dang-nhap"))
        .respond_with(html(body.to_string()))
        .expect(1)
        .mount(server)
        .await;
}

/// Contract section: one listing with two templates; only the lease has a
/// downloadable file.
pub async fn mount_contract_portal(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/hopdong"))
        .respond_with(html(read_html("contract_list.html")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hopdong/101/mau-hop-dong-thue-nha"))
        .respond_with(html(read_html("contract_lease.html")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hopdong/102/don-xin-viec"))
        .respond_with(html(read_html("contract_application.html")))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/uploads/hopdong/mau-hop-dong-thue-nha.doc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/msword")
                .set_body_bytes(b"DOC-BYTES".to_vec()),
        )
        .mount(server)
        .await;
}

pub struct ConfigParams<'a> {
    pub base: &'a str,
    pub jsonl: &'a str,
    pub documents_dir: &'a str,
    pub legal_enabled: bool,
    pub contracts_enabled: bool,
    pub with_login: bool,
    pub max_retry_attempts: usize,
    /// Enables the legal crawler's disk cache in this directory when not empty.
    pub cache_dir: &'a str,
}

pub fn render_config(params: &ConfigParams) -> tempfile::NamedTempFile {
    let tpl = load_test_config_template();
    let mut tera = Tera::default();
    tera.add_raw_template("cfg", &tpl).unwrap();
    let mut ctx = Context::new();
    ctx.insert("base", params.base);
    ctx.insert("jsonl", params.jsonl);
    ctx.insert("documents_dir", params.documents_dir);
    ctx.insert("legal_enabled", &params.legal_enabled);
    ctx.insert("contracts_enabled", &params.contracts_enabled);
    ctx.insert("with_login", &params.with_login);
    ctx.insert("max_retry_attempts", &params.max_retry_attempts);
    ctx.insert("cache_dir", params.cache_dir);
    let config_text = tera.render("cfg", &ctx).unwrap();
    let cfg_file = tempfile::NamedTempFile::new().unwrap();
    fs::write(cfg_file.path(), config_text).unwrap();
    cfg_file
}

pub fn read_jsonl(path: &std::path::Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
