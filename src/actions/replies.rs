//! Reply texts. Every text is a tera template; `actions.templates` in the
//! config replaces the built-in Vietnamese wording key by key.

use std::collections::HashMap;

use anyhow::Context as _;
use serde_json::Value;
use tera::{Context, Tera};
use tracing::{info, warn};

pub const SEARCH_PROMPT: &str = "search_prompt";
pub const SEARCH_NOT_FOUND: &str = "search_not_found";
pub const DOCUMENT_LIST_EMPTY: &str = "document_list_empty";
pub const DOCUMENT_LIST_INTRO: &str = "document_list_intro";
pub const DOCUMENT_LIST_ITEM: &str = "document_list_item";
pub const DOCUMENT_ID_PROMPT: &str = "document_id_prompt";
pub const DOCUMENT_NOT_FOUND: &str = "document_not_found";
pub const DOCUMENT_DETAIL: &str = "document_detail";
pub const FEE_PROMPT: &str = "fee_prompt";
pub const FEE_UNAVAILABLE: &str = "fee_unavailable";
pub const FEE_QUOTE: &str = "fee_quote";
pub const APPOINTMENT_LOGIN_REQUIRED: &str = "appointment_login_required";
pub const APPOINTMENT_PROMPT: &str = "appointment_prompt";
pub const APPOINTMENT_ERROR: &str = "appointment_error";
pub const APPOINTMENT_CONFIRMED: &str = "appointment_confirmed";
pub const PAYMENT_LOGIN_REQUIRED: &str = "payment_login_required";
pub const PAYMENT_PROMPT: &str = "payment_prompt";
pub const PAYMENT_OPTIONS: &str = "payment_options";
pub const COMPARE_PROMPT: &str = "compare_prompt";
pub const COMPARE_FAILED: &str = "compare_failed";
pub const COMPARISON: &str = "comparison";

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (SEARCH_PROMPT, "Bạn muốn tìm kiếm văn bản pháp luật nào?"),
    (SEARCH_NOT_FOUND, "Tôi không tìm thấy văn bản pháp luật nào phù hợp với yêu cầu của bạn."),
    (DOCUMENT_LIST_EMPTY, "Không tìm thấy văn bản pháp luật nào phù hợp."),
    (DOCUMENT_LIST_INTRO, "Tôi đã tìm thấy {{ count }} văn bản pháp luật:"),
    (
        DOCUMENT_LIST_ITEM,
        "{{ index }}. {{ title }} - {{ number }}{% if issued_date %} - Ngày ban hành: {{ issued_date }}{% endif %}",
    ),
    (DOCUMENT_ID_PROMPT, "Vui lòng cung cấp mã văn bản cần xem chi tiết."),
    (DOCUMENT_NOT_FOUND, "Không tìm thấy thông tin chi tiết của văn bản."),
    (
        DOCUMENT_DETAIL,
        "Thông tin chi tiết về văn bản:\n\
         - Tiêu đề: {{ title }}\n\
         - Số hiệu: {{ number }}\n\
         - Ngày ban hành: {{ issued_date }}\n\
         - Cơ quan ban hành: {{ issuing_body }}\n\
         - Lĩnh vực: {{ legal_field }}\n\
         {% if summary %}- Tóm tắt: {{ summary }}\n{% endif %}",
    ),
    (FEE_PROMPT, "Bạn muốn biết phí của dịch vụ nào?"),
    (
        FEE_UNAVAILABLE,
        "Xin lỗi, tôi không thể tính phí cho dịch vụ này. \
         Vui lòng liên hệ trực tiếp với chúng tôi để biết thêm chi tiết.",
    ),
    (
        FEE_QUOTE,
        "Phí dịch vụ {{ service_type }} là {{ fee | thousands }} VNĐ{% if note %}\n\nLưu ý: {{ note }}{% endif %}",
    ),
    (
        APPOINTMENT_LOGIN_REQUIRED,
        "Bạn cần đăng nhập để đặt lịch hẹn. Vui lòng đăng nhập và thử lại sau.",
    ),
    (APPOINTMENT_PROMPT, "Vui lòng cho biết ngày và giờ bạn muốn đặt lịch hẹn."),
    (APPOINTMENT_ERROR, "Đã xảy ra lỗi: {{ error }}"),
    (
        APPOINTMENT_CONFIRMED,
        "Đã đặt lịch hẹn thành công!\n\n\
         Ngày: {{ date }}\n\
         Giờ: {{ time }}\n\
         {% if lawyer_name %}Luật sư: {{ lawyer_name }}\n{% endif %}\
         {% if location %}Địa điểm: {{ location }}\n{% endif %}",
    ),
    (
        PAYMENT_LOGIN_REQUIRED,
        "Bạn cần đăng nhập để thanh toán. Vui lòng đăng nhập và thử lại sau.",
    ),
    (PAYMENT_PROMPT, "Vui lòng chọn dịch vụ trước khi thanh toán."),
    (
        PAYMENT_OPTIONS,
        "Để thanh toán dịch vụ {{ service_type }} với phí {{ fee | thousands }} VNĐ, \
         bạn có thể chọn một trong các phương thức sau:",
    ),
    (COMPARE_PROMPT, "Vui lòng cung cấp hai văn bản cần so sánh."),
    (
        COMPARE_FAILED,
        "Không thể so sánh hai văn bản này. Vui lòng thử lại với các văn bản khác.",
    ),
    (
        COMPARISON,
        "So sánh giữa:\n\
         1. {{ title_1 }} - {{ number_1 }}\n\
         2. {{ title_2 }} - {{ number_2 }}\n\n\
         Những điểm khác biệt chính:\n\
         {% for diff in differences %}{{ loop.index }}. {{ diff }}\n{% endfor %}\
         {% if remaining > 0 %}\nCòn {{ remaining }} điểm khác biệt khác.{% endif %}",
    ),
];

pub struct Replies {
    tera: Tera,
}

impl Replies {
    /// Built-in templates with `overrides` applied on top.
    pub fn new(overrides: Option<&HashMap<String, String>>) -> anyhow::Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);
        tera.register_filter("thousands", thousands_filter);
        for (name, body) in DEFAULT_TEMPLATES {
            tera.add_raw_template(name, body)
                .with_context(|| format!("built-in reply template {}", name))?;
        }
        if let Some(overrides) = overrides {
            for (name, body) in overrides {
                if !DEFAULT_TEMPLATES.iter().any(|(known, _)| known == name) {
                    warn!(template = %name, "actions: override for unknown reply template");
                }
                tera.add_raw_template(name, body)
                    .with_context(|| format!("invalid reply template override {}", name))?;
            }
            info!(count = overrides.len(), "actions: reply template overrides loaded");
        }
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, ctx: &Context) -> anyhow::Result<String> {
        self.tera
            .render(name, ctx)
            .with_context(|| format!("rendering reply template {}", name))
    }

    pub fn text(&self, name: &str) -> anyhow::Result<String> {
        self.render(name, &Context::new())
    }
}

fn thousands_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(format_thousands(value)))
}

/// Number with ',' thousands separators; whole floats lose their fraction.
/// Non-numbers are returned as text.
pub fn format_thousands(value: &Value) -> String {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                group(i.unsigned_abs().to_string(), i < 0, None)
            } else if let Some(u) = n.as_u64() {
                group(u.to_string(), false, None)
            } else {
                let f = n.as_f64().unwrap_or_default();
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    group(format!("{}", f.abs() as u64), f < 0.0, None)
                } else {
                    let text = f.abs().to_string();
                    let (int, frac) = text.split_once('.').unwrap_or((text.as_str(), ""));
                    group(int.to_string(), f < 0.0, Some(frac))
                }
            }
        }
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn group(digits: String, negative: bool, fraction: Option<&str>) -> String {
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if negative {
        out.insert(0, '-');
    }
    if let Some(frac) = fraction.filter(|f| !f.is_empty()) {
        out.push('.');
        out.push_str(frac);
    }
    out
}
