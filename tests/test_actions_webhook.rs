use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use legai::actions::replies::Replies;
use legai::actions::server::{ActionServerState, router};
use legai::actions::{ActionContext, ActionRegistry};
use legai::services::backend_client::HttpBackendApi;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(backend: &MockServer) -> Router {
    let api = HttpBackendApi::builder()
        .base_url(format!("{}/api", backend.uri()))
        .build()
        .unwrap();
    router(ActionServerState {
        registry: Arc::new(ActionRegistry::with_default_actions()),
        context: Arc::new(ActionContext { api: Arc::new(api), replies: Replies::new(None).unwrap() }),
    })
}

async fn webhook(app: Router, body: Value) -> Value {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn mount_auth(server: &MockServer, user: &str, authenticated: bool) {
    Mock::given(method("GET"))
        .and(path(format!("/api/users/check-auth/{}", user)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authenticated": authenticated})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn search_lists_documents_with_detail_buttons() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/legal-documents/search"))
        .and(query_param("keyword", "đất đai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [
                {"id": 31, "title": "Luật Đất đai", "number": "31/2024/QH15", "issued_date": "2024-01-18"},
                {"id": 102, "title": "Nghị định 102", "number": "102/2024/NĐ-CP"}
            ]
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({
            "next_action": "action_search_legal_documents",
            "sender_id": "u1",
            "tracker": {"latest_message": {"text": "luật đất đai", "entities": [{"entity": "keyword", "value": "đất đai"}]}}
        }),
    )
    .await;

    let responses = body["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["text"], "Tôi đã tìm thấy 2 văn bản pháp luật:");
    assert_eq!(responses[1]["text"], "1. Luật Đất đai - 31/2024/QH15 - Ngày ban hành: 2024-01-18");
    assert_eq!(responses[1]["buttons"][0]["payload"], r#"/get_legal_document{"document_id":"31"}"#);
    assert_eq!(responses[2]["text"], "2. Nghị định 102 - 102/2024/NĐ-CP");
}

#[tokio::test]
async fn fee_quote_sets_the_fee_slot() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chatbot/calculate-fee"))
        .and(body_json(json!({"service_type": "tư vấn"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"fee": 1500000, "note": "Chưa gồm VAT"})))
        .expect(1)
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({
            "next_action": "action_calculate_service_fee",
            "sender_id": "u1",
            "tracker": {"slots": {"service_type": "tư vấn"}}
        }),
    )
    .await;

    assert_eq!(body["events"], json!([{"event": "slot", "name": "service_fee", "value": 1500000}]));
    let reply = &body["responses"][0];
    assert_eq!(reply["text"], "Phí dịch vụ tư vấn là 1,500,000 VNĐ\n\nLưu ý: Chưa gồm VAT");
    assert_eq!(reply["buttons"][0]["payload"], "/request_consultation");
    assert_eq!(reply["buttons"][1]["payload"], r#"/initiate_payment{"fee":1500000,"service_type":"tư vấn"}"#);
}

#[tokio::test]
async fn missing_fee_falls_back_to_unavailable_text() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chatbot/calculate-fee"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({"next_action": "action_calculate_service_fee", "tracker": {"slots": {"service_type": "ly hôn"}}}),
    )
    .await;
    assert_eq!(body["events"], json!([]));
    assert_eq!(body["responses"].as_array().unwrap().len(), 1);
    assert!(body["responses"][0].get("buttons").is_none());
}

#[tokio::test]
async fn schedules_appointment_for_authenticated_user() {
    let backend = MockServer::start().await;
    mount_auth(&backend, "u42", true).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments/create"))
        .and(body_partial_json(json!({
            "user_id": "u42",
            "appointment_date": "2024-06-01",
            "appointment_time": "09:00"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "appointment": {"id": 9, "date": "2024-06-01", "time": "09:00", "lawyer_name": "Nguyễn Văn A"}
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({
            "next_action": "action_schedule_appointment",
            "sender_id": "u42",
            "tracker": {
                "sender_id": "u42",
                "latest_message": {"entities": [
                    {"entity": "appointment_date", "value": "2024-06-01"},
                    {"entity": "appointment_time", "value": "09:00"}
                ]}
            }
        }),
    )
    .await;

    let reply = &body["responses"][0];
    assert_eq!(
        reply["text"],
        "Đã đặt lịch hẹn thành công!\n\nNgày: 2024-06-01\nGiờ: 09:00\nLuật sư: Nguyễn Văn A\n"
    );
    assert_eq!(reply["buttons"][0]["payload"], "/view_appointments");
    assert_eq!(reply["buttons"][1]["payload"], r#"/cancel_appointment{"appointment_id":"9"}"#);
}

#[tokio::test]
async fn anonymous_user_cannot_schedule() {
    let backend = MockServer::start().await;
    mount_auth(&backend, "guest", false).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments/create"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({"next_action": "action_schedule_appointment", "sender_id": "guest", "tracker": {}}),
    )
    .await;
    assert_eq!(
        body["responses"][0]["text"],
        "Bạn cần đăng nhập để đặt lịch hẹn. Vui lòng đăng nhập và thử lại sau."
    );
}

#[tokio::test]
async fn rejected_booking_reports_backend_error() {
    let backend = MockServer::start().await;
    mount_auth(&backend, "u42", true).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false, "error": "Luật sư đã có lịch"})))
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({
            "next_action": "action_schedule_appointment",
            "sender_id": "u42",
            "tracker": {"slots": {"appointment_date": "2024-06-01", "appointment_time": "09:00"}}
        }),
    )
    .await;
    assert_eq!(body["responses"][0]["text"], "Đã xảy ra lỗi: Luật sư đã có lịch");
}

#[tokio::test]
async fn compare_lists_first_five_differences() {
    let backend = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/legal-documents/compare"))
        .and(body_json(json!({"document_id_1": "12", "document_id_2": "15"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "comparison": {
                "document1": {"title": "Luật Đất đai 2013", "number": "45/2013/QH13"},
                "document2": {"title": "Luật Đất đai 2024", "number": "31/2024/QH15"},
                "differences": ["d1", "d2", "d3", "d4", "d5", "d6", "d7"]
            }
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({
            "next_action": "action_compare_documents",
            "tracker": {"slots": {"document_id_1": "12", "document_id_2": "15"}}
        }),
    )
    .await;

    let reply = &body["responses"][0];
    assert_eq!(
        reply["text"],
        "So sánh giữa:\n1. Luật Đất đai 2013 - 45/2013/QH13\n2. Luật Đất đai 2024 - 31/2024/QH15\n\n\
         Những điểm khác biệt chính:\n1. d1\n2. d2\n3. d3\n4. d4\n5. d5\n\nCòn 2 điểm khác biệt khác."
    );
    let payloads: Vec<&str> = reply["buttons"].as_array().unwrap().iter().map(|b| b["payload"].as_str().unwrap()).collect();
    assert_eq!(
        payloads,
        vec![
            r#"/get_legal_document{"document_id":"12"}"#,
            r#"/get_legal_document{"document_id":"15"}"#,
            r#"/full_comparison_report{"document_id_1":"12","document_id_2":"15"}"#,
        ]
    );
}

#[tokio::test]
async fn payment_offers_three_methods() {
    let backend = MockServer::start().await;
    mount_auth(&backend, "u42", true).await;

    let body = webhook(
        app(&backend),
        json!({
            "next_action": "action_initiate_payment",
            "sender_id": "u42",
            "tracker": {"slots": {"service_type": "tư vấn", "service_fee": 1500000}}
        }),
    )
    .await;

    let reply = &body["responses"][0];
    assert_eq!(
        reply["text"],
        "Để thanh toán dịch vụ tư vấn với phí 1,500,000 VNĐ, bạn có thể chọn một trong các phương thức sau:"
    );
    let buttons = reply["buttons"].as_array().unwrap();
    assert_eq!(buttons.len(), 3);
    assert_eq!(buttons[0]["payload"], r#"/online_payment{"fee":1500000,"service_type":"tư vấn"}"#);
    assert_eq!(buttons[2]["payload"], "/office_payment");
    assert_eq!(buttons[2]["type"], "postback");
}

#[tokio::test]
async fn document_detail_uses_placeholder_for_missing_fields() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/legal-documents/31"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document": {"id": 31, "title": "Luật Đất đai", "number": "31/2024/QH15", "issued_date": "2024-01-18", "issuing_body": "Quốc hội"}
        })))
        .expect(1)
        .mount(&backend)
        .await;

    let body = webhook(
        app(&backend),
        json!({"next_action": "action_get_legal_document", "tracker": {"slots": {"document_id": 31}}}),
    )
    .await;

    let reply = &body["responses"][0];
    assert!(reply["text"].as_str().unwrap().contains("Chưa cập nhật"));
    assert_eq!(reply["buttons"][0]["payload"], r#"/view_full_document{"document_id":"31"}"#);
}
