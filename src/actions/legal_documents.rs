use async_trait::async_trait;
use serde_json::{Value, json};
use tera::Context;

use crate::actions::dispatcher::{Dispatcher, create_button, intent_payload};
use crate::actions::protocol::{ActionRequest, Event};
use crate::actions::replies::{self, Replies};
use crate::actions::slots::{extract_entities, field_text, optional_field, to_query_params, value_text};
use crate::actions::{Action, ActionContext, ActionName};
use crate::services::backend_client::is_truthy;
use crate::traits::backend_api::ApiMethod;

const SEARCH_ENTITIES: &[&str] = &["document_type", "legal_field", "keyword", "issued_year"];
const MAX_LISTED_DIFFERENCES: usize = 5;

/// One message per document, each with a details button, after an intro line.
pub fn send_document_list(dispatcher: &mut Dispatcher, replies: &Replies, documents: &[Value]) -> anyhow::Result<()> {
    if documents.is_empty() {
        dispatcher.utter_message(replies.text(replies::DOCUMENT_LIST_EMPTY)?);
        return Ok(());
    }

    let mut ctx = Context::new();
    ctx.insert("count", &documents.len());
    dispatcher.utter_message(replies.render(replies::DOCUMENT_LIST_INTRO, &ctx)?);

    for (i, doc) in documents.iter().enumerate() {
        let mut ctx = Context::new();
        ctx.insert("index", &(i + 1));
        ctx.insert("title", &field_text(doc, "title"));
        ctx.insert("number", &field_text(doc, "number"));
        ctx.insert("issued_date", &optional_field(doc, "issued_date"));
        let text = replies.render(replies::DOCUMENT_LIST_ITEM, &ctx)?;
        let id = field_text(doc, "id");
        let button = create_button("Xem chi tiết", intent_payload("get_legal_document", Some(json!({"document_id": id}))));
        dispatcher.send_text_with_buttons(text, vec![button]);
    }
    Ok(())
}

pub fn send_document_detail(dispatcher: &mut Dispatcher, replies: &Replies, document: Option<&Value>) -> anyhow::Result<()> {
    let Some(doc) = document.filter(|d| d.as_object().is_some_and(|o| !o.is_empty())) else {
        dispatcher.utter_message(replies.text(replies::DOCUMENT_NOT_FOUND)?);
        return Ok(());
    };

    let mut ctx = Context::new();
    for key in ["title", "number", "issued_date", "issuing_body", "legal_field"] {
        ctx.insert(key, &field_text(doc, key));
    }
    ctx.insert("summary", &optional_field(doc, "summary"));
    let text = replies.render(replies::DOCUMENT_DETAIL, &ctx)?;
    let id = field_text(doc, "id");
    let button = create_button("Xem toàn văn", intent_payload("view_full_document", Some(json!({"document_id": id}))));
    dispatcher.send_text_with_buttons(text, vec![button]);
    Ok(())
}

pub struct SearchLegalDocuments;

#[async_trait]
impl Action for SearchLegalDocuments {
    fn name(&self) -> ActionName {
        ActionName::ActionSearchLegalDocuments
    }

    async fn run(&self, ctx: &ActionContext, dispatcher: &mut Dispatcher, request: &ActionRequest) -> anyhow::Result<Vec<Event>> {
        let entities = extract_entities(&request.tracker, SEARCH_ENTITIES);
        if entities.is_empty() {
            dispatcher.utter_message(ctx.replies.text(replies::SEARCH_PROMPT)?);
            return Ok(vec![]);
        }

        let params = to_query_params(&entities);
        let response = ctx
            .api
            .fetch_api("legal-documents/search", ApiMethod::Get, Some(&params), None)
            .await;
        let documents = response
            .as_ref()
            .and_then(|r| r.get("documents"))
            .and_then(Value::as_array)
            .filter(|d| !d.is_empty());

        match documents {
            Some(documents) => send_document_list(dispatcher, &ctx.replies, documents)?,
            None => dispatcher.utter_message(ctx.replies.text(replies::SEARCH_NOT_FOUND)?),
        }
        Ok(vec![])
    }
}

pub struct GetLegalDocument;

#[async_trait]
impl Action for GetLegalDocument {
    fn name(&self) -> ActionName {
        ActionName::ActionGetLegalDocument
    }

    async fn run(&self, ctx: &ActionContext, dispatcher: &mut Dispatcher, request: &ActionRequest) -> anyhow::Result<Vec<Event>> {
        let Some(document_id) = request.tracker.slot("document_id").map(value_text) else {
            dispatcher.utter_message(ctx.replies.text(replies::DOCUMENT_ID_PROMPT)?);
            return Ok(vec![]);
        };

        let endpoint = format!("legal-documents/{}", urlencoding::encode(&document_id));
        let response = ctx.api.fetch_api(&endpoint, ApiMethod::Get, None, None).await;
        let document = response.as_ref().and_then(|r| r.get("document"));
        send_document_detail(dispatcher, &ctx.replies, document)?;
        Ok(vec![])
    }
}

pub struct CompareDocuments;

#[async_trait]
impl Action for CompareDocuments {
    fn name(&self) -> ActionName {
        ActionName::ActionCompareDocuments
    }

    async fn run(&self, ctx: &ActionContext, dispatcher: &mut Dispatcher, request: &ActionRequest) -> anyhow::Result<Vec<Event>> {
        let tracker = &request.tracker;
        let (Some(doc1), Some(doc2)) = (tracker.slot("document_id_1"), tracker.slot("document_id_2")) else {
            dispatcher.utter_message(ctx.replies.text(replies::COMPARE_PROMPT)?);
            return Ok(vec![]);
        };

        let body = json!({"document_id_1": doc1, "document_id_2": doc2});
        let response = ctx
            .api
            .fetch_api("legal-documents/compare", ApiMethod::Post, None, Some(&body))
            .await;
        let Some(comparison) = response
            .as_ref()
            .and_then(|r| r.get("comparison"))
            .filter(|c| is_truthy(c))
        else {
            dispatcher.utter_message(ctx.replies.text(replies::COMPARE_FAILED)?);
            return Ok(vec![]);
        };

        let empty = json!({});
        let first = comparison.get("document1").unwrap_or(&empty);
        let second = comparison.get("document2").unwrap_or(&empty);
        let differences: Vec<String> = comparison
            .get("differences")
            .and_then(Value::as_array)
            .map(|d| d.iter().map(value_text).collect())
            .unwrap_or_default();

        let mut tctx = Context::new();
        tctx.insert("title_1", &field_text(first, "title"));
        tctx.insert("number_1", &field_text(first, "number"));
        tctx.insert("title_2", &field_text(second, "title"));
        tctx.insert("number_2", &field_text(second, "number"));
        tctx.insert("differences", &differences.iter().take(MAX_LISTED_DIFFERENCES).collect::<Vec<_>>());
        tctx.insert("remaining", &differences.len().saturating_sub(MAX_LISTED_DIFFERENCES));
        let text = ctx.replies.render(replies::COMPARISON, &tctx)?;

        let (id1, id2) = (value_text(doc1), value_text(doc2));
        let buttons = vec![
            create_button("Xem chi tiết văn bản 1", intent_payload("get_legal_document", Some(json!({"document_id": id1})))),
            create_button("Xem chi tiết văn bản 2", intent_payload("get_legal_document", Some(json!({"document_id": id2})))),
            create_button(
                "Xem báo cáo đầy đủ",
                intent_payload("full_comparison_report", Some(json!({"document_id_1": id1, "document_id_2": id2}))),
            ),
        ];
        dispatcher.send_text_with_buttons(text, buttons);
        Ok(vec![])
    }
}
