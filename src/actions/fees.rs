use async_trait::async_trait;
use serde_json::{Value, json};
use tera::Context;

use crate::actions::dispatcher::{Dispatcher, create_button, intent_payload};
use crate::actions::protocol::{ActionRequest, Event};
use crate::actions::replies;
use crate::actions::slots::{extract_entities, optional_field, value_text};
use crate::actions::{Action, ActionContext, ActionName};
use crate::services::backend_client::{calculate_service_fee, check_user_authenticated, is_truthy};

const FEE_ENTITIES: &[&str] = &["service_type", "duration", "complexity"];

pub struct CalculateServiceFee;

#[async_trait]
impl Action for CalculateServiceFee {
    fn name(&self) -> ActionName {
        ActionName::ActionCalculateServiceFee
    }

    async fn run(&self, ctx: &ActionContext, dispatcher: &mut Dispatcher, request: &ActionRequest) -> anyhow::Result<Vec<Event>> {
        let entities = extract_entities(&request.tracker, FEE_ENTITIES);
        let Some(service_type) = entities.get("service_type").map(value_text) else {
            dispatcher.utter_message(ctx.replies.text(replies::FEE_PROMPT)?);
            return Ok(vec![]);
        };
        let duration = entities.get("duration").map(value_text);
        let complexity = entities.get("complexity").map(value_text);

        let quote = calculate_service_fee(ctx.api.as_ref(), &service_type, duration.as_deref(), complexity.as_deref()).await;
        let Some(fee) = quote.get("fee").filter(|f| is_truthy(f)).cloned() else {
            dispatcher.utter_message(ctx.replies.text(replies::FEE_UNAVAILABLE)?);
            return Ok(vec![]);
        };

        let mut tctx = Context::new();
        tctx.insert("service_type", &service_type);
        tctx.insert("fee", &fee);
        tctx.insert("note", &optional_field(&quote, "note"));
        let text = ctx.replies.render(replies::FEE_QUOTE, &tctx)?;

        let buttons = vec![
            create_button("Đặt lịch hẹn tư vấn", intent_payload("request_consultation", None)),
            create_button(
                "Thanh toán dịch vụ",
                intent_payload("initiate_payment", Some(json!({"service_type": service_type, "fee": fee}))),
            ),
        ];
        dispatcher.send_text_with_buttons(text, buttons);

        Ok(vec![Event::SlotSet { name: "service_fee".to_string(), value: fee }])
    }
}

pub struct InitiatePayment;

#[async_trait]
impl Action for InitiatePayment {
    fn name(&self) -> ActionName {
        ActionName::ActionInitiatePayment
    }

    async fn run(&self, ctx: &ActionContext, dispatcher: &mut Dispatcher, request: &ActionRequest) -> anyhow::Result<Vec<Event>> {
        if !check_user_authenticated(ctx.api.as_ref(), request.sender_id()).await {
            dispatcher.utter_message(ctx.replies.text(replies::PAYMENT_LOGIN_REQUIRED)?);
            return Ok(vec![]);
        }

        let tracker = &request.tracker;
        let (Some(service_type), Some(fee)) = (tracker.slot("service_type"), tracker.slot("service_fee")) else {
            dispatcher.utter_message(ctx.replies.text(replies::PAYMENT_PROMPT)?);
            return Ok(vec![]);
        };
        let service_type = value_text(service_type);

        let mut tctx = Context::new();
        tctx.insert("service_type", &service_type);
        tctx.insert("fee", fee);
        let text = ctx.replies.render(replies::PAYMENT_OPTIONS, &tctx)?;

        let method: Value = json!({"service_type": service_type, "fee": fee});
        let buttons = vec![
            create_button("Thanh toán trực tuyến", intent_payload("online_payment", Some(method.clone()))),
            create_button("Chuyển khoản ngân hàng", intent_payload("bank_transfer", Some(method))),
            create_button("Thanh toán tại văn phòng", intent_payload("office_payment", None)),
        ];
        dispatcher.send_text_with_buttons(text, buttons);
        Ok(vec![])
    }
}
