use async_trait::async_trait;
use serde_json::{Value, json};
use tera::Context;

use crate::actions::dispatcher::{Dispatcher, create_button, intent_payload};
use crate::actions::protocol::{ActionRequest, Event};
use crate::actions::replies;
use crate::actions::slots::{extract_entities, field_text, optional_field, value_text};
use crate::actions::{Action, ActionContext, ActionName};
use crate::services::backend_client::{check_user_authenticated, is_truthy};
use crate::traits::backend_api::ApiMethod;

const APPOINTMENT_ENTITIES: &[&str] = &["appointment_date", "appointment_time", "legal_field", "lawyer_id"];
const DEFAULT_BOOKING_ERROR: &str = "Không thể đặt lịch hẹn vào thời gian này";

pub struct ScheduleAppointment;

#[async_trait]
impl Action for ScheduleAppointment {
    fn name(&self) -> ActionName {
        ActionName::ActionScheduleAppointment
    }

    async fn run(&self, ctx: &ActionContext, dispatcher: &mut Dispatcher, request: &ActionRequest) -> anyhow::Result<Vec<Event>> {
        let user_id = request.sender_id();
        if !check_user_authenticated(ctx.api.as_ref(), user_id).await {
            dispatcher.utter_message(ctx.replies.text(replies::APPOINTMENT_LOGIN_REQUIRED)?);
            return Ok(vec![]);
        }

        let entities = extract_entities(&request.tracker, APPOINTMENT_ENTITIES);
        let (Some(date), Some(time)) = (entities.get("appointment_date"), entities.get("appointment_time")) else {
            dispatcher.utter_message(ctx.replies.text(replies::APPOINTMENT_PROMPT)?);
            return Ok(vec![]);
        };

        let body = json!({
            "user_id": user_id,
            "appointment_date": date,
            "appointment_time": time,
            "legal_field": entities.get("legal_field"),
            "lawyer_id": entities.get("lawyer_id"),
        });
        let response = ctx
            .api
            .fetch_api("appointments/create", ApiMethod::Post, None, Some(&body))
            .await;

        let booked = response.as_ref().and_then(|r| r.get("success")).is_some_and(is_truthy);
        if !booked {
            let error = response
                .as_ref()
                .and_then(|r| r.get("error"))
                .filter(|e| !e.is_null())
                .map(value_text)
                .unwrap_or_else(|| DEFAULT_BOOKING_ERROR.to_string());
            let mut tctx = Context::new();
            tctx.insert("error", &error);
            dispatcher.utter_message(ctx.replies.render(replies::APPOINTMENT_ERROR, &tctx)?);
            return Ok(vec![]);
        }

        let empty = json!({});
        let appointment: &Value = response
            .as_ref()
            .and_then(|r| r.get("appointment"))
            .unwrap_or(&empty);

        let mut tctx = Context::new();
        tctx.insert("date", &field_text(appointment, "date"));
        tctx.insert("time", &field_text(appointment, "time"));
        tctx.insert("lawyer_name", &optional_field(appointment, "lawyer_name"));
        tctx.insert("location", &optional_field(appointment, "location"));
        let text = ctx.replies.render(replies::APPOINTMENT_CONFIRMED, &tctx)?;

        let appointment_id = field_text(appointment, "id");
        let buttons = vec![
            create_button("Xem lịch hẹn", intent_payload("view_appointments", None)),
            create_button(
                "Hủy lịch hẹn",
                intent_payload("cancel_appointment", Some(json!({"appointment_id": appointment_id}))),
            ),
        ];
        dispatcher.send_text_with_buttons(text, buttons);
        Ok(vec![])
    }
}
