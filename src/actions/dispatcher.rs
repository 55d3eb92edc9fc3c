use serde_json::Value;

use crate::actions::protocol::{BotMessage, Button};

/// Collects the messages an action utters.
#[derive(Debug, Default)]
pub struct Dispatcher {
    messages: Vec<BotMessage>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn utter_message(&mut self, text: impl Into<String>) {
        self.messages.push(BotMessage { text: Some(text.into()), buttons: Vec::new() });
    }

    pub fn send_text_with_buttons(&mut self, text: impl Into<String>, buttons: Vec<Button>) {
        self.messages.push(BotMessage { text: Some(text.into()), buttons });
    }

    pub fn messages(&self) -> &[BotMessage] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<BotMessage> {
        self.messages
    }
}

pub fn create_button(title: impl Into<String>, payload: impl Into<String>) -> Button {
    create_typed_button(title, payload, "postback")
}

pub fn create_typed_button(title: impl Into<String>, payload: impl Into<String>, kind: &str) -> Button {
    Button { title: title.into(), payload: payload.into(), kind: kind.to_string() }
}

/// `/intent{json}` payload understood by the dialogue engine.
pub fn intent_payload(intent: &str, entities: Option<Value>) -> String {
    match entities {
        Some(v) => format!("/{}{}", intent, v),
        None => format!("/{}", intent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payloads_embed_escaped_json() {
        assert_eq!(intent_payload("view_appointments", None), "/view_appointments");
        assert_eq!(
            intent_payload("get_legal_document", Some(json!({"document_id": "12"}))),
            r#"/get_legal_document{"document_id":"12"}"#
        );
        assert_eq!(
            intent_payload("x", Some(json!({"service_type": "tư vấn \"nhanh\""}))),
            r#"/x{"service_type":"tư vấn \"nhanh\""}"#
        );
    }

    #[test]
    fn collects_messages_in_order() {
        let mut d = Dispatcher::new();
        d.utter_message("a");
        d.send_text_with_buttons("b", vec![create_button("Xem", "/x")]);
        let msgs = d.into_messages();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[1].buttons[0].kind, "postback");
    }
}
