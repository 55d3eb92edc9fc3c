//! Wire types of the dialogue engine's action-server webhook.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::backend_client::is_truthy;

/// Body of `POST /webhook`.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionRequest {
    pub next_action: String,
    pub sender_id: Option<String>,
    #[serde(default)]
    pub tracker: Tracker,
    #[serde(default)]
    pub domain: Value,
}

impl ActionRequest {
    /// The conversation's user id: the request's, else the tracker's.
    pub fn sender_id(&self) -> &str {
        self.sender_id
            .as_deref()
            .or(self.tracker.sender_id.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tracker {
    pub sender_id: Option<String>,
    #[serde(default)]
    pub slots: Map<String, Value>,
    #[serde(default)]
    pub latest_message: LatestMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestMessage {
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Entity {
    pub entity: String,
    #[serde(default)]
    pub value: Value,
}

impl Tracker {
    /// Slot value, `None` when unset or falsy.
    pub fn slot(&self, name: &str) -> Option<&Value> {
        self.slots.get(name).filter(|v| is_truthy(v))
    }

    /// Value of the first entity called `name` in the latest message.
    pub fn latest_entity(&self, name: &str) -> Option<&Value> {
        self.latest_message
            .entities
            .iter()
            .find(|e| e.entity == name)
            .map(|e| &e.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Button {
    pub title: String,
    pub payload: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// One bot utterance.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BotMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

/// Events returned to the dialogue engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    #[serde(rename = "slot")]
    SlotSet { name: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ActionResponse {
    pub events: Vec<Event>,
    pub responses: Vec<BotMessage>,
}
