use serde_json::{Map, Value};

use crate::actions::protocol::Tracker;
use crate::services::backend_client::is_truthy;

/// Placeholder for a field the backend did not return.
pub const MISSING_FIELD: &str = "Chưa cập nhật";

/// Values for `names`: the latest message's entity when truthy, else the
/// slot when truthy. Names with neither are left out.
pub fn extract_entities(tracker: &Tracker, names: &[&str]) -> Map<String, Value> {
    let mut found = Map::new();
    for name in names {
        let value = tracker
            .latest_entity(name)
            .filter(|v| is_truthy(v))
            .or_else(|| tracker.slot(name));
        if let Some(v) = value {
            found.insert(name.to_string(), v.clone());
        }
    }
    found
}

/// Text form of a JSON value: strings unquoted, everything else as JSON.
pub fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Text of `obj[key]`, or the missing-field placeholder.
pub fn field_text(obj: &Value, key: &str) -> String {
    match obj.get(key) {
        None | Some(Value::Null) => MISSING_FIELD.to_string(),
        Some(v) => value_text(v),
    }
}

/// Text of `obj[key]` when truthy.
pub fn optional_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).filter(|v| is_truthy(v)).map(value_text)
}

pub fn to_query_params(entities: &Map<String, Value>) -> Vec<(String, String)> {
    entities.iter().map(|(k, v)| (k.clone(), value_text(v))).collect()
}
