//! Conversion between cached entities and backend JSON
//!
//! The backend knows nothing about temporary ids: it sends and receives bare
//! integer `id` fields. Inbound ids are always server ids whatever their
//! magnitude; outbound temporary ids are removed so the server assigns one.

use crate::error::ClientResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Envelope keys the backend may wrap a payload in
const ENVELOPE_KEYS: &[&str] = &["data", "success", "message", "count", "total"];

/// Unwrap `{data: ...}` envelopes, leaving bare bodies untouched
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("data")
                && map.keys().all(|k| ENVELOPE_KEYS.contains(&k.as_str())) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn tag_id(object: &mut Map<String, Value>) {
    if let Some(server_id) = object.get("id").and_then(Value::as_i64) {
        object.insert(
            "id".to_string(),
            json!({ "kind": "persisted", "server_id": server_id }),
        );
    }
}

/// Mark every top-level `id` in a backend body as a server id
pub fn tag_server_ids(mut value: Value) -> Value {
    match &mut value {
        Value::Object(object) => tag_id(object),
        Value::Array(items) => items.iter_mut().for_each(|item| {
            if let Value::Object(object) = item {
                tag_id(object);
            }
        }),
        _ => {}
    }
    value
}

/// Decode a backend response body into an entity or list of entities
pub fn decode<T: DeserializeOwned>(body: Value) -> ClientResult<T> {
    Ok(serde_json::from_value(tag_server_ids(unwrap_data(body)))?)
}

/// Encode an entity for the backend
///
/// Persisted ids are flattened to integers and temporary ids are dropped.
pub fn encode<T: Serialize>(entity: &T) -> ClientResult<Value> {
    let mut value = serde_json::to_value(entity)?;
    if let Value::Object(object) = &mut value {
        let server_id = object
            .get("id")
            .and_then(|id| id.get("server_id"))
            .and_then(Value::as_i64);
        match server_id {
            Some(id) => {
                object.insert("id".to_string(), Value::from(id));
            }
            None => {
                object.remove("id");
            }
        }
    }
    Ok(value)
}
