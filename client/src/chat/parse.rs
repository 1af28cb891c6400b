//! Tolerant parsing of conversational service replies
//!
//! The same endpoint may answer in several envelopes. Each matcher recognizes
//! one shape and returns `None` otherwise; the first match wins. Matchers that
//! unwrap a layer feed the inner value back through the whole list.

use fitness_coach_shared::strip_code_fence;
use serde_json::Value;

/// Reply text plus the optional structured payload and action
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedReply {
    pub message: String,
    pub data: Option<Value>,
    pub action: Option<Value>,
}

impl ParsedReply {
    fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    fn from_object(message: &str, object: &Value) -> Self {
        Self {
            message: message.to_string(),
            data: non_null(object.get("data")),
            action: non_null(object.get("action")),
        }
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

type Matcher = fn(&Value, usize) -> Option<ParsedReply>;

const MATCHERS: &[(&str, Matcher)] = &[
    ("array", match_array),
    ("output", match_output),
    ("n8n_envelope", match_n8n_envelope),
    ("legacy_agent", match_legacy_agent),
    ("backend", match_backend),
    ("plain_text", match_plain_text),
];

/// Unwrapping stops after this many nested layers
const MAX_DEPTH: usize = 4;

/// Parse a reply body; `None` when no shape matches
pub fn parse_reply(body: &Value) -> Option<ParsedReply> {
    parse_at(body, 0)
}

fn parse_at(body: &Value, depth: usize) -> Option<ParsedReply> {
    if depth > MAX_DEPTH {
        return None;
    }
    MATCHERS.iter().find_map(|(name, matcher)| {
        let parsed = matcher(body, depth)?;
        tracing::trace!(shape = name, depth, "Matched reply shape");
        Some(parsed)
    })
}

/// `[reply, ...]`: workflow tools often answer with a one-element list
fn match_array(body: &Value, depth: usize) -> Option<ParsedReply> {
    let first = body.as_array()?.first()?;
    parse_at(first, depth + 1)
}

/// `{output: "<json or text>"}`, possibly inside a Markdown code fence
fn match_output(body: &Value, depth: usize) -> Option<ParsedReply> {
    let output = body.get("output")?;
    match output {
        Value::String(text) => {
            let inner = strip_code_fence(text);
            match serde_json::from_str::<Value>(inner) {
                Ok(value) if value.is_object() || value.is_array() => parse_at(&value, depth + 1),
                _ => Some(ParsedReply::text(text.trim())),
            }
        }
        other => parse_at(other, depth + 1),
    }
}

/// `{success, message, data: {mensaje_agente, data?, action?}}`
fn match_n8n_envelope(body: &Value, _depth: usize) -> Option<ParsedReply> {
    let inner = body.get("data")?;
    let message = inner.get("mensaje_agente")?.as_str()?;
    Some(ParsedReply::from_object(message, inner))
}

/// `{mensaje_agente, data?, action?}`
fn match_legacy_agent(body: &Value, _depth: usize) -> Option<ParsedReply> {
    let message = body.get("mensaje_agente")?.as_str()?;
    Some(ParsedReply::from_object(message, body))
}

/// `{message, data?, action?}`
fn match_backend(body: &Value, _depth: usize) -> Option<ParsedReply> {
    let message = body.get("message")?.as_str()?;
    Some(ParsedReply::from_object(message, body))
}

/// A bare string, which may itself hold fenced JSON
fn match_plain_text(body: &Value, depth: usize) -> Option<ParsedReply> {
    let text = body.as_str()?;
    let inner = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str::<Value>(inner) {
        if value.is_object() || value.is_array() {
            if let Some(parsed) = parse_at(&value, depth + 1) {
                return Some(parsed);
            }
        }
    }
    Some(ParsedReply::text(text.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::backend(json!({ "message": "Hola" }), "Hola")]
    #[case::legacy(json!({ "mensaje_agente": "Hola" }), "Hola")]
    #[case::n8n(
        json!({ "success": true, "message": "ok", "data": { "mensaje_agente": "Hola" } }),
        "Hola"
    )]
    #[case::array(json!([{ "mensaje_agente": "Hola" }]), "Hola")]
    #[case::output_json(json!({ "output": "{\"mensaje_agente\": \"Hola\"}" }), "Hola")]
    #[case::output_fenced(json!({ "output": "```json\n{\"message\": \"Hola\"}\n```" }), "Hola")]
    #[case::output_text(json!({ "output": "Hola" }), "Hola")]
    #[case::array_of_output(
        json!([{ "output": "```\n{\"mensaje_agente\": \"Hola\"}\n```" }]),
        "Hola"
    )]
    #[case::plain(json!("Hola"), "Hola")]
    #[case::plain_fenced(json!("```json\n{\"message\": \"Hola\"}\n```"), "Hola")]
    fn test_shapes(#[case] body: Value, #[case] expected: &str) {
        assert_eq!(parse_reply(&body).unwrap().message, expected);
    }

    #[test]
    fn test_n8n_envelope_takes_precedence_over_outer_message() {
        let body = json!({
            "success": true,
            "message": "Mensaje procesado",
            "data": {
                "mensaje_agente": "Tu plan está listo",
                "data": { "name": "Fuerza" },
                "action": { "type": "CREATE_WORKOUT_PLAN" }
            }
        });
        let parsed = parse_reply(&body).unwrap();
        assert_eq!(parsed.message, "Tu plan está listo");
        assert_eq!(parsed.data, Some(json!({ "name": "Fuerza" })));
        assert_eq!(parsed.action, Some(json!({ "type": "CREATE_WORKOUT_PLAN" })));
    }

    #[test]
    fn test_null_fields_are_absent() {
        let parsed = parse_reply(&json!({ "message": "Hola", "data": null })).unwrap();
        assert!(parsed.data.is_none());
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert!(parse_reply(&json!({ "unexpected": true })).is_none());
        assert!(parse_reply(&json!([])).is_none());
        assert!(parse_reply(&json!(42)).is_none());
    }

    #[test]
    fn test_deep_nesting_stops() {
        let mut body = json!({ "message": "Hola" });
        for _ in 0..10 {
            body = json!([body]);
        }
        assert!(parse_reply(&body).is_none());
    }
}
