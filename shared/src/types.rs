//! API request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Chat message sent to the backend AI route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub user_id: i64,
}

/// Reply from the backend AI route
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatReply {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Value>,
}

/// Body of a chat message posted to the automation webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChatMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub token: String,
    pub data: WebhookChatData,
}

/// Sender and text of a webhook chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookChatData {
    pub nombre_usuario: String,
    pub mensaje: String,
}

impl WebhookChatMessage {
    pub const KIND: &'static str = "mensaje_chat";

    pub fn new(
        token: impl Into<String>,
        user_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            token: token.into(),
            data: WebhookChatData {
                nombre_usuario: user_name.into(),
                mensaje: message.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_webhook_message_shape() {
        let msg = WebhookChatMessage::new("demo-token", "Ana", "Hola");
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "type": "mensaje_chat",
                "token": "demo-token",
                "data": { "nombre_usuario": "Ana", "mensaje": "Hola" }
            })
        );
    }

    #[test]
    fn test_login_request_validation() {
        let ok = LoginRequest {
            email: "demo@example.com".to_string(),
            password: "secret".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad = LoginRequest {
            email: "not-an-email".to_string(),
            password: String::new(),
        };
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_chat_request_uses_camel_case() {
        let req = ChatRequest {
            message: "plan".to_string(),
            user_id: 1,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "message": "plan", "userId": 1 })
        );
    }
}
