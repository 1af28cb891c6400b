//! Conversational service transports
//!
//! Every transport returns the raw reply body as JSON; shape handling lives in
//! [`super::parse`]. A non-JSON body comes back as a JSON string.

use crate::config::ChatConfig;
use crate::error::{ClientError, ClientResult};
use crate::services::AiChatFacade;
use crate::store::LocalCache;
use async_trait::async_trait;
use fitness_coach_shared::WebhookChatMessage;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str, user_id: i64) -> ClientResult<Value>;
}

async fn read_body(response: reqwest::Response) -> ClientResult<Value> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ClientError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

fn http_client(config: &ChatConfig) -> ClientResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_secs))
        .build()?)
}

/// The backend's own `/api/ai/chat` route, through the fallback facade
pub struct BackendChatTransport {
    ai: AiChatFacade,
}

impl BackendChatTransport {
    pub fn new(ai: AiChatFacade) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl ChatTransport for BackendChatTransport {
    fn name(&self) -> &'static str {
        "backend"
    }

    async fn send(&self, message: &str, user_id: i64) -> ClientResult<Value> {
        let reply = self.ai.chat(message, user_id).await;
        debug!(source = %reply.source, "Backend chat reply");
        Ok(serde_json::to_value(reply.data)?)
    }
}

/// Workflow-automation webhook
pub struct N8nTransport {
    http: reqwest::Client,
    url: String,
    user_name: String,
    cache: Arc<LocalCache>,
}

impl N8nTransport {
    pub fn new(config: &ChatConfig, cache: Arc<LocalCache>) -> ClientResult<Self> {
        Ok(Self {
            http: http_client(config)?,
            url: config.webhook_url.clone(),
            user_name: config.user_name.clone(),
            cache,
        })
    }
}

#[async_trait]
impl ChatTransport for N8nTransport {
    fn name(&self) -> &'static str {
        "n8n"
    }

    async fn send(&self, message: &str, _user_id: i64) -> ClientResult<Value> {
        let token = self.cache.token().unwrap_or_default();
        let body = WebhookChatMessage::new(token, &self.user_name, message);
        let response = self.http.post(&self.url).json(&body).send().await?;
        read_body(response).await
    }
}

const SYSTEM_PROMPT: &str = "You are a personal fitness and nutrition coach. Answer in the \
user's language, briefly and concretely. When the user asks you to create or change a workout \
plan, a nutrition plan, or to record progress or a completed session or meal, append one block \
per operation in the form [ACTION:TAG]{json}[/ACTION] where TAG is one of CREATE_WORKOUT_PLAN, \
UPDATE_WORKOUT_PLAN, CREATE_NUTRITION_PLAN, UPDATE_NUTRITION_PLAN, LOG_PROGRESS, \
COMPLETE_SESSION or COMPLETE_MEAL. Workout plans have name, description and sessions \
(day_of_week, focus_area, duration_minutes, exercises with name, sets, reps or duration_seconds, \
rest_seconds). Nutrition plans have name, daily_calories, protein_grams, carbs_grams, fat_grams \
and meals (name, time as HH:MM, calories, foods). Progress entries have date (YYYY-MM-DD), \
weight in kg and optional body_fat_percentage. Write valid JSON only inside the blocks.";

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionContent,
}

#[derive(Debug, Deserialize)]
struct CompletionContent {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions endpoint
pub struct DeepSeekTransport {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl DeepSeekTransport {
    pub fn new(config: &ChatConfig) -> ClientResult<Self> {
        Ok(Self {
            http: http_client(config)?,
            base_url: config.deepseek_url.trim_end_matches('/').to_string(),
            model: config.deepseek_model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ChatTransport for DeepSeekTransport {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn send(&self, message: &str, _user_id: i64) -> ClientResult<Value> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                CompletionMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                CompletionMessage {
                    role: "user",
                    content: message,
                },
            ],
            stream: false,
        };

        let mut builder = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let body = read_body(builder.send().await?).await?;
        let completion: CompletionResponse = serde_json::from_value(body)?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ClientError::Chat("completion returned no content".to_string()))?;
        Ok(Value::String(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_webhook_envelope_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .and(body_partial_json(json!({
                "type": "mensaje_chat",
                "token": "demo-token",
                "data": { "nombre_usuario": "Ana", "mensaje": "Hola" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "mensaje_agente": "¡Hola!" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(LocalCache::in_memory());
        cache.set_token("demo-token").unwrap();
        let config = ChatConfig {
            webhook_url: format!("{}/webhook/chat", server.uri()),
            user_name: "Ana".to_string(),
            ..ChatConfig::default()
        };
        let body = N8nTransport::new(&config, cache)
            .unwrap()
            .send("Hola", 1)
            .await
            .unwrap();
        assert_eq!(body, json!({ "mensaje_agente": "¡Hola!" }));
    }

    #[tokio::test]
    async fn test_plain_text_body_becomes_string() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Hola, ¿en qué te ayudo?"))
            .mount(&server)
            .await;

        let config = ChatConfig {
            webhook_url: server.uri(),
            ..ChatConfig::default()
        };
        let body = N8nTransport::new(&config, Arc::new(LocalCache::in_memory()))
            .unwrap()
            .send("Hola", 1)
            .await
            .unwrap();
        assert_eq!(body, json!("Hola, ¿en qué te ayudo?"));
    }

    #[tokio::test]
    async fn test_deepseek_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "deepseek-chat", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Claro" } }]
            })))
            .mount(&server)
            .await;

        let config = ChatConfig {
            deepseek_url: server.uri(),
            api_key: Some(SecretString::new("sk-test".to_string())),
            ..ChatConfig::default()
        };
        let body = DeepSeekTransport::new(&config)
            .unwrap()
            .send("Hazme un plan", 1)
            .await
            .unwrap();
        assert_eq!(body, json!("Claro"));
    }

    #[tokio::test]
    async fn test_deepseek_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let config = ChatConfig {
            deepseek_url: server.uri(),
            ..ChatConfig::default()
        };
        let result = DeepSeekTransport::new(&config).unwrap().send("Hola", 1).await;
        assert!(matches!(result, Err(ClientError::Status { status: 401, .. })));
    }
}
