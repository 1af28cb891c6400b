//! Common test utilities for integration tests
//!
//! Every test gets its own stub backend and an in-memory cache.

#![allow(dead_code)]

use fitness_coach_client::config::AppConfig;
use fitness_coach_client::store::MemoryStore;
use fitness_coach_client::{ClientState, Notification};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use wiremock::matchers::{any, method, path};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

/// Client wired against a stub backend
pub struct TestClient {
    pub server: MockServer,
    pub state: ClientState,
    pub notifications: broadcast::Receiver<Notification>,
}

impl TestClient {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Start from the defaults and adjust before wiring
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let server = MockServer::start().await;
        let config = test_config(&server, adjust);
        let state = ClientState::new(config, Arc::new(MemoryStore::new()))
            .expect("Failed to build client state");
        let notifications = state.notifier.subscribe();

        Self {
            server,
            state,
            notifications,
        }
    }

    /// Every route answers 503
    pub async fn backend_down(&self) {
        self.server.reset().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&self.server)
            .await;
    }

    /// Clear every stub and answer the health route
    pub async fn backend_up(&self) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Fitness Coach API"
            })))
            .mount(&self.server)
            .await;
    }

    /// Notifications received so far, without waiting
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        let mut received = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            received.push(notification);
        }
        received
    }
}

fn test_config(server: &MockServer, adjust: impl FnOnce(&mut AppConfig)) -> AppConfig {
    let mut config = AppConfig::default();
    config.api.base_url = server.uri();
    config.api.request_timeout_secs = 2;
    config.probe.timeout_secs = 1;
    config.probe.interval_secs = 1;
    config.chat.webhook_url = format!("{}/webhook/chat", server.uri());
    config.chat.deepseek_url = server.uri();
    adjust(&mut config);
    config
}

/// Matches JSON bodies without a top-level `id`
pub struct WithoutId;

impl Match for WithoutId {
    fn matches(&self, request: &Request) -> bool {
        serde_json::from_slice::<Value>(&request.body)
            .map(|body| body.is_object() && body.get("id").is_none())
            .unwrap_or(false)
    }
}
