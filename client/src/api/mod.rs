//! Live backend REST client
//!
//! [`ApiClient`] is the one HTTP client every live service shares. It adds the
//! cached bearer token, treats any non-2xx answer as an error and hands back
//! raw JSON; [`wire`] turns that JSON into entities.

pub mod live;
pub mod wire;

pub use live::{
    LiveAiChatService, LiveAuthService, LiveExerciseService, LiveNutritionService,
    LiveProgressService, LiveWorkoutService,
};

use crate::config::ApiConfig;
use crate::error::{ClientError, ClientResult};
use crate::store::LocalCache;
use fitness_coach_shared::{Entity, EntityId};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// Shared HTTP client for the backend REST API
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<LocalCache>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, cache: Arc<LocalCache>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.http.request(method, self.url(path));
        match self.cache.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// GET a JSON body
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> ClientResult<Value> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        Self::read_json(response).await
    }

    /// Send a JSON body with the given method and read the JSON answer
    pub async fn send_json(&self, method: Method, path: &str, body: &Value) -> ClientResult<Value> {
        let response = self.request(method, path).json(body).send().await?;
        Self::read_json(response).await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let response = self.request(Method::DELETE, path).send().await?;
        Self::read_json(response).await.map(|_| ())
    }

    async fn read_json(response: Response) -> ClientResult<Value> {
        let status = response.status();
        let url = response.url().path().to_string();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(%url, status = status.as_u16(), bytes = body.len(), "Backend response");
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// CRUD collection of one entity type under a REST path
pub struct RestResource<E> {
    api: ApiClient,
    path: &'static str,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> RestResource<E> {
    pub fn new(api: ApiClient, path: &'static str) -> Self {
        Self {
            api,
            path,
            _entity: PhantomData,
        }
    }

    fn item_path(&self, id: EntityId) -> ClientResult<String> {
        Ok(format!("{}/{}", self.path, id.require_persisted()?))
    }

    pub async fn list(&self, user_id: i64) -> ClientResult<Vec<E>> {
        let body = self
            .api
            .get_json(self.path, &[("user_id", user_id.to_string())])
            .await?;
        wire::decode(body)
    }

    pub async fn get(&self, id: EntityId) -> ClientResult<E> {
        let body = self.api.get_json(&self.item_path(id)?, &[]).await?;
        wire::decode(body)
    }

    pub async fn create(&self, entity: &E) -> ClientResult<E> {
        let body = self
            .api
            .send_json(Method::POST, self.path, &wire::encode(entity)?)
            .await?;
        self.acknowledged(body, entity)
    }

    pub async fn update(&self, id: EntityId, entity: &E) -> ClientResult<E> {
        let path = self.item_path(id)?;
        let body = self
            .api
            .send_json(Method::PUT, &path, &wire::encode(entity)?)
            .await?;
        let mut updated = self.acknowledged(body, entity)?;
        if updated.id().is_none() {
            updated.set_id(Some(id));
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: EntityId) -> ClientResult<()> {
        self.api.delete(&self.item_path(id)?).await
    }

    /// The entity the server echoed back, or the sent one with the id it assigned
    fn acknowledged(&self, body: Value, sent: &E) -> ClientResult<E> {
        let body = wire::unwrap_data(body);
        if body.get("name").is_some() || body.get("date").is_some() {
            return wire::decode(body);
        }

        // Bare `{id}` acknowledgements
        let mut entity = sent.clone();
        let server_id = body
            .get("id")
            .or_else(|| body.get("insertId"))
            .and_then(Value::as_i64);
        entity.set_id(server_id.map(EntityId::persisted));
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitness_coach_shared::WorkoutPlan;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, cache: Arc<LocalCache>) -> ApiClient {
        let config = ApiConfig {
            base_url: server.uri(),
            request_timeout_secs: 2,
        };
        ApiClient::new(&config, cache).unwrap()
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent_when_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/workouts/plans"))
            .and(query_param("user_id", "1"))
            .and(header("authorization", "Bearer demo-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let cache = Arc::new(LocalCache::in_memory());
        cache.set_token("demo-token").unwrap();
        let plans: RestResource<WorkoutPlan> =
            RestResource::new(client(&server, cache), "/api/workouts/plans");
        assert!(plans.list(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_success_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let api = client(&server, Arc::new(LocalCache::in_memory()));
        match api.get_json("/api/progress", &[]).await {
            Err(ClientError::Status { status, body }) => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_sends_no_temporary_id_and_accepts_bare_ack() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/workouts/plans"))
            .and(body_json(json!({
                "user_id": 1,
                "name": "Fuerza",
                "ai_generated": false,
                "sessions": []
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "success": true,
                "data": { "id": 42 }
            })))
            .mount(&server)
            .await;

        let plans: RestResource<WorkoutPlan> = RestResource::new(
            client(&server, Arc::new(LocalCache::in_memory())),
            "/api/workouts/plans",
        );
        let mut plan: WorkoutPlan = serde_json::from_value(json!({ "name": "Fuerza" })).unwrap();
        plan.id = Some(EntityId::new_temporary());

        let created = plans.create(&plan).await.unwrap();
        assert_eq!(created.id, Some(EntityId::persisted(42)));
        assert_eq!(created.name, "Fuerza");
    }

    #[tokio::test]
    async fn test_item_calls_refuse_temporary_ids() {
        let server = MockServer::start().await;
        let plans: RestResource<WorkoutPlan> = RestResource::new(
            client(&server, Arc::new(LocalCache::in_memory())),
            "/api/workouts/plans",
        );
        let result = plans.get(EntityId::new_temporary()).await;
        assert!(matches!(result, Err(ClientError::Id(_))));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
