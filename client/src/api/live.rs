//! Live implementations of the domain service traits

use super::{wire, ApiClient, RestResource};
use crate::error::ClientResult;
use crate::services::{
    AiChatService, AuthService, ExerciseService, NutritionService, ProgressService, WorkoutService,
};
use async_trait::async_trait;
use fitness_coach_shared::{
    AuthSession, ChatReply, ChatRequest, EntityId, Exercise, LoginRequest, NutritionPlan,
    ProgressEntry, User, WorkoutPlan,
};
use reqwest::Method;

pub const WORKOUT_PLANS_PATH: &str = "/api/workouts/plans";
pub const NUTRITION_PLANS_PATH: &str = "/api/nutrition/plans";
pub const PROGRESS_PATH: &str = "/api/progress";
pub const EXERCISES_PATH: &str = "/api/exercises";
pub const LOGIN_PATH: &str = "/api/users/login";
pub const CURRENT_USER_PATH: &str = "/api/users/me";
pub const AI_CHAT_PATH: &str = "/api/ai/chat";

pub struct LiveWorkoutService {
    plans: RestResource<WorkoutPlan>,
}

impl LiveWorkoutService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            plans: RestResource::new(api, WORKOUT_PLANS_PATH),
        }
    }
}

#[async_trait]
impl WorkoutService for LiveWorkoutService {
    async fn list_plans(&self, user_id: i64) -> ClientResult<Vec<WorkoutPlan>> {
        self.plans.list(user_id).await
    }

    async fn get_plan(&self, id: EntityId) -> ClientResult<WorkoutPlan> {
        self.plans.get(id).await
    }

    async fn create_plan(&self, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan> {
        self.plans.create(plan).await
    }

    async fn update_plan(&self, id: EntityId, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan> {
        self.plans.update(id, plan).await
    }

    async fn delete_plan(&self, id: EntityId) -> ClientResult<()> {
        self.plans.delete(id).await
    }
}

pub struct LiveNutritionService {
    plans: RestResource<NutritionPlan>,
}

impl LiveNutritionService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            plans: RestResource::new(api, NUTRITION_PLANS_PATH),
        }
    }
}

#[async_trait]
impl NutritionService for LiveNutritionService {
    async fn list_plans(&self, user_id: i64) -> ClientResult<Vec<NutritionPlan>> {
        self.plans.list(user_id).await
    }

    async fn get_plan(&self, id: EntityId) -> ClientResult<NutritionPlan> {
        self.plans.get(id).await
    }

    async fn create_plan(&self, plan: &NutritionPlan) -> ClientResult<NutritionPlan> {
        self.plans.create(plan).await
    }

    async fn update_plan(&self, id: EntityId, plan: &NutritionPlan) -> ClientResult<NutritionPlan> {
        self.plans.update(id, plan).await
    }

    async fn delete_plan(&self, id: EntityId) -> ClientResult<()> {
        self.plans.delete(id).await
    }
}

pub struct LiveProgressService {
    entries: RestResource<ProgressEntry>,
}

impl LiveProgressService {
    pub fn new(api: ApiClient) -> Self {
        Self {
            entries: RestResource::new(api, PROGRESS_PATH),
        }
    }
}

#[async_trait]
impl ProgressService for LiveProgressService {
    async fn list_entries(&self, user_id: i64) -> ClientResult<Vec<ProgressEntry>> {
        self.entries.list(user_id).await
    }

    async fn create_entry(&self, entry: &ProgressEntry) -> ClientResult<ProgressEntry> {
        self.entries.create(entry).await
    }

    async fn update_entry(
        &self,
        id: EntityId,
        entry: &ProgressEntry,
    ) -> ClientResult<ProgressEntry> {
        self.entries.update(id, entry).await
    }

    async fn delete_entry(&self, id: EntityId) -> ClientResult<()> {
        self.entries.delete(id).await
    }
}

pub struct LiveExerciseService {
    api: ApiClient,
}

impl LiveExerciseService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ExerciseService for LiveExerciseService {
    async fn list_exercises(&self, muscle_group: Option<&str>) -> ClientResult<Vec<Exercise>> {
        let query: Vec<(&str, String)> = muscle_group
            .map(|group| vec![("muscle_group", group.to_string())])
            .unwrap_or_default();
        let body = self.api.get_json(EXERCISES_PATH, &query).await?;
        Ok(serde_json::from_value(wire::unwrap_data(body))?)
    }

    async fn get_exercise(&self, id: i64) -> ClientResult<Exercise> {
        let body = self
            .api
            .get_json(&format!("{}/{}", EXERCISES_PATH, id), &[])
            .await?;
        Ok(serde_json::from_value(wire::unwrap_data(body))?)
    }
}

pub struct LiveAuthService {
    api: ApiClient,
}

impl LiveAuthService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AuthService for LiveAuthService {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthSession> {
        let body = self
            .api
            .send_json(Method::POST, LOGIN_PATH, &serde_json::to_value(request)?)
            .await?;
        Ok(serde_json::from_value(wire::unwrap_data(body))?)
    }

    async fn current_user(&self) -> ClientResult<User> {
        let body = self.api.get_json(CURRENT_USER_PATH, &[]).await?;
        Ok(serde_json::from_value(wire::unwrap_data(body))?)
    }
}

pub struct LiveAiChatService {
    api: ApiClient,
}

impl LiveAiChatService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl AiChatService for LiveAiChatService {
    /// The reply keeps its own `data` field, so the envelope is not unwrapped
    async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatReply> {
        let body = self
            .api
            .send_json(Method::POST, AI_CHAT_PATH, &serde_json::to_value(request)?)
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}
