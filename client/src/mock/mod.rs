//! Static demo dataset served when neither the backend nor the cache can answer
//!
//! The dataset is compiled into the binary. Mutating calls echo their input
//! back with a temporary id and keep nothing.

use crate::error::{ClientError, ClientResult};
use crate::services::{
    AiChatService, AuthService, ExerciseService, NutritionService, ProgressService, WorkoutService,
};
use async_trait::async_trait;
use chrono::Utc;
use fitness_coach_shared::{
    AuthSession, ChatReply, ChatRequest, Entity, EntityId, Exercise, LoginRequest, NutritionPlan,
    ProgressEntry, User, WorkoutPlan,
};
use once_cell::sync::Lazy;
use serde::Deserialize;

pub const DEMO_TOKEN: &str = "demo-token";

pub const APOLOGY_MESSAGE: &str =
    "Lo siento, ahora mismo no puedo conectar con el asistente. \
     Inténtalo de nuevo en unos minutos.";

static BUILTIN: Lazy<MockDataset> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../data/mock_data.json"))
        .expect("bundled mock dataset is valid JSON")
});

/// Demo data for every domain service
#[derive(Debug, Clone, Deserialize)]
pub struct MockDataset {
    pub user: User,
    pub exercises: Vec<Exercise>,
    pub workout_plans: Vec<WorkoutPlan>,
    pub nutrition_plans: Vec<NutritionPlan>,
    pub progress: Vec<ProgressEntry>,
}

impl MockDataset {
    /// The dataset bundled with the client
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    pub fn workout_plans_for(&self, user_id: i64) -> Vec<WorkoutPlan> {
        owned_by(&self.workout_plans, user_id, |p| p.user_id)
    }

    pub fn nutrition_plans_for(&self, user_id: i64) -> Vec<NutritionPlan> {
        owned_by(&self.nutrition_plans, user_id, |p| p.user_id)
    }

    pub fn progress_for(&self, user_id: i64) -> Vec<ProgressEntry> {
        owned_by(&self.progress, user_id, |e| e.user_id)
    }

    pub fn exercises_in(&self, muscle_group: Option<&str>) -> Vec<Exercise> {
        match muscle_group {
            None => self.exercises.clone(),
            Some(group) => self
                .exercises
                .iter()
                .filter(|e| {
                    e.muscle_group
                        .as_deref()
                        .is_some_and(|g| g.eq_ignore_ascii_case(group))
                })
                .cloned()
                .collect(),
        }
    }

    pub fn demo_session(&self) -> AuthSession {
        AuthSession {
            token: DEMO_TOKEN.to_string(),
            user: self.user.clone(),
        }
    }

    pub fn apology() -> ChatReply {
        ChatReply {
            message: APOLOGY_MESSAGE.to_string(),
            ..ChatReply::default()
        }
    }
}

fn owned_by<E: Clone>(items: &[E], user_id: i64, owner: impl Fn(&E) -> i64) -> Vec<E> {
    items.iter().filter(|e| owner(e) == user_id).cloned().collect()
}

fn find<E: Entity>(items: &[E], id: EntityId) -> ClientResult<E> {
    items
        .iter()
        .find(|e| e.id() == Some(id))
        .cloned()
        .ok_or(ClientError::Unavailable)
}

/// Echo a write back as if the server had accepted it
pub fn echo<E: Entity>(mut entity: E, id: Option<EntityId>) -> E {
    entity.set_id(id.or_else(|| Some(EntityId::new_temporary())));
    entity.touch(Utc::now());
    entity
}

#[async_trait]
impl WorkoutService for MockDataset {
    async fn list_plans(&self, user_id: i64) -> ClientResult<Vec<WorkoutPlan>> {
        Ok(self.workout_plans_for(user_id))
    }

    async fn get_plan(&self, id: EntityId) -> ClientResult<WorkoutPlan> {
        find(&self.workout_plans, id)
    }

    async fn create_plan(&self, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan> {
        Ok(echo(plan.clone(), None))
    }

    async fn update_plan(&self, id: EntityId, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan> {
        Ok(echo(plan.clone(), Some(id)))
    }

    async fn delete_plan(&self, _id: EntityId) -> ClientResult<()> {
        Ok(())
    }
}

#[async_trait]
impl NutritionService for MockDataset {
    async fn list_plans(&self, user_id: i64) -> ClientResult<Vec<NutritionPlan>> {
        Ok(self.nutrition_plans_for(user_id))
    }

    async fn get_plan(&self, id: EntityId) -> ClientResult<NutritionPlan> {
        find(&self.nutrition_plans, id)
    }

    async fn create_plan(&self, plan: &NutritionPlan) -> ClientResult<NutritionPlan> {
        Ok(echo(plan.clone(), None))
    }

    async fn update_plan(&self, id: EntityId, plan: &NutritionPlan) -> ClientResult<NutritionPlan> {
        Ok(echo(plan.clone(), Some(id)))
    }

    async fn delete_plan(&self, _id: EntityId) -> ClientResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ProgressService for MockDataset {
    async fn list_entries(&self, user_id: i64) -> ClientResult<Vec<ProgressEntry>> {
        Ok(self.progress_for(user_id))
    }

    async fn create_entry(&self, entry: &ProgressEntry) -> ClientResult<ProgressEntry> {
        Ok(echo(entry.clone(), None))
    }

    async fn update_entry(
        &self,
        id: EntityId,
        entry: &ProgressEntry,
    ) -> ClientResult<ProgressEntry> {
        Ok(echo(entry.clone(), Some(id)))
    }

    async fn delete_entry(&self, _id: EntityId) -> ClientResult<()> {
        Ok(())
    }
}

#[async_trait]
impl ExerciseService for MockDataset {
    async fn list_exercises(&self, muscle_group: Option<&str>) -> ClientResult<Vec<Exercise>> {
        Ok(self.exercises_in(muscle_group))
    }

    async fn get_exercise(&self, id: i64) -> ClientResult<Exercise> {
        self.exercises
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(ClientError::Unavailable)
    }
}

#[async_trait]
impl AuthService for MockDataset {
    async fn login(&self, _request: &LoginRequest) -> ClientResult<AuthSession> {
        Ok(self.demo_session())
    }

    async fn current_user(&self) -> ClientResult<User> {
        Ok(self.user.clone())
    }
}

#[async_trait]
impl AiChatService for MockDataset {
    async fn chat(&self, _request: &ChatRequest) -> ClientResult<ChatReply> {
        Ok(Self::apology())
    }
}
