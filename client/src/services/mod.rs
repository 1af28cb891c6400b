//! Domain services and their fallback-wrapped facades
//!
//! Each domain has a trait with a fixed method set. The live REST client and
//! the mock dataset both implement it, and a facade combines the two with the
//! local cache so that callers get the same [`Envelope`] whichever answered.

pub mod ai;
pub mod auth;
pub mod exercise;
pub mod fallback;
pub mod nutrition;
pub mod progress;
pub mod workout;

pub use ai::AiChatFacade;
pub use auth::AuthFacade;
pub use exercise::ExerciseFacade;
pub use fallback::FallbackGuard;
pub use nutrition::NutritionFacade;
pub use progress::ProgressFacade;
pub use workout::WorkoutFacade;

use crate::error::ClientResult;
use async_trait::async_trait;
use fitness_coach_shared::{
    AuthSession, ChatReply, ChatRequest, EntityId, Exercise, LoginRequest, NutritionPlan,
    ProgressEntry, User, WorkoutPlan,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[async_trait]
pub trait WorkoutService: Send + Sync {
    async fn list_plans(&self, user_id: i64) -> ClientResult<Vec<WorkoutPlan>>;

    async fn get_plan(&self, id: EntityId) -> ClientResult<WorkoutPlan>;

    async fn create_plan(&self, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan>;

    async fn update_plan(&self, id: EntityId, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan>;

    async fn delete_plan(&self, id: EntityId) -> ClientResult<()>;
}

#[async_trait]
pub trait NutritionService: Send + Sync {
    async fn list_plans(&self, user_id: i64) -> ClientResult<Vec<NutritionPlan>>;

    async fn get_plan(&self, id: EntityId) -> ClientResult<NutritionPlan>;

    async fn create_plan(&self, plan: &NutritionPlan) -> ClientResult<NutritionPlan>;

    async fn update_plan(&self, id: EntityId, plan: &NutritionPlan) -> ClientResult<NutritionPlan>;

    async fn delete_plan(&self, id: EntityId) -> ClientResult<()>;
}

#[async_trait]
pub trait ProgressService: Send + Sync {
    async fn list_entries(&self, user_id: i64) -> ClientResult<Vec<ProgressEntry>>;

    async fn create_entry(&self, entry: &ProgressEntry) -> ClientResult<ProgressEntry>;

    async fn update_entry(
        &self,
        id: EntityId,
        entry: &ProgressEntry,
    ) -> ClientResult<ProgressEntry>;

    async fn delete_entry(&self, id: EntityId) -> ClientResult<()>;
}

#[async_trait]
pub trait ExerciseService: Send + Sync {
    /// Catalog exercises, optionally limited to one muscle group
    async fn list_exercises(&self, muscle_group: Option<&str>) -> ClientResult<Vec<Exercise>>;

    async fn get_exercise(&self, id: i64) -> ClientResult<Exercise>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ClientResult<AuthSession>;

    async fn current_user(&self) -> ClientResult<User>;
}

#[async_trait]
pub trait AiChatService: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatReply>;
}

/// Picks one session of a plan, or one meal
///
/// Labels match a session's day of week or a meal's name, ignoring case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(i64),
    Label(String),
    Index(usize),
}

impl Selector {
    pub fn position<T>(
        &self,
        items: &[T],
        id: impl Fn(&T) -> Option<i64>,
        label: impl Fn(&T) -> &str,
    ) -> Option<usize> {
        match self {
            Selector::Id(wanted) => items.iter().position(|item| id(item) == Some(*wanted)),
            Selector::Label(wanted) => items
                .iter()
                .position(|item| label(item).trim().to_lowercase() == wanted.trim().to_lowercase()),
            Selector::Index(i) => (*i < items.len()).then_some(*i),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Id(id) => write!(f, "#{}", id),
            Selector::Label(label) => write!(f, "'{}'", label),
            Selector::Index(i) => write!(f, "at position {}", i),
        }
    }
}

/// Where a facade result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Live,
    Cache,
    Mock,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Live => write!(f, "live"),
            DataSource::Cache => write!(f, "cache"),
            DataSource::Mock => write!(f, "mock"),
        }
    }
}

/// Uniform facade result: `{data: ...}` whichever path answered
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Envelope<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            source: DataSource::Live,
        }
    }

    pub fn cache(data: T) -> Self {
        Self {
            data,
            source: DataSource::Cache,
        }
    }

    pub fn mock(data: T) -> Self {
        Self {
            data,
            source: DataSource::Mock,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source != DataSource::Live
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            data: f(self.data),
            source: self.source,
        }
    }
}
