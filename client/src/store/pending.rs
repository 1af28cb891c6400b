//! Write intents recorded while the backend was unreachable

use chrono::{DateTime, Utc};
use fitness_coach_shared::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Domain service a queued call belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ServiceName {
    Workout,
    Nutrition,
    Progress,
    Exercise,
    Auth,
    AiChat,
}

impl ServiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceName::Workout => "workout",
            ServiceName::Nutrition => "nutrition",
            ServiceName::Progress => "progress",
            ServiceName::Exercise => "exercise",
            ServiceName::Auth => "auth",
            ServiceName::AiChat => "ai_chat",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued service call awaiting replay
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRequest {
    /// Entry identity, used to clear exactly the replayed entries
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub service: ServiceName,
    pub method: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Cached entity the call writes, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityId>,
    #[serde(default = "Utc::now")]
    pub enqueued_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn new(service: ServiceName, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            service,
            method: method.into(),
            args,
            target: None,
            enqueued_at: Utc::now(),
        }
    }

    pub fn with_target(mut self, target: Option<EntityId>) -> Self {
        self.target = target;
        self
    }

    pub fn is_delete(&self) -> bool {
        self.method.starts_with("delete")
    }
}
