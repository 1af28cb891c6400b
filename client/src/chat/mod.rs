//! Chat bridge
//!
//! Sends a user message to the configured conversational service, parses the
//! reply and turns embedded actions into facade writes. Action writes go
//! through the same fallback path as any other write, so they are cached and
//! queued while the backend is down.

pub mod parse;
pub mod transport;

pub use parse::{parse_reply, ParsedReply};
pub use transport::{BackendChatTransport, ChatTransport, DeepSeekTransport, N8nTransport};

use crate::api::wire;
use crate::error::{ClientError, ClientResult};
use crate::mock::APOLOGY_MESSAGE;
use crate::services::{DataSource, NutritionFacade, ProgressFacade, Selector, WorkoutFacade};
use chrono::{NaiveDate, Utc};
use fitness_coach_shared::{
    extract_action_blocks, strip_action_blocks, ActionTag, CompletionRecord, CompletionStatus,
    EntityId, NutritionPlan, ProgressEntry, WorkoutPlan,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One action applied on behalf of the assistant
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchedAction {
    pub tag: String,
    pub source: DataSource,
    pub summary: String,
}

/// What the user sees after a chat turn
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatOutcome {
    pub message: String,
    pub actions: Vec<DispatchedAction>,
    pub errors: Vec<String>,
}

impl ChatOutcome {
    fn apology() -> Self {
        Self {
            message: APOLOGY_MESSAGE.to_string(),
            ..Self::default()
        }
    }
}

/// Completion payload shared by COMPLETE_SESSION and COMPLETE_MEAL
#[derive(Debug, Default, Deserialize)]
struct CompletionPayload {
    plan_id: Option<EntityId>,
    session_id: Option<i64>,
    session_index: Option<usize>,
    day_of_week: Option<String>,
    meal_id: Option<i64>,
    meal_index: Option<usize>,
    meal_name: Option<String>,
    date: Option<NaiveDate>,
    status: Option<CompletionStatus>,
    completed_at: Option<String>,
    notes: Option<String>,
}

impl CompletionPayload {
    fn plan_id(&self, tag: &ActionTag) -> ClientResult<EntityId> {
        self.plan_id
            .ok_or_else(|| ClientError::Validation(format!("{} requires plan_id", tag)))
    }

    fn session(&self) -> Option<Selector> {
        self.session_id
            .map(Selector::Id)
            .or_else(|| self.session_index.map(Selector::Index))
            .or_else(|| self.day_of_week.clone().map(Selector::Label))
    }

    fn meal(&self) -> Option<Selector> {
        self.meal_id
            .map(Selector::Id)
            .or_else(|| self.meal_index.map(Selector::Index))
            .or_else(|| self.meal_name.clone().map(Selector::Label))
    }

    fn record(self) -> CompletionRecord {
        let date = self.date.unwrap_or_else(|| Utc::now().date_naive());
        CompletionRecord {
            date,
            day_of_week: self
                .day_of_week
                .unwrap_or_else(|| date.format("%A").to_string()),
            status: self.status.unwrap_or(CompletionStatus::Completed),
            completed_at: self.completed_at,
            notes: self.notes,
        }
    }
}

pub struct ChatBridge {
    transport: Arc<dyn ChatTransport>,
    workouts: WorkoutFacade,
    nutrition: NutritionFacade,
    progress: ProgressFacade,
    user_id: i64,
}

impl ChatBridge {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        workouts: WorkoutFacade,
        nutrition: NutritionFacade,
        progress: ProgressFacade,
        user_id: i64,
    ) -> Self {
        Self {
            transport,
            workouts,
            nutrition,
            progress,
            user_id,
        }
    }

    pub fn provider(&self) -> &'static str {
        self.transport.name()
    }

    /// Send one message and apply every action in the reply
    ///
    /// Never fails: transport and parse errors degrade to an apology, and a
    /// broken action is reported in `errors` without stopping its siblings.
    pub async fn send(&self, message: &str) -> ChatOutcome {
        let body = match self.transport.send(message, self.user_id).await {
            Ok(body) => body,
            Err(e) => {
                warn!(provider = self.transport.name(), error = %e, "Chat service failed");
                return ChatOutcome::apology();
            }
        };

        let Some(parsed) = parse_reply(&body) else {
            warn!(provider = self.transport.name(), "Unrecognized chat reply shape");
            return ChatOutcome::apology();
        };

        let mut outcome = ChatOutcome {
            message: strip_action_blocks(&parsed.message),
            ..ChatOutcome::default()
        };

        let mut actions = Vec::new();
        for block in extract_action_blocks(&parsed.message) {
            match block {
                Ok(block) => actions.push((block.tag, block.payload)),
                Err(e) => {
                    error!(error = %e, "Malformed action block");
                    outcome.errors.push(e.to_string());
                }
            }
        }
        if let Some(action) = structured_action(&parsed) {
            actions.push(action);
        }

        for (tag, payload) in actions {
            match self.dispatch(&tag, payload).await {
                Ok(Some(action)) => {
                    info!(tag = %action.tag, source = %action.source, "{}", action.summary);
                    metrics::counter!("chat_actions_total", "outcome" => "applied").increment(1);
                    outcome.actions.push(action);
                }
                Ok(None) => {}
                Err(e) => {
                    error!(tag = %tag, error = %e, "Chat action failed");
                    metrics::counter!("chat_actions_total", "outcome" => "failed").increment(1);
                    outcome.errors.push(format!("{}: {}", tag, e));
                }
            }
        }

        outcome
    }

    async fn dispatch(
        &self,
        tag: &ActionTag,
        payload: Value,
    ) -> ClientResult<Option<DispatchedAction>> {
        let (source, summary) = match tag {
            ActionTag::CreateWorkoutPlan => {
                let mut plan: WorkoutPlan = serde_json::from_value(payload)?;
                plan.id = None;
                plan.user_id = self.user_id;
                plan.ai_generated = true;
                let saved = self.workouts.create_plan(plan).await?;
                (saved.source, format!("Workout plan '{}' created", saved.data.name))
            }
            ActionTag::UpdateWorkoutPlan => {
                let plan: WorkoutPlan = wire::decode(payload)?;
                let id = required_id(tag, plan.id)?;
                let saved = self.workouts.update_plan(id, plan).await?;
                (saved.source, format!("Workout plan '{}' updated", saved.data.name))
            }
            ActionTag::CreateNutritionPlan => {
                let mut plan: NutritionPlan = serde_json::from_value(payload)?;
                plan.id = None;
                plan.user_id = self.user_id;
                plan.ai_generated = true;
                let saved = self.nutrition.create_plan(plan).await?;
                (saved.source, format!("Nutrition plan '{}' created", saved.data.name))
            }
            ActionTag::UpdateNutritionPlan => {
                let plan: NutritionPlan = wire::decode(payload)?;
                let id = required_id(tag, plan.id)?;
                let saved = self.nutrition.update_plan(id, plan).await?;
                (saved.source, format!("Nutrition plan '{}' updated", saved.data.name))
            }
            ActionTag::LogProgress => {
                let mut entry: ProgressEntry = serde_json::from_value(with_default_date(payload))?;
                entry.id = None;
                entry.user_id = self.user_id;
                let saved = self.progress.create_entry(entry).await?;
                (saved.source, format!("Progress logged for {}", saved.data.date))
            }
            ActionTag::CompleteSession => {
                let payload: CompletionPayload = serde_json::from_value(payload)?;
                let plan_id = payload.plan_id(tag)?;
                let session = payload
                    .session()
                    .ok_or_else(|| ClientError::Validation(format!("{} requires a session", tag)))?;
                let saved = self
                    .workouts
                    .complete_session(plan_id, &session, payload.record())
                    .await?;
                (saved.source, format!("Session {} marked in '{}'", session, saved.data.name))
            }
            ActionTag::CompleteMeal => {
                let payload: CompletionPayload = serde_json::from_value(payload)?;
                let plan_id = payload.plan_id(tag)?;
                let meal = payload
                    .meal()
                    .ok_or_else(|| ClientError::Validation(format!("{} requires a meal", tag)))?;
                let saved = self
                    .nutrition
                    .complete_meal(plan_id, &meal, payload.record())
                    .await?;
                (saved.source, format!("Meal {} marked in '{}'", meal, saved.data.name))
            }
            ActionTag::Unknown(name) => {
                warn!(tag = %name, "Skipping unknown chat action");
                return Ok(None);
            }
        };

        Ok(Some(DispatchedAction {
            tag: tag.to_string(),
            source,
            summary,
        }))
    }
}

/// `action: {type}` with its payload in `data` or inside the action itself
fn structured_action(parsed: &ParsedReply) -> Option<(ActionTag, Value)> {
    let action = parsed.action.as_ref()?;
    let kind = action.get("type")?.as_str()?;
    let payload = parsed
        .data
        .clone()
        .or_else(|| action.get("data").cloned())?;
    Some((ActionTag::parse(kind), payload))
}

fn required_id(tag: &ActionTag, id: Option<EntityId>) -> ClientResult<EntityId> {
    id.ok_or_else(|| ClientError::Validation(format!("{} requires an id", tag)))
}

fn with_default_date(mut payload: Value) -> Value {
    if let Value::Object(map) = &mut payload {
        let missing = map.get("date").map_or(true, Value::is_null);
        if missing {
            let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
            map.insert("date".to_string(), Value::String(today));
        }
    }
    payload
}
