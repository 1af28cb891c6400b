//! Workout plan facade

use super::{DataSource, Envelope, FallbackGuard, Selector, WorkoutService};
use crate::error::{ClientError, ClientResult};
use crate::store::ServiceName;
use fitness_coach_shared::validation::{validate_completion, validate_workout_plan};
use fitness_coach_shared::{CompletionRecord, EntityId, WorkoutPlan};
use std::sync::Arc;
use tracing::info;

const SERVICE: ServiceName = ServiceName::Workout;

#[derive(Clone)]
pub struct WorkoutFacade {
    live: Arc<dyn WorkoutService>,
    mock: Arc<dyn WorkoutService>,
    guard: FallbackGuard,
    user_id: i64,
}

impl WorkoutFacade {
    pub fn new(
        live: Arc<dyn WorkoutService>,
        mock: Arc<dyn WorkoutService>,
        guard: FallbackGuard,
        user_id: i64,
    ) -> Self {
        Self {
            live,
            mock,
            guard,
            user_id,
        }
    }

    pub fn live(&self) -> &Arc<dyn WorkoutService> {
        &self.live
    }

    pub async fn list_plans(&self) -> Envelope<Vec<WorkoutPlan>> {
        let live = self.live.list_plans(self.user_id);
        if let Some(plans) = self.guard.attempt(SERVICE, "list_plans", live).await {
            return Envelope::live(plans);
        }

        let cached = self.guard.cached::<WorkoutPlan>(self.user_id);
        if !cached.is_empty() {
            return Envelope::cache(cached);
        }
        Envelope::mock(self.mock.list_plans(self.user_id).await.unwrap_or_default())
    }

    pub async fn get_plan(&self, id: EntityId) -> Envelope<Option<WorkoutPlan>> {
        if !id.is_temporary() {
            let live = self.live.get_plan(id);
            if let Some(plan) = self.guard.attempt(SERVICE, "get_plan", live).await {
                return Envelope::live(Some(plan));
            }
        }

        if let Some(plan) = self.guard.cached_item::<WorkoutPlan>(id) {
            return Envelope::cache(Some(plan));
        }
        Envelope::mock(self.mock.get_plan(id).await.ok())
    }

    pub async fn create_plan(&self, plan: WorkoutPlan) -> ClientResult<Envelope<WorkoutPlan>> {
        validate_workout_plan(&plan)?;

        let live = self.live.create_plan(&plan);
        if let Some(created) = self.guard.attempt(SERVICE, "create_plan", live).await {
            info!(plan = %plan.name, "Workout plan created");
            self.guard.mirror(plan.id, &created);
            return Ok(Envelope::live(created));
        }
        Ok(self.guard.store_offline("create_plan", plan))
    }

    /// Update a plan; a plan the server has not seen yet is created instead
    pub async fn update_plan(
        &self,
        id: EntityId,
        mut plan: WorkoutPlan,
    ) -> ClientResult<Envelope<WorkoutPlan>> {
        validate_workout_plan(&plan)?;
        plan.id = Some(id);

        let (method, live) = if id.is_temporary() {
            ("create_plan", self.live.create_plan(&plan))
        } else {
            ("update_plan", self.live.update_plan(id, &plan))
        };
        if let Some(saved) = self.guard.attempt(SERVICE, method, live).await {
            self.guard.mirror(Some(id), &saved);
            return Ok(Envelope::live(saved));
        }
        Ok(self.guard.store_offline("update_plan", plan))
    }

    pub async fn delete_plan(&self, id: EntityId) -> Envelope<()> {
        if !id.is_temporary() {
            let live = self.live.delete_plan(id);
            if self.guard.attempt(SERVICE, "delete_plan", live).await.is_some() {
                self.guard.forget::<WorkoutPlan>(id);
                return Envelope::live(());
            }
        }
        self.guard.delete_offline::<WorkoutPlan>("delete_plan", id)
    }

    /// Append a completion record to one session and save the plan
    pub async fn complete_session(
        &self,
        plan_id: EntityId,
        session: &Selector,
        record: CompletionRecord,
    ) -> ClientResult<Envelope<WorkoutPlan>> {
        validate_completion(&record)?;

        let found = self.get_plan(plan_id).await;
        // Demo data must never be saved over the user's plan
        if found.source == DataSource::Mock {
            return Err(ClientError::Validation(format!(
                "Workout plan {} is not available offline",
                plan_id
            )));
        }
        let mut plan = found.data.ok_or_else(|| {
            ClientError::Validation(format!("Workout plan {} not found", plan_id))
        })?;
        let index = session
            .position(&plan.sessions, |s| s.id, |s| s.day_of_week.as_str())
            .ok_or_else(|| {
                ClientError::Validation(format!(
                    "Session {} not found in plan {}",
                    session, plan_id
                ))
            })?;

        plan.sessions[index].completions.push(record);
        self.update_plan(plan_id, plan).await
    }
}
