//! Nutrition plan facade

use super::{DataSource, Envelope, FallbackGuard, NutritionService, Selector};
use crate::error::{ClientError, ClientResult};
use crate::store::ServiceName;
use fitness_coach_shared::validation::{validate_completion, validate_nutrition_plan};
use fitness_coach_shared::{CompletionRecord, EntityId, NutritionPlan};
use std::sync::Arc;
use tracing::info;

const SERVICE: ServiceName = ServiceName::Nutrition;

#[derive(Clone)]
pub struct NutritionFacade {
    live: Arc<dyn NutritionService>,
    mock: Arc<dyn NutritionService>,
    guard: FallbackGuard,
    user_id: i64,
}

impl NutritionFacade {
    pub fn new(
        live: Arc<dyn NutritionService>,
        mock: Arc<dyn NutritionService>,
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

    pub fn live(&self) -> &Arc<dyn NutritionService> {
        &self.live
    }

    pub async fn list_plans(&self) -> Envelope<Vec<NutritionPlan>> {
        let live = self.live.list_plans(self.user_id);
        if let Some(plans) = self.guard.attempt(SERVICE, "list_plans", live).await {
            return Envelope::live(plans);
        }

        let cached = self.guard.cached::<NutritionPlan>(self.user_id);
        if !cached.is_empty() {
            return Envelope::cache(cached);
        }
        Envelope::mock(self.mock.list_plans(self.user_id).await.unwrap_or_default())
    }

    pub async fn get_plan(&self, id: EntityId) -> Envelope<Option<NutritionPlan>> {
        if !id.is_temporary() {
            let live = self.live.get_plan(id);
            if let Some(plan) = self.guard.attempt(SERVICE, "get_plan", live).await {
                return Envelope::live(Some(plan));
            }
        }

        if let Some(plan) = self.guard.cached_item::<NutritionPlan>(id) {
            return Envelope::cache(Some(plan));
        }
        Envelope::mock(self.mock.get_plan(id).await.ok())
    }

    pub async fn create_plan(&self, plan: NutritionPlan) -> ClientResult<Envelope<NutritionPlan>> {
        validate_nutrition_plan(&plan)?;

        let live = self.live.create_plan(&plan);
        if let Some(created) = self.guard.attempt(SERVICE, "create_plan", live).await {
            info!(plan = %plan.name, "Nutrition plan created");
            self.guard.mirror(plan.id, &created);
            return Ok(Envelope::live(created));
        }
        Ok(self.guard.store_offline("create_plan", plan))
    }

    pub async fn update_plan(
        &self,
        id: EntityId,
        mut plan: NutritionPlan,
    ) -> ClientResult<Envelope<NutritionPlan>> {
        validate_nutrition_plan(&plan)?;
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
                self.guard.forget::<NutritionPlan>(id);
                return Envelope::live(());
            }
        }
        self.guard.delete_offline::<NutritionPlan>("delete_plan", id)
    }

    /// Append a completion record to one meal and save the plan
    pub async fn complete_meal(
        &self,
        plan_id: EntityId,
        meal: &Selector,
        record: CompletionRecord,
    ) -> ClientResult<Envelope<NutritionPlan>> {
        validate_completion(&record)?;

        let found = self.get_plan(plan_id).await;
        // Demo data must never be saved over the user's plan
        if found.source == DataSource::Mock {
            return Err(ClientError::Validation(format!(
                "Nutrition plan {} is not available offline",
                plan_id
            )));
        }
        let mut plan = found.data.ok_or_else(|| {
            ClientError::Validation(format!("Nutrition plan {} not found", plan_id))
        })?;
        let index = meal
            .position(&plan.meals, |m| m.id, |m| m.name.as_str())
            .ok_or_else(|| {
                ClientError::Validation(format!(
                    "Meal {} not found in plan {}",
                    meal, plan_id
                ))
            })?;

        plan.meals[index].completions.push(record);
        self.update_plan(plan_id, plan).await
    }
}
