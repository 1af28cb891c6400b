//! Exercise catalog facade
//!
//! The catalog is read-only and never cached, so the fallback is the mock
//! catalog.

use super::{Envelope, ExerciseService, FallbackGuard};
use crate::store::ServiceName;
use fitness_coach_shared::Exercise;
use std::sync::Arc;

const SERVICE: ServiceName = ServiceName::Exercise;

#[derive(Clone)]
pub struct ExerciseFacade {
    live: Arc<dyn ExerciseService>,
    mock: Arc<dyn ExerciseService>,
    guard: FallbackGuard,
}

impl ExerciseFacade {
    pub fn new(
        live: Arc<dyn ExerciseService>,
        mock: Arc<dyn ExerciseService>,
        guard: FallbackGuard,
    ) -> Self {
        Self { live, mock, guard }
    }

    pub async fn list_exercises(&self, muscle_group: Option<&str>) -> Envelope<Vec<Exercise>> {
        let live = self.live.list_exercises(muscle_group);
        match self.guard.attempt(SERVICE, "list_exercises", live).await {
            Some(exercises) => Envelope::live(exercises),
            None => Envelope::mock(
                self.mock
                    .list_exercises(muscle_group)
                    .await
                    .unwrap_or_default(),
            ),
        }
    }

    pub async fn get_exercise(&self, id: i64) -> Envelope<Option<Exercise>> {
        let live = self.live.get_exercise(id);
        match self.guard.attempt(SERVICE, "get_exercise", live).await {
            Some(exercise) => Envelope::live(Some(exercise)),
            None => Envelope::mock(self.mock.get_exercise(id).await.ok()),
        }
    }
}
