//! Progress tracking facade

use super::{Envelope, FallbackGuard, ProgressService};
use crate::error::ClientResult;
use crate::store::ServiceName;
use fitness_coach_shared::validation::validate_progress_entry;
use fitness_coach_shared::{EntityId, ProgressEntry};
use std::sync::Arc;
use tracing::info;

const SERVICE: ServiceName = ServiceName::Progress;

#[derive(Clone)]
pub struct ProgressFacade {
    live: Arc<dyn ProgressService>,
    mock: Arc<dyn ProgressService>,
    guard: FallbackGuard,
    user_id: i64,
}

impl ProgressFacade {
    pub fn new(
        live: Arc<dyn ProgressService>,
        mock: Arc<dyn ProgressService>,
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

    pub fn live(&self) -> &Arc<dyn ProgressService> {
        &self.live
    }

    /// Entries ordered by date
    pub async fn list_entries(&self) -> Envelope<Vec<ProgressEntry>> {
        let live = self.live.list_entries(self.user_id);
        let mut envelope = match self.guard.attempt(SERVICE, "list_entries", live).await {
            Some(entries) => Envelope::live(entries),
            None => {
                let cached = self.guard.cached::<ProgressEntry>(self.user_id);
                if cached.is_empty() {
                    Envelope::mock(self.mock.list_entries(self.user_id).await.unwrap_or_default())
                } else {
                    Envelope::cache(cached)
                }
            }
        };
        envelope.data.sort_by_key(|e| e.date);
        envelope
    }

    /// Log a measurement; weight is required
    pub async fn create_entry(
        &self,
        entry: ProgressEntry,
    ) -> ClientResult<Envelope<ProgressEntry>> {
        validate_progress_entry(&entry)?;

        let live = self.live.create_entry(&entry);
        if let Some(created) = self.guard.attempt(SERVICE, "create_entry", live).await {
            info!(date = %entry.date, "Progress entry logged");
            self.guard.mirror(entry.id, &created);
            return Ok(Envelope::live(created));
        }
        Ok(self.guard.store_offline("create_entry", entry))
    }

    pub async fn update_entry(
        &self,
        id: EntityId,
        mut entry: ProgressEntry,
    ) -> ClientResult<Envelope<ProgressEntry>> {
        validate_progress_entry(&entry)?;
        entry.id = Some(id);

        let (method, live) = if id.is_temporary() {
            ("create_entry", self.live.create_entry(&entry))
        } else {
            ("update_entry", self.live.update_entry(id, &entry))
        };
        if let Some(saved) = self.guard.attempt(SERVICE, method, live).await {
            self.guard.mirror(Some(id), &saved);
            return Ok(Envelope::live(saved));
        }
        Ok(self.guard.store_offline("update_entry", entry))
    }

    pub async fn delete_entry(&self, id: EntityId) -> Envelope<()> {
        if !id.is_temporary() {
            let live = self.live.delete_entry(id);
            if self.guard.attempt(SERVICE, "delete_entry", live).await.is_some() {
                self.guard.forget::<ProgressEntry>(id);
                return Envelope::live(());
            }
        }
        self.guard.delete_offline::<ProgressEntry>("delete_entry", id)
    }
}
