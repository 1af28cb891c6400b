//! Replay of writes made while the backend was unreachable
//!
//! A pass walks the cached workout plans, nutrition plans and progress entries
//! in that order, one entity at a time. Entities holding a temporary id are
//! created on the server and replaced in the cache by the acknowledged copy;
//! every other entity is updated in place. Queued deletes run last.
//!
//! Failures are logged per entity and never abort the pass. Which queue
//! entries are removed afterwards depends on [`ClearPolicy`].

use crate::config::ClearPolicy;
use crate::error::{ClientError, ClientResult};
use crate::services::{NutritionService, ProgressService, WorkoutService};
use crate::status::{Notification, Notifier};
use crate::store::{Cached, LocalCache, PendingRequest, ServiceName};
use async_trait::async_trait;
use fitness_coach_shared::{Entity, EntityId, NutritionPlan, ProgressEntry, WorkoutPlan};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one synchronization pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Queue entries removed after the pass
    pub cleared: usize,
    /// Queue entries kept for a later pass
    pub retained: usize,
    pub failures: Vec<String>,
}

impl SyncReport {
    fn nothing_to_sync() -> Self {
        Self {
            success: true,
            message: "No pending changes to synchronize".to_string(),
            ..Self::default()
        }
    }

    fn already_running() -> Self {
        Self {
            success: false,
            message: "A synchronization is already in progress".to_string(),
            ..Self::default()
        }
    }

    fn finish(&mut self) {
        self.success = self.failed == 0;
        self.message = if self.success {
            format!(
                "Sync completed: {} created, {} updated, {} deleted",
                self.created, self.updated, self.deleted
            )
        } else {
            format!(
                "Sync finished with {} error(s); {} pending change(s) kept for retry",
                self.failed, self.retained
            )
        };
    }
}

/// Create/update/delete calls for one cached entity type
#[async_trait]
trait Replay: Send + Sync {
    type Entity: Cached;

    async fn create(&self, entity: &Self::Entity) -> ClientResult<Self::Entity>;

    async fn update(&self, id: EntityId, entity: &Self::Entity) -> ClientResult<Self::Entity>;

    async fn delete(&self, id: EntityId) -> ClientResult<()>;
}

struct WorkoutReplay<'a>(&'a dyn WorkoutService);

#[async_trait]
impl Replay for WorkoutReplay<'_> {
    type Entity = WorkoutPlan;

    async fn create(&self, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan> {
        self.0.create_plan(plan).await
    }

    async fn update(&self, id: EntityId, plan: &WorkoutPlan) -> ClientResult<WorkoutPlan> {
        self.0.update_plan(id, plan).await
    }

    async fn delete(&self, id: EntityId) -> ClientResult<()> {
        self.0.delete_plan(id).await
    }
}

struct NutritionReplay<'a>(&'a dyn NutritionService);

#[async_trait]
impl Replay for NutritionReplay<'_> {
    type Entity = NutritionPlan;

    async fn create(&self, plan: &NutritionPlan) -> ClientResult<NutritionPlan> {
        self.0.create_plan(plan).await
    }

    async fn update(&self, id: EntityId, plan: &NutritionPlan) -> ClientResult<NutritionPlan> {
        self.0.update_plan(id, plan).await
    }

    async fn delete(&self, id: EntityId) -> ClientResult<()> {
        self.0.delete_plan(id).await
    }
}

struct ProgressReplay<'a>(&'a dyn ProgressService);

#[async_trait]
impl Replay for ProgressReplay<'_> {
    type Entity = ProgressEntry;

    async fn create(&self, entry: &ProgressEntry) -> ClientResult<ProgressEntry> {
        self.0.create_entry(entry).await
    }

    async fn update(&self, id: EntityId, entry: &ProgressEntry) -> ClientResult<ProgressEntry> {
        self.0.update_entry(id, entry).await
    }

    async fn delete(&self, id: EntityId) -> ClientResult<()> {
        self.0.delete_entry(id).await
    }
}

/// Drains the pending-request queue against the live services
pub struct SyncEngine {
    workouts: Arc<dyn WorkoutService>,
    nutrition: Arc<dyn NutritionService>,
    progress: Arc<dyn ProgressService>,
    cache: Arc<LocalCache>,
    notifier: Notifier,
    policy: ClearPolicy,
    running: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        workouts: Arc<dyn WorkoutService>,
        nutrition: Arc<dyn NutritionService>,
        progress: Arc<dyn ProgressService>,
        cache: Arc<LocalCache>,
        notifier: Notifier,
        policy: ClearPolicy,
    ) -> Self {
        Self {
            workouts,
            nutrition,
            progress,
            cache,
            notifier,
            policy,
            running: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> ClearPolicy {
        self.policy
    }

    /// Replay everything queued; never fails, errors end up in the report
    pub async fn sync_all(&self) -> SyncReport {
        let Ok(_running) = self.running.try_lock() else {
            warn!("Sync requested while another pass is running");
            return SyncReport::already_running();
        };

        let queue = self.cache.pending_requests();
        if queue.is_empty() {
            debug!("Nothing to sync");
            return SyncReport::nothing_to_sync();
        }

        info!(pending = queue.len(), policy = ?self.policy, "Starting sync");
        let mut report = SyncReport::default();
        let mut replayed = HashSet::new();

        self.sync_bucket(&WorkoutReplay(self.workouts.as_ref()), &mut report, &mut replayed)
            .await;
        self.sync_bucket(&NutritionReplay(self.nutrition.as_ref()), &mut report, &mut replayed)
            .await;
        self.sync_bucket(&ProgressReplay(self.progress.as_ref()), &mut report, &mut replayed)
            .await;

        for request in queue.iter().filter(|r| r.is_delete()) {
            self.replay_delete(request, &mut report, &mut replayed).await;
        }

        let clear = self.entries_to_clear(&queue, &replayed, report.failed == 0);
        match self.cache.remove_pending_requests(&clear) {
            Ok(removed) => report.cleared = removed,
            Err(e) => {
                warn!(error = %e, "Failed to clear replayed queue entries");
                report.failed += 1;
                report.failures.push(format!("queue: {}", e));
            }
        }
        report.retained = queue.len().saturating_sub(report.cleared);
        report.finish();

        if report.success {
            info!(
                created = report.created,
                updated = report.updated,
                deleted = report.deleted,
                cleared = report.cleared,
                "Sync completed"
            );
            self.notifier.notify(Notification::SyncCompleted {
                message: report.message.clone(),
            });
        } else {
            warn!(
                failed = report.failed,
                retained = report.retained,
                "Sync finished with errors"
            );
            self.notifier.notify(Notification::SyncFailed {
                message: report.message.clone(),
            });
        }
        report
    }

    async fn sync_bucket<R: Replay>(
        &self,
        replay: &R,
        report: &mut SyncReport,
        replayed: &mut HashSet<EntityId>,
    ) {
        let bucket = <R::Entity as Cached>::BUCKET;
        let entities: Vec<R::Entity> = self.cache.get(bucket);
        debug!(bucket = %bucket, count = entities.len(), "Syncing bucket");

        for entity in entities {
            let Some(id) = entity.id() else {
                continue;
            };

            let (outcome, result) = if id.is_temporary() {
                ("created", replay.create(&entity).await)
            } else {
                ("updated", replay.update(id, &entity).await)
            };

            match result {
                Ok(saved) => {
                    // Acknowledged without an id; the next live read brings it back
                    let written = if saved.id().is_some() {
                        self.cache.replace_entity(bucket, id, saved)
                    } else {
                        self.cache.remove_entity::<R::Entity>(bucket, id).map(|_| ())
                    };
                    if let Err(e) = written {
                        warn!(
                            bucket = %bucket,
                            %id,
                            error = %e,
                            "Failed to write back synced entity"
                        );
                    }
                    replayed.insert(id);
                    if id.is_temporary() {
                        report.created += 1;
                    } else {
                        report.updated += 1;
                    }
                    count_entity(bucket.key(), outcome);
                }
                Err(e) => {
                    warn!(bucket = %bucket, %id, error = %e, "Failed to sync entity");
                    report.failed += 1;
                    report.failures.push(format!("{} {}: {}", bucket, id, e));
                    count_entity(bucket.key(), "failed");
                }
            }
        }
    }

    async fn replay_delete(
        &self,
        request: &PendingRequest,
        report: &mut SyncReport,
        replayed: &mut HashSet<EntityId>,
    ) {
        let Some(id) = request.target.filter(|id| !id.is_temporary()) else {
            return;
        };

        let result = match request.service {
            ServiceName::Workout => WorkoutReplay(self.workouts.as_ref()).delete(id).await,
            ServiceName::Nutrition => NutritionReplay(self.nutrition.as_ref()).delete(id).await,
            ServiceName::Progress => ProgressReplay(self.progress.as_ref()).delete(id).await,
            other => {
                debug!(service = %other, method = %request.method, "No replay for queued call");
                return;
            }
        };

        match result {
            // Already gone on the server
            Ok(()) | Err(ClientError::Status { status: 404, .. }) => {
                replayed.insert(id);
                report.deleted += 1;
                count_entity(request.service.as_str(), "deleted");
            }
            Err(e) => {
                warn!(service = %request.service, %id, error = %e, "Failed to replay delete");
                report.failed += 1;
                report.failures.push(format!("delete {} {}: {}", request.service, id, e));
                count_entity(request.service.as_str(), "failed");
            }
        }
    }

    fn entries_to_clear(
        &self,
        queue: &[PendingRequest],
        replayed: &HashSet<EntityId>,
        clean_pass: bool,
    ) -> HashSet<Uuid> {
        queue
            .iter()
            .filter(|request| match self.policy {
                ClearPolicy::All => true,
                ClearPolicy::ReplayedOnly => match request.target {
                    Some(target) => replayed.contains(&target),
                    // Entries from before targets were recorded
                    None => clean_pass,
                },
            })
            .map(|request| request.id)
            .collect()
    }
}

fn count_entity(bucket: &'static str, outcome: &'static str) {
    metrics::counter!("sync_entities_total", "bucket" => bucket, "outcome" => outcome).increment(1);
}
