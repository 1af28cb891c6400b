//! Persistent local cache
//!
//! Domain entities, the pending-request queue, the availability flag, the
//! session token and user preferences, each under its own key in a
//! [`KeyValueStore`]. Compound read-modify-write operations hold a write lock
//! so concurrent tasks in one process never lose each other's updates.

use super::pending::PendingRequest;
use super::{KeyValueStore, MemoryStore};
use crate::error::ClientResult;
use chrono::{DateTime, Duration, Utc};
use fitness_coach_shared::{Entity, EntityId, NutritionPlan, ProgressEntry, WorkoutPlan};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

pub const BACKEND_AVAILABLE_KEY: &str = "backendAvailable";
pub const TOKEN_KEY: &str = "token";

/// Named list stored in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    WorkoutPlans,
    NutritionPlans,
    ProgressData,
    PendingRequests,
}

impl Bucket {
    pub fn key(&self) -> &'static str {
        match self {
            Bucket::WorkoutPlans => "workout_plans",
            Bucket::NutritionPlans => "nutrition_plans",
            Bucket::ProgressData => "progress_data",
            Bucket::PendingRequests => "pending_requests",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// User preferences, one key each
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    pub notifications: bool,
    pub workout_reminders: bool,
    pub meal_reminders: bool,
    pub dark_mode: bool,
    pub language: String,
    pub units: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            notifications: true,
            workout_reminders: true,
            meal_reminders: true,
            dark_mode: false,
            language: "es".to_string(),
            units: "metric".to_string(),
        }
    }
}

/// Typed view over a [`KeyValueStore`]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl LocalCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_raw(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read cache key");
                None
            }
        }
    }

    /// Parsed bucket contents; absent or corrupt buckets read as empty.
    ///
    /// Items that no longer match the entity shape are skipped individually.
    pub fn get<T: DeserializeOwned>(&self, bucket: Bucket) -> Vec<T> {
        let Some(raw) = self.read_raw(bucket.key()) else {
            return Vec::new();
        };
        let items: Vec<Value> = match serde_json::from_str(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!(bucket = %bucket, error = %e, "Corrupt cache bucket, using empty list");
                return Vec::new();
            }
        };
        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(bucket = %bucket, error = %e, "Skipping unreadable cache entry");
                    None
                }
            })
            .collect()
    }

    /// Overwrite a bucket in one write
    pub fn set<T: Serialize>(&self, bucket: Bucket, items: &[T]) -> ClientResult<()> {
        let raw = serde_json::to_string(items)?;
        self.store.set(bucket.key(), &raw)
    }

    /// Insert or merge-replace an entity, assigning a temporary id if it has none
    pub fn upsert<E: Entity>(&self, bucket: Bucket, mut entity: E) -> ClientResult<E> {
        let _guard = self.lock();
        let mut items: Vec<E> = self.get(bucket);

        let id = match entity.id() {
            Some(id) => id,
            None => {
                let id = EntityId::new_temporary();
                entity.set_id(Some(id));
                id
            }
        };

        let position = items.iter().position(|e| e.id() == Some(id));
        let previous_update = position.and_then(|i| items[i].updated_at());
        let mut stored = match position {
            Some(i) => merge_replace(&items[i], entity)?,
            None => entity,
        };
        stored.touch(next_timestamp(previous_update));

        match position {
            Some(i) => items[i] = stored.clone(),
            None => items.push(stored.clone()),
        }
        self.set(bucket, &items)?;
        debug!(bucket = %bucket, id = %id, "Upserted cached entity");
        Ok(stored)
    }

    pub fn upsert_workout_plan(&self, plan: WorkoutPlan) -> ClientResult<WorkoutPlan> {
        self.upsert(Bucket::WorkoutPlans, plan)
    }

    pub fn upsert_nutrition_plan(&self, plan: NutritionPlan) -> ClientResult<NutritionPlan> {
        self.upsert(Bucket::NutritionPlans, plan)
    }

    pub fn upsert_progress_entry(&self, entry: ProgressEntry) -> ClientResult<ProgressEntry> {
        self.upsert(Bucket::ProgressData, entry)
    }

    pub fn find<E: Entity>(&self, bucket: Bucket, id: EntityId) -> Option<E> {
        self.get::<E>(bucket).into_iter().find(|e| e.id() == Some(id))
    }

    /// Remove an entity; returns whether it was present
    pub fn remove_entity<E: Entity>(&self, bucket: Bucket, id: EntityId) -> ClientResult<bool> {
        let _guard = self.lock();
        let mut items: Vec<E> = self.get(bucket);
        let before = items.len();
        items.retain(|e| e.id() != Some(id));
        if items.len() == before {
            return Ok(false);
        }
        self.set(bucket, &items)?;
        Ok(true)
    }

    /// Swap the entity stored under `old_id` for `entity`, keeping its position
    pub fn replace_entity<E: Entity>(
        &self,
        bucket: Bucket,
        old_id: EntityId,
        entity: E,
    ) -> ClientResult<()> {
        let _guard = self.lock();
        let mut items: Vec<E> = self.get(bucket);
        match items.iter().position(|e| e.id() == Some(old_id)) {
            Some(i) => items[i] = entity,
            None => items.push(entity),
        }
        self.set(bucket, &items)
    }

    // ------------------------------------------------------------------------
    // Pending-request queue
    // ------------------------------------------------------------------------

    /// Append a request; repeated calls accumulate, nothing is deduplicated
    pub fn enqueue_pending_request(&self, request: PendingRequest) -> ClientResult<()> {
        let _guard = self.lock();
        let mut queue: Vec<PendingRequest> = self.get(Bucket::PendingRequests);
        debug!(
            service = %request.service,
            method = %request.method,
            position = queue.len(),
            "Queued pending request"
        );
        queue.push(request);
        self.set(Bucket::PendingRequests, &queue)
    }

    /// Current queue contents in FIFO order
    pub fn pending_requests(&self) -> Vec<PendingRequest> {
        self.get(Bucket::PendingRequests)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_requests().len()
    }

    /// Read and reset the queue under one lock
    pub fn drain_pending_requests(&self) -> ClientResult<Vec<PendingRequest>> {
        let _guard = self.lock();
        let queue: Vec<PendingRequest> = self.get(Bucket::PendingRequests);
        self.set::<PendingRequest>(Bucket::PendingRequests, &[])?;
        Ok(queue)
    }

    pub fn clear_pending_requests(&self) -> ClientResult<()> {
        let _guard = self.lock();
        self.set::<PendingRequest>(Bucket::PendingRequests, &[])
    }

    /// Remove exactly the given entries; returns how many were removed
    pub fn remove_pending_requests(&self, ids: &HashSet<Uuid>) -> ClientResult<usize> {
        let _guard = self.lock();
        let mut queue: Vec<PendingRequest> = self.get(Bucket::PendingRequests);
        let before = queue.len();
        queue.retain(|r| !ids.contains(&r.id));
        let removed = before - queue.len();
        if removed > 0 {
            self.set(Bucket::PendingRequests, &queue)?;
        }
        Ok(removed)
    }

    /// Drop every queued entry that writes `target`
    pub fn remove_pending_for(&self, target: EntityId) -> ClientResult<usize> {
        let ids: HashSet<Uuid> = self
            .pending_requests()
            .into_iter()
            .filter(|r| r.target == Some(target))
            .map(|r| r.id)
            .collect();
        self.remove_pending_requests(&ids)
    }

    // ------------------------------------------------------------------------
    // Flags, token and preferences
    // ------------------------------------------------------------------------

    /// Last persisted availability; optimistic when never recorded
    pub fn backend_available(&self) -> bool {
        self.read_bool(BACKEND_AVAILABLE_KEY).unwrap_or(true)
    }

    pub fn set_backend_available(&self, available: bool) -> ClientResult<()> {
        self.store
            .set(BACKEND_AVAILABLE_KEY, if available { "true" } else { "false" })
    }

    pub fn token(&self) -> Option<String> {
        self.read_raw(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn set_token(&self, token: &str) -> ClientResult<()> {
        self.store.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> ClientResult<()> {
        self.store.remove(TOKEN_KEY)
    }

    fn read_bool(&self, key: &str) -> Option<bool> {
        match self.read_raw(key)?.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn preferences(&self) -> Preferences {
        let defaults = Preferences::default();
        Preferences {
            notifications: self.read_bool("notifications").unwrap_or(defaults.notifications),
            workout_reminders: self
                .read_bool("workoutReminders")
                .unwrap_or(defaults.workout_reminders),
            meal_reminders: self.read_bool("mealReminders").unwrap_or(defaults.meal_reminders),
            dark_mode: self.read_bool("darkMode").unwrap_or(defaults.dark_mode),
            language: self.read_raw("language").unwrap_or(defaults.language),
            units: self.read_raw("units").unwrap_or(defaults.units),
        }
    }

    pub fn set_preferences(&self, prefs: &Preferences) -> ClientResult<()> {
        let flag = |b: bool| if b { "true" } else { "false" };
        self.store.set("notifications", flag(prefs.notifications))?;
        self.store.set("workoutReminders", flag(prefs.workout_reminders))?;
        self.store.set("mealReminders", flag(prefs.meal_reminders))?;
        self.store.set("darkMode", flag(prefs.dark_mode))?;
        self.store.set("language", &prefs.language)?;
        self.store.set("units", &prefs.units)
    }
}

/// Shallow merge: fields present in `incoming` win
fn merge_replace<E: Entity>(existing: &E, incoming: E) -> ClientResult<E> {
    let mut base = serde_json::to_value(existing)?;
    let overlay = serde_json::to_value(&incoming)?;
    match (&mut base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            base.extend(overlay);
            Ok(serde_json::from_value(Value::Object(std::mem::take(base)))?)
        }
        _ => Ok(incoming),
    }
}

/// Now, but strictly after `previous`
fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ServiceName;
    use chrono::NaiveDate;
    use fake::faker::lorem::en::Sentence;
    use fake::Fake;
    use proptest::prelude::*;
    use serde_json::json;

    fn plan(name: &str) -> WorkoutPlan {
        serde_json::from_value(json!({ "name": name })).unwrap()
    }

    #[test]
    fn test_missing_bucket_is_empty() {
        let cache = LocalCache::in_memory();
        assert!(cache.get::<WorkoutPlan>(Bucket::WorkoutPlans).is_empty());
    }

    #[test]
    fn test_corrupt_bucket_is_empty() {
        let store = Arc::new(MemoryStore::new());
        store.set("workout_plans", "{not json").unwrap();
        let cache = LocalCache::new(store);
        assert!(cache.get::<WorkoutPlan>(Bucket::WorkoutPlans).is_empty());
    }

    #[test]
    fn test_unreadable_items_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("workout_plans", r#"[{"name": "Fuerza"}, {"sessions": "oops"}]"#)
            .unwrap();
        let cache = LocalCache::new(store);
        let plans: Vec<WorkoutPlan> = cache.get(Bucket::WorkoutPlans);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "Fuerza");
    }

    #[test]
    fn test_upsert_assigns_temporary_id_and_timestamps() {
        let cache = LocalCache::in_memory();
        let stored = cache.upsert_workout_plan(plan("Fuerza")).unwrap();

        assert!(stored.id.unwrap().is_temporary());
        assert!(stored.created_at.is_some());
        assert_eq!(stored.created_at, stored.updated_at);
        assert_eq!(cache.get::<WorkoutPlan>(Bucket::WorkoutPlans), vec![stored]);
    }

    #[test]
    fn test_upsert_same_id_replaces() {
        let cache = LocalCache::in_memory();
        let first = cache.upsert_workout_plan(plan("Fuerza")).unwrap();

        let mut changed = plan("Fuerza avanzada");
        changed.id = first.id;
        changed.description = Some("4 días".to_string());
        let second = cache.upsert_workout_plan(changed).unwrap();

        let plans: Vec<WorkoutPlan> = cache.get(Bucket::WorkoutPlans);
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "Fuerza avanzada");
        assert_eq!(plans[0].description.as_deref(), Some("4 días"));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[test]
    fn test_upsert_merge_keeps_absent_fields() {
        let cache = LocalCache::in_memory();
        let mut original = plan("Fuerza");
        original.description = Some("Base".to_string());
        let stored = cache.upsert_workout_plan(original).unwrap();

        let mut partial = plan("Fuerza II");
        partial.id = stored.id;
        let merged = cache.upsert_workout_plan(partial).unwrap();
        assert_eq!(merged.description.as_deref(), Some("Base"));
    }

    #[test]
    fn test_distinct_entities_append() {
        let cache = LocalCache::in_memory();
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        cache.upsert_progress_entry(ProgressEntry::new(date, 75.0)).unwrap();
        cache.upsert_progress_entry(ProgressEntry::new(date, 74.8)).unwrap();
        assert_eq!(cache.get::<ProgressEntry>(Bucket::ProgressData).len(), 2);
    }

    #[test]
    fn test_remove_and_replace_entity() {
        let cache = LocalCache::in_memory();
        let a = cache.upsert_workout_plan(plan("A")).unwrap();
        let b = cache.upsert_workout_plan(plan("B")).unwrap();

        let mut acknowledged = a.clone();
        acknowledged.id = Some(EntityId::persisted(12));
        cache
            .replace_entity(Bucket::WorkoutPlans, a.id.unwrap(), acknowledged)
            .unwrap();

        let plans: Vec<WorkoutPlan> = cache.get(Bucket::WorkoutPlans);
        assert_eq!(plans[0].id, Some(EntityId::persisted(12)));
        assert_eq!(plans[1].id, b.id);

        assert!(cache
            .remove_entity::<WorkoutPlan>(Bucket::WorkoutPlans, b.id.unwrap())
            .unwrap());
        assert!(!cache
            .remove_entity::<WorkoutPlan>(Bucket::WorkoutPlans, b.id.unwrap())
            .unwrap());
        assert_eq!(cache.get::<WorkoutPlan>(Bucket::WorkoutPlans).len(), 1);
    }

    #[test]
    fn test_queue_is_fifo_without_dedup() {
        let cache = LocalCache::in_memory();
        for _ in 0..3 {
            let note: String = Sentence(3..6).fake();
            cache
                .enqueue_pending_request(PendingRequest::new(
                    ServiceName::Progress,
                    "create_entry",
                    vec![json!({ "notes": note })],
                ))
                .unwrap();
        }
        let queue = cache.pending_requests();
        assert_eq!(queue.len(), 3);
        assert!(queue.windows(2).all(|w| w[0].enqueued_at <= w[1].enqueued_at));
    }

    #[test]
    fn test_selective_queue_removal() {
        let cache = LocalCache::in_memory();
        let keep = PendingRequest::new(ServiceName::Workout, "create_plan", vec![]);
        let replayed = PendingRequest::new(ServiceName::Workout, "update_plan", vec![]);
        cache.enqueue_pending_request(keep.clone()).unwrap();
        cache.enqueue_pending_request(replayed.clone()).unwrap();

        let removed = cache
            .remove_pending_requests(&HashSet::from([replayed.id]))
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(cache.pending_requests(), vec![keep]);

        cache.clear_pending_requests().unwrap();
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn test_drain_returns_and_resets() {
        let cache = LocalCache::in_memory();
        let request = PendingRequest::new(ServiceName::Nutrition, "create_plan", vec![]);
        cache.enqueue_pending_request(request.clone()).unwrap();

        assert_eq!(cache.drain_pending_requests().unwrap(), vec![request]);
        assert!(cache.drain_pending_requests().unwrap().is_empty());
    }

    #[test]
    fn test_remove_pending_for_target() {
        let cache = LocalCache::in_memory();
        let temp = EntityId::new_temporary();
        for method in ["create_plan", "update_plan"] {
            cache
                .enqueue_pending_request(
                    PendingRequest::new(ServiceName::Workout, method, vec![])
                        .with_target(Some(temp)),
                )
                .unwrap();
        }
        cache
            .enqueue_pending_request(
                PendingRequest::new(ServiceName::Workout, "delete_plan", vec![json!(3)])
                    .with_target(Some(EntityId::persisted(3))),
            )
            .unwrap();

        assert_eq!(cache.remove_pending_for(temp).unwrap(), 2);
        assert_eq!(cache.pending_count(), 1);
    }

    #[test]
    fn test_backend_flag_defaults_to_available() {
        let cache = LocalCache::in_memory();
        assert!(cache.backend_available());
        cache.set_backend_available(false).unwrap();
        assert!(!cache.backend_available());
    }

    #[test]
    fn test_token_round_trip() {
        let cache = LocalCache::in_memory();
        assert_eq!(cache.token(), None);
        cache.set_token("abc").unwrap();
        assert_eq!(cache.token().as_deref(), Some("abc"));
        cache.clear_token().unwrap();
        assert_eq!(cache.token(), None);
    }

    #[test]
    fn test_preferences_round_trip() {
        let cache = LocalCache::in_memory();
        assert_eq!(cache.preferences(), Preferences::default());

        let prefs = Preferences {
            dark_mode: true,
            language: "en".to_string(),
            units: "imperial".to_string(),
            ..Preferences::default()
        };
        cache.set_preferences(&prefs).unwrap();
        assert_eq!(cache.preferences(), prefs);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_upsert_same_id_is_idempotent(
            names in prop::collection::vec("[a-zA-Z ]{1,20}", 1..8)
        ) {
            let cache = LocalCache::in_memory();
            let first = cache.upsert_workout_plan(plan("seed")).unwrap();
            let mut last = first.clone();
            for name in &names {
                let mut next = plan(name);
                next.id = first.id;
                let stored = cache.upsert_workout_plan(next).unwrap();
                prop_assert!(stored.updated_at > last.updated_at);
                last = stored;
            }
            let plans: Vec<WorkoutPlan> = cache.get(Bucket::WorkoutPlans);
            prop_assert_eq!(plans.len(), 1);
            prop_assert_eq!(&plans[0].name, names.last().unwrap());
        }
    }
}
