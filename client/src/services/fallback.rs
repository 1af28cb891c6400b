//! Generic live-or-fallback wrapper shared by every facade
//!
//! [`FallbackGuard::attempt`] decides whether a live call runs at all and what
//! its outcome means for backend availability. The remaining helpers record
//! offline writes: the entity goes to the cache and the intent to the queue.

use crate::error::ClientResult;
use crate::mock;
use crate::services::Envelope;
use crate::status::{BackendStatus, Notification, Notifier};
use crate::store::{Cached, LocalCache, PendingRequest, ServiceName};
use fitness_coach_shared::EntityId;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Availability gate plus offline write recorder
#[derive(Clone)]
pub struct FallbackGuard {
    status: Arc<BackendStatus>,
    cache: Arc<LocalCache>,
    notifier: Notifier,
}

impl FallbackGuard {
    pub fn new(status: Arc<BackendStatus>, cache: Arc<LocalCache>, notifier: Notifier) -> Self {
        Self {
            status,
            cache,
            notifier,
        }
    }

    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    pub fn status(&self) -> &Arc<BackendStatus> {
        &self.status
    }

    /// Run `live` unless the backend is known to be down.
    ///
    /// `None` means the caller must fall back. The future is dropped unpolled
    /// when the backend is marked unavailable.
    pub async fn attempt<T, F>(
        &self,
        service: ServiceName,
        method: &'static str,
        live: F,
    ) -> Option<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        if !self.status.is_available() {
            debug!(service = %service, method, "Backend marked unavailable, skipping live call");
            count_fallback(service, method);
            return None;
        }

        match live.await {
            Ok(value) => {
                self.status.record(true);
                Some(value)
            }
            Err(e) if e.is_recoverable() => {
                let was_available = self.status.record(false);
                warn!(service = %service, method, error = %e, "Live call failed, using fallback");
                if was_available {
                    self.notifier.notify(Notification::UsingFallback);
                }
                count_fallback(service, method);
                None
            }
            Err(e) => {
                // Refused before reaching the network; availability is unchanged
                warn!(
                    service = %service,
                    method,
                    error = %e,
                    "Live call not possible, using fallback"
                );
                count_fallback(service, method);
                None
            }
        }
    }

    /// Cached entities owned by `user_id`
    pub fn cached<E: Cached>(&self, user_id: i64) -> Vec<E> {
        self.cache
            .get::<E>(E::BUCKET)
            .into_iter()
            .filter(|e| e.owner() == user_id)
            .collect()
    }

    pub fn cached_item<E: Cached>(&self, id: EntityId) -> Option<E> {
        self.cache.find(E::BUCKET, id)
    }

    /// Mirror an entity the backend acknowledged.
    ///
    /// When it was saved under a temporary id, the temporary copy and any
    /// queued writes for it are replaced. An acknowledgement without a server
    /// id is not cached at all, so the entity can never be replayed as a
    /// second create.
    pub fn mirror<E: Cached>(&self, previous_id: Option<EntityId>, saved: &E) {
        let unsynced = previous_id.filter(|id| id.is_temporary());
        let result = match unsynced {
            Some(old) if saved.id().is_none() => self
                .cache
                .remove_entity::<E>(E::BUCKET, old)
                .and_then(|_| self.cache.remove_pending_for(old).map(|_| ())),
            _ if saved.id().is_none() => Ok(()),
            Some(old) if saved.id() != Some(old) => self
                .cache
                .replace_entity(E::BUCKET, old, saved.clone())
                .and_then(|_| self.cache.remove_pending_for(old).map(|_| ())),
            _ => self.cache.upsert(E::BUCKET, saved.clone()).map(|_| ()),
        };
        if let Err(e) = result {
            warn!(bucket = %E::BUCKET, error = %e, "Failed to mirror live result into cache");
        }
    }

    /// Drop an entity the backend deleted
    pub fn forget<E: Cached>(&self, id: EntityId) {
        if let Err(e) = self.cache.remove_entity::<E>(E::BUCKET, id) {
            warn!(bucket = %E::BUCKET, %id, error = %e, "Failed to remove cached entity");
        }
    }

    /// Record an offline create or update: cache the entity, queue the intent
    pub fn store_offline<E: Cached>(&self, method: &'static str, entity: E) -> Envelope<E> {
        let requested_id = entity.id();
        match self.cache.upsert(E::BUCKET, entity.clone()) {
            Ok(stored) => {
                let args = serde_json::to_value(&stored)
                    .map(|v| vec![v])
                    .unwrap_or_default();
                self.enqueue(
                    PendingRequest::new(E::SERVICE, method, args).with_target(stored.id()),
                );
                Envelope::cache(stored)
            }
            Err(e) => {
                warn!(bucket = %E::BUCKET, error = %e, "Cache write failed, echoing mock result");
                Envelope::mock(mock::echo(entity, requested_id))
            }
        }
    }

    /// Record an offline delete
    ///
    /// Entities the server never saw are simply forgotten along with their
    /// queued writes; persisted ones get a queued delete.
    pub fn delete_offline<E: Cached>(&self, method: &'static str, id: EntityId) -> Envelope<()> {
        self.forget::<E>(id);

        match id.server_id() {
            Some(server_id) => {
                self.enqueue(
                    PendingRequest::new(E::SERVICE, method, vec![Value::from(server_id)])
                        .with_target(Some(id)),
                );
            }
            None => match self.cache.remove_pending_for(id) {
                Ok(dropped) => debug!(%id, dropped, "Forgot unsynced entity"),
                Err(e) => warn!(%id, error = %e, "Failed to drop queued writes"),
            },
        }
        Envelope::cache(())
    }

    pub fn enqueue(&self, request: PendingRequest) {
        let service = request.service;
        let method = request.method.clone();
        match self.cache.enqueue_pending_request(request) {
            Ok(()) => {
                metrics::counter!("pending_requests_enqueued_total", "service" => service.as_str())
                    .increment(1);
                info!(
                    service = %service,
                    %method,
                    pending = self.cache.pending_count(),
                    "Write queued for later sync"
                );
            }
            Err(e) => warn!(service = %service, %method, error = %e, "Failed to queue write"),
        }
    }
}

fn count_fallback(service: ServiceName, method: &'static str) {
    metrics::counter!("fallback_calls_total", "service" => service.as_str(), "method" => method)
        .increment(1);
}
