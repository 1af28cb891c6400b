//! Backend availability probe
//!
//! Two states, `AVAILABLE` and `UNAVAILABLE`. A bounded GET against the health
//! endpoint runs once at startup and then on a fixed interval. Checks run
//! inside the loop task, so a slow check delays the next tick instead of
//! overlapping it; ticks that fall due meanwhile are skipped.

use crate::config::AppConfig;
use crate::error::ClientResult;
use crate::status::{BackendStatus, Notification, Notifier};
use crate::store::LocalCache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Result of a single health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Available {
        /// The previous state was unavailable
        reconnected: bool,
        pending: usize,
    },
    Unavailable {
        reason: String,
    },
}

/// Periodic health checker
pub struct AvailabilityProbe {
    http: reqwest::Client,
    health_url: String,
    timeout: Duration,
    interval: Duration,
    status: Arc<BackendStatus>,
    cache: Arc<LocalCache>,
    notifier: Notifier,
}

impl AvailabilityProbe {
    pub fn new(
        config: &AppConfig,
        status: Arc<BackendStatus>,
        cache: Arc<LocalCache>,
        notifier: Notifier,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.probe.timeout())
            .build()?;

        Ok(Self {
            http,
            health_url: config.health_url(),
            timeout: config.probe.timeout(),
            interval: config.probe.interval(),
            status,
            cache,
            notifier,
        })
    }

    /// Run one check and apply the transition rules
    pub async fn check_once(&self) -> ProbeOutcome {
        let result = self
            .http
            .get(&self.health_url)
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => {
                let was_available = self.status.record(true);
                let reconnected = !was_available;
                let pending = if reconnected {
                    self.cache.pending_count()
                } else {
                    0
                };

                if reconnected {
                    if pending > 0 {
                        info!(pending, "Backend reachable again, pending changes can be synced");
                        self.notifier.notify(Notification::SyncAvailable { pending });
                    } else {
                        info!("Backend reachable again");
                        self.notifier.notify(Notification::BackendRestored);
                    }
                } else {
                    debug!("Backend healthy");
                }

                ProbeOutcome::Available {
                    reconnected,
                    pending,
                }
            }
            Err(e) => {
                let reason = if e.is_timeout() {
                    format!("health check timed out after {:?}", self.timeout)
                } else {
                    e.to_string()
                };
                let was_available = self.status.record(false);
                if was_available {
                    warn!(
                        url = %self.health_url,
                        %reason,
                        "Backend unavailable, using fallback data"
                    );
                } else {
                    debug!(%reason, "Backend still unavailable");
                }
                self.notifier.notify(Notification::UsingFallback);
                ProbeOutcome::Unavailable { reason }
            }
        }
    }

    /// Check at startup and then every interval until `shutdown` flips to true
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        info!(url = %self.health_url, interval = ?self.interval, "Starting availability probe");
        let probe = &self;
        every_interval(self.interval, shutdown, move || async move {
            probe.check_once().await;
        })
        .await;
        info!("Availability probe stopped");
    }
}

/// Run `check` on each tick, one at a time
///
/// The check runs inside the loop, so a slow one holds the next tick back.
/// Ticks that fell due meanwhile collapse into a single late tick.
async fn every_interval<F, Fut>(
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut check: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval.max(MIN_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => check().await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
