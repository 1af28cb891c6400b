//! Entity identifiers
//!
//! An entity created while the backend is unreachable carries a client-side
//! temporary identifier until the server acknowledges it. The two kinds are
//! kept apart by type instead of by numeric range.

use crate::errors::IdError;
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Bare integer ids above this value were generated on the client.
///
/// Only consulted for caches written before ids were tagged.
pub const LEGACY_TEMPORARY_ID_THRESHOLD: i64 = 1_000_000_000;

static LAST_TEMPORARY_ID: AtomicI64 = AtomicI64::new(0);

/// Identifier of a cached or server-side entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityId {
    /// Generated on the client, never seen by the server
    Temporary { local_id: i64 },
    /// Assigned by the server
    Persisted { server_id: i64 },
}

impl EntityId {
    /// Allocate a new temporary identifier derived from the wall clock.
    ///
    /// Values are strictly increasing within a process, so two entities
    /// created in the same millisecond still get distinct ids.
    pub fn new_temporary() -> Self {
        let now = Utc::now().timestamp_millis();
        let previous = LAST_TEMPORARY_ID
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        EntityId::Temporary {
            local_id: now.max(previous + 1),
        }
    }

    /// Identifier assigned by the server
    pub fn persisted(server_id: i64) -> Self {
        EntityId::Persisted { server_id }
    }

    /// Classify a bare integer id read from an untagged cache
    pub fn from_legacy(value: i64) -> Self {
        if value > LEGACY_TEMPORARY_ID_THRESHOLD {
            EntityId::Temporary { local_id: value }
        } else {
            EntityId::Persisted { server_id: value }
        }
    }

    pub fn is_temporary(&self) -> bool {
        matches!(self, EntityId::Temporary { .. })
    }

    /// Server id, if the server has acknowledged this entity
    pub fn server_id(&self) -> Option<i64> {
        match self {
            EntityId::Persisted { server_id } => Some(*server_id),
            EntityId::Temporary { .. } => None,
        }
    }

    /// Server id or an error naming the temporary id
    pub fn require_persisted(&self) -> Result<i64, IdError> {
        match self {
            EntityId::Persisted { server_id } => Ok(*server_id),
            EntityId::Temporary { local_id } => Err(IdError::NotPersisted(*local_id)),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Temporary { local_id } => write!(f, "tmp-{}", local_id),
            EntityId::Persisted { server_id } => write!(f, "{}", server_id),
        }
    }
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TaggedEntityId {
    Temporary { local_id: i64 },
    Persisted { server_id: i64 },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntityId {
    Legacy(i64),
    Tagged(TaggedEntityId),
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawEntityId::deserialize(deserializer)? {
            RawEntityId::Legacy(value) => EntityId::from_legacy(value),
            RawEntityId::Tagged(TaggedEntityId::Temporary { local_id }) => {
                EntityId::Temporary { local_id }
            }
            RawEntityId::Tagged(TaggedEntityId::Persisted { server_id }) => {
                EntityId::Persisted { server_id }
            }
        })
    }
}
