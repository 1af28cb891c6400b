//! Fitness Coach Client Library
//!
//! Offline-tolerant client for the fitness coaching API. Every read and write
//! goes through a facade that falls back to the local cache and a built-in
//! dataset while the backend is down; writes made offline are queued and
//! replayed once it comes back.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod mock;
pub mod probe;
pub mod services;
pub mod state;
pub mod status;
pub mod store;
pub mod sync;

pub use chat::{ChatBridge, ChatOutcome};
pub use config::AppConfig;
pub use error::{ClientError, ClientResult};
pub use services::{DataSource, Envelope, Selector};
pub use state::ClientState;
pub use status::{BackendStatus, Notification, Notifier};
pub use sync::{SyncEngine, SyncReport};
