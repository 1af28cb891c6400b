//! Fitness Coach Shared Library
//!
//! Domain entities, identifiers, validation and chat action extraction shared
//! by the client crate and anything else that speaks the coaching API.

pub mod actions;
pub mod errors;
pub mod ids;
pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use actions::{
    extract_action_blocks, strip_action_blocks, strip_code_fence, ActionBlock, ActionTag,
};
pub use errors::*;
pub use ids::{EntityId, LEGACY_TEMPORARY_ID_THRESHOLD};
pub use models::*;
pub use types::*;
