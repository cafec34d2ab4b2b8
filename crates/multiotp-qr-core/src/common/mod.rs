//! Shared types and error definitions used across the delivery run.
//!
//! ## Submodules
//!
//! - [`error`] - Central error type and its fatal/per-identity split.
//! - [`types`] - Identities, artifact records and stage messages.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
