//! Coursebot core crate - shared types, error taxonomy, and configuration.
//!
//! Everything here is dependency-light and consumed by every other crate
//! in the workspace: the top-level error enum, the TOML configuration
//! sections, and the small value types (roles, embeddings, match scores)
//! that cross crate boundaries.

pub mod config;
pub mod error;
pub mod types;

pub use config::CoursebotConfig;
pub use error::{CoursebotError, Result};
pub use types::{Embedding, MatchScore, Role};
