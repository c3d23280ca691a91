//! Conversational engine for coursebot.
//!
//! Drives the four-stage advisory dialogue (course match, UTME
//! requirements, offering schools, feedback) over the catalog and the two
//! model services, maintaining per-session conversation state and an
//! exportable interaction log.

pub mod engine;
pub mod error;
pub mod export;
pub mod state;

pub use engine::DialogueEngine;
pub use error::ChatError;
pub use export::{log_to_csv_string, write_log_csv};
pub use state::{ChatLine, ConversationState, Helpful, LogEntry, Stage};
