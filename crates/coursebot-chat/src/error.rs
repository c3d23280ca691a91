//! Error types for the dialogue engine.

use coursebot_core::error::CoursebotError;

/// Errors surfaced by a dialogue turn.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Feedback stage found no log entry to back-fill. Unreachable through
    /// the transition table; if it fires, the state machine is broken.
    #[error("feedback received but the interaction log is empty")]
    EmptyLog,
    /// A confirm stage was entered without a recorded course match.
    /// Like [`ChatError::EmptyLog`], unreachable through the table.
    #[error("stage requires a matched course but none is recorded")]
    NoMatchedCourse,
    #[error("classifier error: {0}")]
    Classifier(String),
    #[error("intent scorer error: {0}")]
    Intent(String),
    #[error("catalog error: {0}")]
    Catalog(String),
    #[error("log export error: {0}")]
    Export(String),
}

impl From<csv::Error> for ChatError {
    fn from(err: csv::Error) -> Self {
        ChatError::Export(err.to_string())
    }
}

impl ChatError {
    /// Bridge a catalog lookup failure, preserving the source message.
    pub(crate) fn from_catalog(err: CoursebotError) -> Self {
        ChatError::Catalog(err.to_string())
    }

    pub(crate) fn from_classifier(err: CoursebotError) -> Self {
        ChatError::Classifier(err.to_string())
    }

    pub(crate) fn from_intent(err: CoursebotError) -> Self {
        ChatError::Intent(err.to_string())
    }
}
