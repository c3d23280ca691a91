//! Conversation state owned by a single session.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use coursebot_core::types::Role;

/// The four dialogue stages. `Start` is both the initial stage and the
/// stage every path eventually returns to; the conversation is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Start,
    ConfirmUtme,
    ConfirmSchools,
    Feedback,
}

/// Whether the user found the conversation helpful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Helpful {
    Yes,
    No,
}

impl std::fmt::Display for Helpful {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Helpful::Yes => write!(f, "yes"),
            Helpful::No => write!(f, "no"),
        }
    }
}

/// One line of conversation, user or assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLine {
    pub role: Role,
    pub text: String,
}

/// One interaction log record, appended per Start-stage classification.
///
/// `was_helpful` stays `None` until (and unless) the conversation reaches
/// the feedback stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub user_input: String,
    pub matched_course: String,
    pub score: f64,
    pub was_helpful: Option<Helpful>,
}

/// Mutable state of one conversation session.
///
/// Created by the session shell at session start, mutated only by the
/// dialogue engine, and discarded when the session ends. No durable
/// persistence beyond the optional log export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: Uuid,
    pub stage: Stage,
    pub matched_course: Option<String>,
    pub chat_history: Vec<ChatLine>,
    pub log: Vec<LogEntry>,
}

impl ConversationState {
    /// Fresh session: Start stage, no history, no log.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::Start,
            matched_course: None,
            chat_history: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.chat_history.push(ChatLine {
            role: Role::User,
            text: text.into(),
        });
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.chat_history.push(ChatLine {
            role: Role::Assistant,
            text: text.into(),
        });
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new()
    }
}
