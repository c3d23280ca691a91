//! The four-stage dialogue state machine.
//!
//! One `handle_turn` call consumes one user message, runs whatever model
//! and catalog calls the current stage needs, and only then mutates the
//! conversation state. A turn is atomic: if a classifier or intent call
//! fails, the state (history, log, stage) is exactly as it was before.
//!
//! Transition table:
//!
//! | Stage          | positive?            | replies                      | next           |
//! |----------------|----------------------|------------------------------|----------------|
//! | Start          | n/a (classify)       | course confirmation question | ConfirmUtme    |
//! | ConfirmUtme    | yes                  | UTME subjects + follow-up    | ConfirmSchools |
//! | ConfirmUtme    | no                   | retry prompt                 | Start          |
//! | ConfirmSchools | yes                  | school list + feedback ask   | Feedback       |
//! | ConfirmSchools | no                   | acknowledgment               | Start          |
//! | Feedback       | either (back-fills)  | thanks                       | Start          |

use std::sync::Arc;

use chrono::Local;
use tracing::{debug, info};

use coursebot_catalog::CourseCatalog;
use coursebot_core::types::MatchScore;
use coursebot_model::classifier::DynZeroShotClassifier;
use coursebot_model::intent::IntentScorer;

use crate::error::ChatError;
use crate::state::{ConversationState, Helpful, LogEntry, Stage};

const GREETING: &str =
    "Hi there! Tell me what you're interested in studying or your career goals.";
const ASK_SCHOOLS: &str =
    "Would you also like to see the list of schools offering this course?";
const ASK_FEEDBACK: &str = "Was this helpful?";
const RETRY_PROMPT: &str = "Alright! Tell me another interest and I'll try again.";
const ACKNOWLEDGE: &str = "No problem! You can ask me about another course.";
const THANKS: &str = "Thanks for your feedback! You can tell me about another interest anytime.";

/// The finite-state controller driving one advisory conversation.
///
/// Holds the read-only catalog and the two model services; all mutable
/// state lives in the caller-owned [`ConversationState`]. The hosting
/// shell is responsible for serializing turns per session.
pub struct DialogueEngine {
    catalog: Arc<CourseCatalog>,
    classifier: Arc<dyn DynZeroShotClassifier>,
    intent: IntentScorer,
}

impl DialogueEngine {
    pub fn new(
        catalog: Arc<CourseCatalog>,
        classifier: Arc<dyn DynZeroShotClassifier>,
        intent: IntentScorer,
    ) -> Self {
        Self {
            catalog,
            classifier,
            intent,
        }
    }

    /// The bot's opening prompt for a conversation with no history yet.
    pub fn greeting(&self) -> &'static str {
        GREETING
    }

    /// Process one user message and return the assistant reply lines, in
    /// order. Appends the user message and the replies to the history and
    /// advances the stage; on error, nothing is mutated.
    pub async fn handle_turn(
        &self,
        state: &mut ConversationState,
        input: &str,
    ) -> Result<Vec<String>, ChatError> {
        debug!(session = %state.id, stage = ?state.stage, "Handling turn");
        let replies = match state.stage {
            Stage::Start => self.turn_start(state, input).await,
            Stage::ConfirmUtme => self.turn_confirm_utme(state, input).await,
            Stage::ConfirmSchools => self.turn_confirm_schools(state, input).await,
            Stage::Feedback => self.turn_feedback(state, input).await,
        }?;
        debug!(session = %state.id, next_stage = ?state.stage, "Turn complete");
        Ok(replies)
    }

    /// Start: classify the message against the full course catalog, record
    /// a log entry, and ask for confirmation. Always reclassifies fresh;
    /// any stale match from an earlier round is overwritten.
    async fn turn_start(
        &self,
        state: &mut ConversationState,
        input: &str,
    ) -> Result<Vec<String>, ChatError> {
        let candidates = self.catalog.course_names();
        let classification = self
            .classifier
            .classify_boxed(input, &candidates)
            .await
            .map_err(ChatError::from_classifier)?;
        let (course, score) = classification
            .top_label()
            .map(|(c, s)| (c.to_string(), s))
            .ok_or_else(|| ChatError::Classifier("classifier returned no labels".to_string()))?;

        info!(session = %state.id, course = %course, score, "Course matched");

        state.push_user(input);
        state.matched_course = Some(course.clone());
        state.log.push(LogEntry {
            timestamp: Local::now(),
            user_input: input.to_string(),
            matched_course: course.clone(),
            score: MatchScore::new(score).rounded(),
            was_helpful: None,
        });

        let reply = format!(
            "It seems like you're interested in {}. Would you like to see the UTME requirements?",
            course
        );
        state.push_assistant(&reply);
        state.stage = Stage::ConfirmUtme;
        Ok(vec![reply])
    }

    /// ConfirmUtme: on yes, show the matched course's UTME subjects and
    /// offer the school list; on no, back to Start. The catalog is only
    /// consulted on the yes path.
    async fn turn_confirm_utme(
        &self,
        state: &mut ConversationState,
        input: &str,
    ) -> Result<Vec<String>, ChatError> {
        let positive = self
            .intent
            .is_positive(input)
            .await
            .map_err(ChatError::from_intent)?;

        if !positive {
            state.push_user(input);
            state.push_assistant(RETRY_PROMPT);
            state.stage = Stage::Start;
            return Ok(vec![RETRY_PROMPT.to_string()]);
        }

        let course = state
            .matched_course
            .clone()
            .ok_or(ChatError::NoMatchedCourse)?;
        let record = self
            .catalog
            .lookup(&course)
            .map_err(ChatError::from_catalog)?;

        let subjects = format!(
            "Here are the UTME requirements for {}:\n{}",
            record.course, record.utme_subjects
        );

        state.push_user(input);
        state.push_assistant(&subjects);
        state.push_assistant(ASK_SCHOOLS);
        state.stage = Stage::ConfirmSchools;
        Ok(vec![subjects, ASK_SCHOOLS.to_string()])
    }

    /// ConfirmSchools: on yes, list the offering schools (comma-split,
    /// bulleted) and ask for feedback; on no, back to Start.
    async fn turn_confirm_schools(
        &self,
        state: &mut ConversationState,
        input: &str,
    ) -> Result<Vec<String>, ChatError> {
        let positive = self
            .intent
            .is_positive(input)
            .await
            .map_err(ChatError::from_intent)?;

        if !positive {
            state.push_user(input);
            state.push_assistant(ACKNOWLEDGE);
            state.stage = Stage::Start;
            return Ok(vec![ACKNOWLEDGE.to_string()]);
        }

        let course = state
            .matched_course
            .clone()
            .ok_or(ChatError::NoMatchedCourse)?;
        let record = self
            .catalog
            .lookup(&course)
            .map_err(ChatError::from_catalog)?;

        let mut listing = format!("Here are the schools offering {}:", record.course);
        for school in record.schools() {
            listing.push_str("\n\u{2022} ");
            listing.push_str(school);
        }

        state.push_user(input);
        state.push_assistant(&listing);
        state.push_assistant(ASK_FEEDBACK);
        state.stage = Stage::Feedback;
        Ok(vec![listing, ASK_FEEDBACK.to_string()])
    }

    /// Feedback: back-fill `was_helpful` on the latest log entry and
    /// return to Start. An empty log here means the transition table was
    /// bypassed; that fails loudly.
    async fn turn_feedback(
        &self,
        state: &mut ConversationState,
        input: &str,
    ) -> Result<Vec<String>, ChatError> {
        let positive = self
            .intent
            .is_positive(input)
            .await
            .map_err(ChatError::from_intent)?;

        if state.log.is_empty() {
            return Err(ChatError::EmptyLog);
        }

        state.push_user(input);
        let verdict = if positive { Helpful::Yes } else { Helpful::No };
        if let Some(last) = state.log.last_mut() {
            last.was_helpful = Some(verdict);
        }
        info!(session = %state.id, helpful = %verdict, "Feedback recorded");

        state.push_assistant(THANKS);
        state.stage = Stage::Start;
        Ok(vec![THANKS.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use coursebot_core::error::CoursebotError;
    use coursebot_core::types::Role;
    use coursebot_model::classifier::{Classification, MockClassifier, ZeroShotClassifier};
    use coursebot_model::embedding::{EmbeddingService, MockEmbedding};
    use coursebot_model::intent::DEFAULT_INTENT_THRESHOLD;

    const SAMPLE: &str = "\
course,utme_subjects,schools_offering
Biology,\"English, Biology, Chemistry, Physics\",\"UNILAG, UI, OAU\"
Law,\"English, Literature, Government\",UNILAG
Computer Science,\"English, Mathematics, Physics\",\"OAU, FUTA\"
";

    fn catalog() -> Arc<CourseCatalog> {
        Arc::new(CourseCatalog::from_reader(Cursor::new(SAMPLE)).unwrap())
    }

    async fn engine() -> DialogueEngine {
        let intent = IntentScorer::new(Arc::new(MockEmbedding::new()), DEFAULT_INTENT_THRESHOLD)
            .await
            .unwrap();
        DialogueEngine::new(catalog(), Arc::new(MockClassifier::new()), intent)
    }

    /// Classifier that always fails, for atomicity tests.
    struct FailingClassifier;

    impl ZeroShotClassifier for FailingClassifier {
        async fn classify(
            &self,
            _text: &str,
            _labels: &[String],
        ) -> Result<Classification, CoursebotError> {
            Err(CoursebotError::Model("backend unavailable".to_string()))
        }
    }

    /// Input that [`OutageEmbedding`] refuses to embed.
    const OUTAGE_INPUT: &str = "trigger an embedding outage";

    /// Embedder that works normally except for one poisoned input, so the
    /// intent scorer can be built and then fail mid-conversation.
    struct OutageEmbedding(MockEmbedding);

    impl EmbeddingService for OutageEmbedding {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, CoursebotError> {
            if text == OUTAGE_INPUT {
                return Err(CoursebotError::Model("backend unavailable".to_string()));
            }
            self.0.embed(text).await
        }

        fn dimensions(&self) -> usize {
            self.0.dimensions()
        }
    }

    // ---- Greeting ----

    #[tokio::test]
    async fn test_greeting_text() {
        let engine = engine().await;
        assert!(engine.greeting().contains("interested in studying"));
    }

    // ---- Start stage ----

    #[tokio::test]
    async fn test_start_matches_course_and_advances() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        let replies = engine.handle_turn(&mut state, "I like biology").await.unwrap();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("Biology"));
        assert!(replies[0].contains("UTME requirements"));
        assert_eq!(state.stage, Stage::ConfirmUtme);
        assert_eq!(state.matched_course.as_deref(), Some("Biology"));
    }

    #[tokio::test]
    async fn test_start_appends_one_log_entry() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        assert_eq!(state.log.len(), 1);
        let entry = &state.log[0];
        assert_eq!(entry.user_input, "I like biology");
        assert_eq!(entry.matched_course, "Biology");
        assert!(entry.score > 0.0 && entry.score <= 1.0);
        assert!(entry.was_helpful.is_none());
    }

    #[tokio::test]
    async fn test_start_records_history_user_then_assistant() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        assert_eq!(state.chat_history.len(), 2);
        assert_eq!(state.chat_history[0].role, Role::User);
        assert_eq!(state.chat_history[0].text, "I like biology");
        assert_eq!(state.chat_history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_start_score_is_rounded_to_four_places() {
        let engine = engine().await;
        let mut state = ConversationState::new();
        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        let score = state.log[0].score;
        assert_eq!(score, (score * 10_000.0).round() / 10_000.0);
    }

    // ---- ConfirmUtme stage ----

    #[tokio::test]
    async fn test_confirm_utme_yes_shows_subjects() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        let replies = engine.handle_turn(&mut state, "yes").await.unwrap();

        assert_eq!(replies.len(), 2);
        assert!(replies[0].contains("English, Biology, Chemistry, Physics"));
        assert!(replies[1].contains("schools offering"));
        assert_eq!(state.stage, Stage::ConfirmSchools);
    }

    #[tokio::test]
    async fn test_confirm_utme_no_returns_to_start() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        let replies = engine.handle_turn(&mut state, "not interested").await.unwrap();

        assert_eq!(replies, vec![RETRY_PROMPT.to_string()]);
        assert_eq!(state.stage, Stage::Start);
        // Only the Start turn logged anything.
        assert_eq!(state.log.len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_utme_no_never_touches_catalog() {
        // A matched course that is NOT in the catalog: the no path must
        // still succeed because lookup only happens on yes.
        let engine = engine().await;
        let mut state = ConversationState::new();
        state.stage = Stage::ConfirmUtme;
        state.matched_course = Some("Astrology".to_string());

        let replies = engine.handle_turn(&mut state, "nothing matches here").await.unwrap();
        assert_eq!(replies, vec![RETRY_PROMPT.to_string()]);
        assert_eq!(state.stage, Stage::Start);
    }

    #[tokio::test]
    async fn test_confirm_utme_yes_without_match_fails_loudly() {
        let engine = engine().await;
        let mut state = ConversationState::new();
        state.stage = Stage::ConfirmUtme;

        let err = engine.handle_turn(&mut state, "yes").await.unwrap_err();
        assert!(matches!(err, ChatError::NoMatchedCourse));
    }

    // ---- ConfirmSchools stage ----

    #[tokio::test]
    async fn test_confirm_schools_yes_lists_bulleted_schools() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        let replies = engine.handle_turn(&mut state, "sure").await.unwrap();

        assert_eq!(replies.len(), 2);
        assert!(replies[0].contains("\u{2022} UNILAG"));
        assert!(replies[0].contains("\u{2022} UI"));
        assert!(replies[0].contains("\u{2022} OAU"));
        assert_eq!(replies[1], ASK_FEEDBACK);
        assert_eq!(state.stage, Stage::Feedback);
    }

    #[tokio::test]
    async fn test_confirm_schools_no_returns_to_start() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        let replies = engine.handle_turn(&mut state, "rather not bother").await.unwrap();

        assert_eq!(replies, vec![ACKNOWLEDGE.to_string()]);
        assert_eq!(state.stage, Stage::Start);
    }

    // ---- Feedback stage ----

    #[tokio::test]
    async fn test_full_conversation_happy_path() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        let replies = engine.handle_turn(&mut state, "yes").await.unwrap();

        assert_eq!(replies, vec![THANKS.to_string()]);
        assert_eq!(state.stage, Stage::Start);
        assert_eq!(state.log.len(), 1);
        assert_eq!(state.log[0].was_helpful, Some(Helpful::Yes));
    }

    #[tokio::test]
    async fn test_negative_feedback_recorded_as_no() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        engine.handle_turn(&mut state, "that was useless").await.unwrap();

        assert_eq!(state.log[0].was_helpful, Some(Helpful::No));
        assert_eq!(state.stage, Stage::Start);
    }

    #[tokio::test]
    async fn test_feedback_with_empty_log_fails_loudly() {
        let engine = engine().await;
        let mut state = ConversationState::new();
        state.stage = Stage::Feedback;

        let err = engine.handle_turn(&mut state, "yes").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyLog));
        // Nothing was mutated.
        assert!(state.chat_history.is_empty());
        assert_eq!(state.stage, Stage::Feedback);
    }

    #[tokio::test]
    async fn test_feedback_backfills_most_recent_entry_only() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        // Round one, abandoned at ConfirmUtme.
        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        engine.handle_turn(&mut state, "something else entirely").await.unwrap();
        // Round two, completed.
        engine.handle_turn(&mut state, "law school").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();
        engine.handle_turn(&mut state, "yes").await.unwrap();

        assert_eq!(state.log.len(), 2);
        assert!(state.log[0].was_helpful.is_none());
        assert_eq!(state.log[1].was_helpful, Some(Helpful::Yes));
    }

    // ---- Re-entry ----

    #[tokio::test]
    async fn test_reentering_start_reclassifies_fresh() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        assert_eq!(state.matched_course.as_deref(), Some("Biology"));
        engine.handle_turn(&mut state, "different topic please").await.unwrap();

        engine.handle_turn(&mut state, "law school").await.unwrap();
        assert_eq!(state.matched_course.as_deref(), Some("Law"));
        assert_eq!(state.log.len(), 2);
        assert_eq!(state.log[1].matched_course, "Law");
    }

    #[tokio::test]
    async fn test_conversation_is_unbounded() {
        let engine = engine().await;
        let mut state = ConversationState::new();

        for _ in 0..5 {
            engine.handle_turn(&mut state, "I like biology").await.unwrap();
            engine.handle_turn(&mut state, "yes").await.unwrap();
            engine.handle_turn(&mut state, "yes").await.unwrap();
            engine.handle_turn(&mut state, "yes").await.unwrap();
            assert_eq!(state.stage, Stage::Start);
        }
        assert_eq!(state.log.len(), 5);
    }

    // ---- Atomicity ----

    #[tokio::test]
    async fn test_failed_classification_mutates_nothing() {
        let intent = IntentScorer::new(Arc::new(MockEmbedding::new()), DEFAULT_INTENT_THRESHOLD)
            .await
            .unwrap();
        let engine = DialogueEngine::new(catalog(), Arc::new(FailingClassifier), intent);
        let mut state = ConversationState::new();

        let err = engine.handle_turn(&mut state, "I like biology").await.unwrap_err();
        assert!(matches!(err, ChatError::Classifier(_)));
        assert!(state.chat_history.is_empty());
        assert!(state.log.is_empty());
        assert!(state.matched_course.is_none());
        assert_eq!(state.stage, Stage::Start);
    }

    #[tokio::test]
    async fn test_failed_intent_scoring_mutates_nothing() {
        let intent = IntentScorer::new(
            Arc::new(OutageEmbedding(MockEmbedding::new())),
            DEFAULT_INTENT_THRESHOLD,
        )
        .await
        .unwrap();
        let engine = DialogueEngine::new(catalog(), Arc::new(MockClassifier::new()), intent);
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        let history_len = state.chat_history.len();

        let err = engine.handle_turn(&mut state, OUTAGE_INPUT).await.unwrap_err();
        assert!(matches!(err, ChatError::Intent(_)));
        assert_eq!(state.chat_history.len(), history_len);
        assert_eq!(state.stage, Stage::ConfirmUtme);
    }

    // ---- Empty input ----

    #[tokio::test]
    async fn test_empty_input_is_ordinary_text() {
        // An empty message is not an error: it scores as not affirmative
        // and takes the retry path like any other non-matching text.
        let engine = engine().await;
        let mut state = ConversationState::new();

        engine.handle_turn(&mut state, "I like biology").await.unwrap();
        let replies = engine.handle_turn(&mut state, "").await.unwrap();

        assert_eq!(replies, vec![RETRY_PROMPT.to_string()]);
        assert_eq!(state.stage, Stage::Start);

        // Back at Start, an empty message still classifies to some course.
        let replies = engine.handle_turn(&mut state, "").await.unwrap();
        assert!(replies[0].contains("UTME requirements"));
        assert_eq!(state.stage, Stage::ConfirmUtme);
        assert_eq!(state.log.len(), 2);
    }

    // ---- Empty catalog ----

    #[tokio::test]
    async fn test_empty_catalog_fails_classification() {
        let empty = Arc::new(
            CourseCatalog::from_reader(Cursor::new("course,utme_subjects,schools_offering\n"))
                .unwrap(),
        );
        let intent = IntentScorer::new(Arc::new(MockEmbedding::new()), DEFAULT_INTENT_THRESHOLD)
            .await
            .unwrap();
        let engine = DialogueEngine::new(empty, Arc::new(MockClassifier::new()), intent);
        let mut state = ConversationState::new();

        let err = engine.handle_turn(&mut state, "I like biology").await.unwrap_err();
        assert!(matches!(err, ChatError::Classifier(_)));
        assert!(err.to_string().contains("no courses"));
    }
}
