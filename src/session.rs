//! Session state controller.
//!
//! ```text
//!        submit             success
//! Idle ─────────▶ Processing ────────▶ Ready(session)
//!  ▲                  │ failure            │
//!  │                  ▼                    │
//!  └──── reset ── Error(message) ◀─────────┘ reset
//! ```
//!
//! A new submission is only accepted from `Idle`; `Ready` and `Error` must be
//! reset first. Generation failures of any kind collapse into one generic
//! message; the cause is logged, never shown.

use crate::config::StudyConfig;
use crate::content::{GeneratedContent, SummaryData};
use crate::error::{StudyError, GENERIC_FAILURE_MESSAGE};
use crate::flashcards::FlashcardNavigator;
use crate::pipeline::llm::{generate_content, ContentModel, GenerationOutput, GenerationStats};
use crate::pipeline::request::{build_request, Submission};
use crate::quiz::QuizEngine;
use std::fmt;
use tracing::{error, info};

/// The three views of a ready session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Summary,
    Flashcards,
    Quiz,
}

impl View {
    pub const ALL: [View; 3] = [View::Summary, View::Flashcards, View::Quiz];

    pub fn label(self) -> &'static str {
        match self {
            View::Summary => "Zusammenfassung",
            View::Flashcards => "Karteikarten",
            View::Quiz => "Quiz",
        }
    }
}

/// Learning material of a ready session plus the navigation state on it.
#[derive(Debug, Clone, PartialEq)]
pub struct StudySession {
    content: GeneratedContent,
    quiz: QuizEngine,
    flashcards: FlashcardNavigator,
    view: View,
    stats: GenerationStats,
}

impl StudySession {
    pub fn new(content: GeneratedContent, stats: GenerationStats) -> Self {
        Self {
            quiz: QuizEngine::new(content.quiz.clone()),
            flashcards: FlashcardNavigator::new(content.flashcards.clone()),
            content,
            view: View::default(),
            stats,
        }
    }

    pub fn content(&self) -> &GeneratedContent {
        &self.content
    }

    pub fn summary(&self) -> &SummaryData {
        &self.content.summary
    }

    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    pub fn quiz_mut(&mut self) -> &mut QuizEngine {
        &mut self.quiz
    }

    pub fn flashcards(&self) -> &FlashcardNavigator {
        &self.flashcards
    }

    pub fn flashcards_mut(&mut self) -> &mut FlashcardNavigator {
        &mut self.flashcards
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn select_view(&mut self, view: View) {
        self.view = view;
    }

    pub fn stats(&self) -> &GenerationStats {
        &self.stats
    }
}

/// Exactly one of these is active at a time.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Processing,
    Ready(Box<StudySession>),
    Error(String),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Processing => "processing",
            SessionState::Ready(_) => "ready",
            SessionState::Error(_) => "in error",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owns the session state and drives its transitions.
#[derive(Debug, Default)]
pub struct SessionController {
    state: SessionState,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, SessionState::Idle)
    }

    /// Whether a generation call is in flight; resubmission is refused.
    pub fn is_processing(&self) -> bool {
        matches!(self.state, SessionState::Processing)
    }

    pub fn session(&self) -> Option<&StudySession> {
        match &self.state {
            SessionState::Ready(session) => Some(session),
            _ => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut StudySession> {
        match &mut self.state {
            SessionState::Ready(session) => Some(session),
            _ => None,
        }
    }

    /// User-facing error message while in `Error`.
    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SessionState::Error(message) => Some(message),
            _ => None,
        }
    }

    fn transition_error(&self, action: &'static str) -> StudyError {
        StudyError::InvalidTransition {
            from: self.state.name().to_string(),
            action,
        }
    }

    /// Idle → Processing.
    pub fn begin(&mut self) -> Result<(), StudyError> {
        if !self.is_idle() {
            return Err(self.transition_error("submit"));
        }
        self.state = SessionState::Processing;
        Ok(())
    }

    /// Processing → Ready.
    pub fn succeed(&mut self, output: GenerationOutput) -> Result<(), StudyError> {
        if !self.is_processing() {
            return Err(self.transition_error("complete a generation"));
        }
        info!(
            "Session ready: {} chapters, {} flashcards, {} quiz questions",
            output.content.summary.chapters.len(),
            output.content.flashcards.len(),
            output.content.quiz.total_questions()
        );
        self.state = SessionState::Ready(Box::new(StudySession::new(output.content, output.stats)));
        Ok(())
    }

    /// Processing → Error. The cause is logged; the state keeps only the
    /// generic message.
    pub fn fail(&mut self, cause: &dyn fmt::Display) -> Result<(), StudyError> {
        if !self.is_processing() {
            return Err(self.transition_error("fail a generation"));
        }
        error!("Generation failed: {}", cause);
        self.state = SessionState::Error(GENERIC_FAILURE_MESSAGE.to_string());
        Ok(())
    }

    /// Ready | Error → Idle, discarding content and navigation state.
    /// A no-op while Idle.
    pub fn reset(&mut self) -> Result<(), StudyError> {
        match self.state {
            SessionState::Processing => Err(self.transition_error("reset")),
            _ => {
                self.state = SessionState::Idle;
                Ok(())
            }
        }
    }

    /// Run one submission through the model.
    ///
    /// A submission without material is rejected with
    /// [`StudyError::Validation`] and the session stays Idle; a submission
    /// outside Idle is an [`StudyError::InvalidTransition`]. Otherwise the
    /// session ends up Ready or Error, and the new state is returned.
    pub async fn submit(
        &mut self,
        model: &dyn ContentModel,
        submission: &Submission,
        config: &StudyConfig,
    ) -> Result<&SessionState, StudyError> {
        if !self.is_idle() {
            return Err(self.transition_error("submit"));
        }
        let request = build_request(submission)?;

        self.begin()?;
        match generate_content(model, request, config).await {
            Ok(output) => self.succeed(output)?,
            Err(e) => self.fail(&e)?,
        }
        Ok(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Flashcard, QuizData};
    use crate::error::GenerationError;

    fn output() -> GenerationOutput {
        GenerationOutput {
            content: GeneratedContent {
                summary: SummaryData {
                    title: "Biologie".into(),
                    chapters: vec![],
                },
                flashcards: vec![Flashcard {
                    term: "Zelle".into(),
                    definition: "Kleinste Einheit".into(),
                }],
                quiz: QuizData::default(),
            },
            stats: GenerationStats::default(),
        }
    }

    #[test]
    fn happy_path_and_reset() {
        let mut c = SessionController::new();
        c.begin().unwrap();
        assert!(c.is_processing());
        c.succeed(output()).unwrap();

        let session = c.session_mut().unwrap();
        assert_eq!(session.view(), View::Summary);
        session.select_view(View::Flashcards);
        session.flashcards_mut().flip().unwrap();

        c.reset().unwrap();
        assert!(c.is_idle());
        assert!(c.session().is_none());

        c.begin().unwrap();
        c.succeed(output()).unwrap();
        let session = c.session().unwrap();
        assert_eq!(session.view(), View::Summary);
        assert!(!session.flashcards().is_flipped());
    }

    #[test]
    fn failure_keeps_only_generic_message() {
        let mut c = SessionController::new();
        c.begin().unwrap();
        c.fail(&GenerationError::Parse("expected value at line 1".into()))
            .unwrap();
        assert_eq!(c.error_message(), Some(GENERIC_FAILURE_MESSAGE));
        assert!(c.session().is_none());
        c.reset().unwrap();
        assert!(c.is_idle());
    }

    #[test]
    fn no_resubmission_without_reset() {
        let mut c = SessionController::new();
        c.begin().unwrap();
        assert!(matches!(c.begin(), Err(StudyError::InvalidTransition { .. })));
        c.succeed(output()).unwrap();

        let err = c.begin().unwrap_err();
        assert_eq!(err.to_string(), "Cannot submit while the session is ready");
    }

    #[test]
    fn reset_while_processing_is_refused() {
        let mut c = SessionController::new();
        c.begin().unwrap();
        assert!(c.reset().is_err());
        assert!(c.is_processing());
    }

    #[test]
    fn reset_from_idle_is_a_noop() {
        let mut c = SessionController::new();
        c.reset().unwrap();
        assert!(c.is_idle());
    }

    #[test]
    fn completion_requires_processing() {
        let mut c = SessionController::new();
        assert!(c.succeed(output()).is_err());
        assert!(c.fail(&"boom").is_err());
        assert!(c.is_idle());
    }
}
