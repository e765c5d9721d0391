//! # smartlearn
//!
//! Turn lecture scripts, notes and free text into a structured summary,
//! flashcards and a multiple-choice quiz with one call to a generative model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF / DOCX / text / URL
//!  │
//!  ├─ 1. Input    normalise to PDF bytes or plain text (per-file failures)
//!  ├─ 2. Request  free text + files + focus/exclusion hints + output contract
//!  ├─ 3. Model    one schema-constrained call (Gemini or any edgequake-llm provider)
//!  ├─ 4. Polish   fences, bullets, contract checks
//!  └─ 5. Session  Idle → Processing → Ready | Error, quiz + flashcards on Ready
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smartlearn::{generate_from_inputs, StudyConfig, Submission};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Backend auto-detected: GEMINI_API_KEY, else OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = StudyConfig::default();
//!     let submission = Submission::default().with_focus("Marketing-Mix");
//!     let output = generate_from_inputs(&["vorlesung.pdf"], submission, &config).await?;
//!
//!     println!("{}", output.content.summary.title);
//!     println!("{} flashcards, {} quiz questions",
//!         output.content.flashcards.len(),
//!         output.content.quiz.total_questions());
//!     Ok(())
//! }
//! ```
//!
//! ## Interactive sessions
//!
//! [`SessionController`] owns the lifecycle of one submission and hands out
//! a [`StudySession`] with a [`QuizEngine`] and a [`FlashcardNavigator`]
//! once the material is ready. A new submission requires a reset first.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `smartlearn` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! smartlearn = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod content;
pub mod error;
pub mod export;
pub mod flashcards;
pub mod generate;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quiz;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Backend, ContentPolicy, StudyConfig, StudyConfigBuilder};
pub use content::{
    ChapterSummary, Flashcard, GeneratedContent, QuizChapter, QuizData, QuizQuestion,
    SummaryData, Topic,
};
pub use error::{ExtractionError, GenerationError, StudyError, GENERIC_FAILURE_MESSAGE};
pub use export::{export_pdf, render_study_sheet, render_summary, DEFAULT_EXPORT_FILE_NAME};
pub use flashcards::{FlashcardNavigator, NoContent, Side};
pub use generate::{generate, generate_from_inputs, generate_sync, generate_to_file, resolve_model, StudyOutput};
pub use pipeline::input::{normalize_inputs, FileInput, InputKind};
pub use pipeline::llm::{ContentModel, GenerationOutput, GenerationRequest, GenerationStats, ModelReply};
pub use pipeline::request::{build_request, ContentPart, ContentRequest, Submission};
pub use progress::{GenerationProgressCallback, NoopProgressCallback, ProgressCallback};
pub use quiz::{Band, FinishReason, QuizEngine, QuizReport};
pub use session::{SessionController, SessionState, StudySession, View};
