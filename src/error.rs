//! Error types for the smartlearn library.
//!
//! Three error types mirror three places a study session can go wrong:
//!
//! * [`StudyError`] — **Fatal** for the operation at hand: no input was
//!   given, the session was driven through an illegal transition, the
//!   provider is not configured, or an export could not be written.
//!
//! * [`ExtractionError`] — **Non-fatal**, per file: one upload could not be
//!   normalised (unreadable file, broken Word archive) but the other files
//!   are fine. Collected next to the normalised inputs in
//!   [`crate::pipeline::input::NormalizedInputs`] and never handed to the
//!   session controller.
//!
//! * [`GenerationError`] — the single model call failed. The session
//!   controller collapses every variant into [`GENERIC_FAILURE_MESSAGE`];
//!   the variant itself is only logged.

use std::path::PathBuf;
use thiserror::Error;

/// The only failure text a user sees when generation fails.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "Ein Fehler ist aufgetreten. Bitte überprüfe deine Dateien oder den API Key.";

/// Shown when a submission carries neither files nor text.
pub const EMPTY_SUBMISSION_MESSAGE: &str =
    "Bitte laden Sie mindestens eine Datei hoch oder geben Sie Text ein.";

/// All fatal errors returned by the smartlearn library.
#[derive(Debug, Error)]
pub enum StudyError {
    // ── Submission errors ─────────────────────────────────────────────────
    /// The submission has no files and no (non-blank) text.
    #[error("{}", EMPTY_SUBMISSION_MESSAGE)]
    Validation,

    /// The session controller was asked for a transition its current state
    /// does not allow (e.g. submitting while Ready without a reset).
    #[error("Cannot {action} while the session is {from}")]
    InvalidTransition { from: String, action: &'static str },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    InputNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model call failed. Only surfaced by the direct
    /// [`crate::generate::generate`] API; the session controller turns it
    /// into an Error state instead.
    #[error(transparent)]
    Generation(#[from] GenerationError),

    // ── Export errors ─────────────────────────────────────────────────────
    /// The PDF document could not be assembled.
    #[error("PDF export failed: {0}")]
    ExportFailed(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF export needs the pdfium shared library.\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Or place libpdfium next to the binary / in the working directory.\n"
    )]
    PdfiumBindingFailed(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single uploaded document.
///
/// The remaining documents are still submitted.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    /// The file could not be opened or read.
    #[error("{name}: could not be read: {detail}")]
    Unreadable { name: String, detail: String },

    /// A Word document was malformed; nothing is substituted for it.
    #[error("Fehler beim Lesen von {name}. Bitte als PDF versuchen. ({detail})")]
    WordExtraction { name: String, detail: String },

    /// The document decoded to nothing but whitespace.
    #[error("{name}: document contains no text")]
    EmptyDocument { name: String },

    /// A URL input could not be fetched.
    #[error("{name}: download failed: {detail}")]
    Download { name: String, detail: String },
}

impl ExtractionError {
    /// Name of the file (or URL) that failed.
    pub fn name(&self) -> &str {
        match self {
            ExtractionError::Unreadable { name, .. }
            | ExtractionError::WordExtraction { name, .. }
            | ExtractionError::EmptyDocument { name }
            | ExtractionError::Download { name, .. } => name,
        }
    }
}

/// Failure of the one generation call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GenerationError {
    /// Network failure or a non-success HTTP status from the endpoint.
    #[error("Model request failed: {0}")]
    Transport(String),

    /// The endpoint rejected the credentials (401/403).
    #[error("Authentication rejected by '{provider}': {detail}")]
    Auth { provider: String, detail: String },

    /// The call exceeded the configured API timeout.
    #[error("Model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The call succeeded but carried no text.
    #[error("Keine Antwort vom Modell erhalten.")]
    EmptyResponse,

    /// The reply is not a JSON document of the declared shape.
    #[error("Model reply does not match the output schema: {0}")]
    Parse(String),

    /// The reply parsed but breaks the content contract (strict policy only).
    #[error("Model reply violates the content contract: {}", .0.join("; "))]
    ContractViolation(Vec<String>),
}
