//! Summary export.
//!
//! 1. [`layout`]   — A4 page layout (pure, in millimetres)
//! 2. [`pdf`]      — draws the layout with pdfium and writes the file
//! 3. [`markdown`] — plain Markdown rendering for terminals and files

pub mod layout;
pub mod markdown;
pub mod pdf;

pub use markdown::{render_flashcards, render_quiz, render_study_sheet, render_summary};
pub use pdf::{export_pdf, render_pdf, DEFAULT_EXPORT_FILE_NAME};
