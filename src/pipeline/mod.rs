//! Pipeline stages from user material to parsed learning content.
//!
//! Each submodule implements exactly one transformation step and is
//! testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ request ──▶ encode ──▶ llm ──▶ postprocess
//! (paths/URLs) (parts)   (base64)  (1 call)  (cleanup)
//! ```
//!
//! 1. [`input`]   — normalise paths and URLs into PDF or text [`input::FileInput`]s;
//!    Word documents are text-extracted, failures are collected per file
//! 2. [`request`] — assemble free text, files and the instruction block into
//!    ordered content parts
//! 3. [`encode`]  — base64-wrap binary parts for the JSON request body
//! 4. [`llm`]     — the one model call, through the native Gemini backend or
//!    any edgequake-llm provider; the only stage with model network I/O
//! 5. [`postprocess`] — deterministic cleanup of the reply (fences, invisible
//!    characters, bullets) and contract checks

pub mod encode;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod request;
