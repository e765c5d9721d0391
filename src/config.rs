//! Configuration types for generating learning material.
//!
//! Everything that influences a generation run lives in [`StudyConfig`],
//! built via its [`StudyConfigBuilder`]. One struct keeps runs comparable:
//! log it, diff two of them, hand it to another thread.

use crate::error::StudyError;
use crate::pipeline::llm::ContentModel;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Public Gemini REST endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for a generation run.
///
/// # Example
/// ```rust
/// use smartlearn::{ContentPolicy, StudyConfig};
///
/// let config = StudyConfig::builder()
///     .model("gemini-2.5-pro")
///     .content_policy(ContentPolicy::Strict)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct StudyConfig {
    /// Which backend carries the request. Default: [`Backend::Auto`].
    pub backend: Backend,

    /// Model identifier, e.g. "gemini-2.5-flash". If None, [`DEFAULT_MODEL`]
    /// for the native backend and the provider default otherwise.
    pub model: Option<String>,

    /// edgequake-llm provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed edgequake-llm provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed content model. Takes precedence over everything else.
    pub content_model: Option<Arc<dyn ContentModel>>,

    /// API key for the native Gemini backend. If None, read from
    /// `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of the Gemini REST API. Default: [`DEFAULT_GEMINI_BASE_URL`].
    pub api_base_url: String,

    /// Sampling temperature. Default: 0.4.
    ///
    /// Study material benefits from a little variety in question wording,
    /// but the JSON shape must stay stable; above ~1.0 replies drift.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 16384.
    ///
    /// A long script yields a large JSON document; a truncated reply is a
    /// parse failure, so this errs on the generous side.
    pub max_tokens: usize,

    /// Timeout for the single model call in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// How many input files are read at once during normalisation. Default: 4.
    pub read_concurrency: usize,

    /// Custom system instruction. If None, uses the built-in German tutor prompt.
    pub system_instruction: Option<String>,

    /// How to treat replies that break the counts the prompt asks for.
    /// Default: [`ContentPolicy::Permissive`].
    pub content_policy: ContentPolicy,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            model: None,
            provider_name: None,
            provider: None,
            content_model: None,
            api_key: None,
            api_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.4,
            max_tokens: 16384,
            api_timeout_secs: 180,
            download_timeout_secs: 120,
            read_concurrency: 4,
            system_instruction: None,
            content_policy: ContentPolicy::default(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for StudyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StudyConfig")
            .field("backend", &self.backend)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field(
                "content_model",
                &self.content_model.as_ref().map(|_| "<dyn ContentModel>"),
            )
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("content_policy", &self.content_policy)
            .finish()
    }
}

impl StudyConfig {
    /// Create a new builder for `StudyConfig`.
    pub fn builder() -> StudyConfigBuilder {
        StudyConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model name the native backend will call.
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`StudyConfig`].
pub struct StudyConfigBuilder {
    config: StudyConfig,
}

impl fmt::Debug for StudyConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.config.fmt(f)
    }
}

impl StudyConfigBuilder {
    pub fn backend(mut self, backend: Backend) -> Self {
        self.config.backend = backend;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn content_model(mut self, model: Arc<dyn ContentModel>) -> Self {
        self.config.content_model = Some(model);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn read_concurrency(mut self, n: usize) -> Self {
        self.config.read_concurrency = n.max(1);
        self
    }

    pub fn system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.system_instruction = Some(instruction.into());
        self
    }

    pub fn content_policy(mut self, policy: ContentPolicy) -> Self {
        self.config.content_policy = policy;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<StudyConfig, StudyError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(StudyError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(StudyError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(StudyError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which implementation of [`ContentModel`] carries the request.
///
/// | Backend | Schema enforcement | PDF input |
/// |---------|--------------------|-----------|
/// | `Gemini`   | endpoint-side `responseSchema` | inline binary |
/// | `Provider` | schema embedded in the instruction | attached as binary data |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Backend {
    /// Native Gemini when a Gemini key is available, provider otherwise. (default)
    #[default]
    Auto,
    /// Native Gemini REST backend.
    Gemini,
    /// Any edgequake-llm provider.
    Provider,
}

/// How strictly the counts promised by the prompt are enforced.
///
/// The prompt asks for 10–20 flashcards, exactly four questions per quiz
/// chapter and 2–3 study questions per topic; the model does not always
/// comply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentPolicy {
    /// Accept the reply and log each deviation as a warning. (default)
    #[default]
    Permissive,
    /// Reject the reply as a generation failure.
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = StudyConfig::default();
        assert_eq!(c.backend, Backend::Auto);
        assert_eq!(c.content_policy, ContentPolicy::Permissive);
        assert_eq!(c.model_or_default(), DEFAULT_MODEL);
        assert_eq!(c.read_concurrency, 4);
    }

    #[test]
    fn builder_clamps_temperature_and_concurrency() {
        let c = StudyConfig::builder()
            .temperature(7.0)
            .read_concurrency(0)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.read_concurrency, 1);
    }

    #[test]
    fn builder_trims_base_url() {
        let c = StudyConfig::builder()
            .api_base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(c.api_base_url, "http://localhost:8080");
    }

    #[test]
    fn builder_rejects_bad_values() {
        assert!(StudyConfig::builder().max_tokens(0).build().is_err());
        assert!(StudyConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(StudyConfig::builder().api_base_url("ftp://x").build().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = StudyConfig::builder().api_key("secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
