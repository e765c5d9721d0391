//! One-shot generation entry points.
//!
//! These run a submission straight through the model without a session
//! controller: normalise inputs, build the request, make the one call and
//! return the material. Failures surface as [`StudyError`] instead of an
//! Error state. Use [`crate::session::SessionController`] for the
//! interactive lifecycle.

use crate::config::{Backend, StudyConfig};
use crate::content::GeneratedContent;
use crate::error::{ExtractionError, StudyError};
use crate::pipeline::input::normalize_inputs;
use crate::pipeline::llm::{
    gemini_api_key, generate_content, ContentModel, GeminiModel, GenerationOutput,
    GenerationStats, ProviderModel,
};
use crate::pipeline::request::{build_request, Submission};
use edgequake_llm::{LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Provider model used when a provider is named without a model.
const DEFAULT_PROVIDER_MODEL: &str = "gpt-4.1-nano";

/// Material generated from a batch of inputs, plus the inputs left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyOutput {
    pub content: GeneratedContent,
    pub stats: GenerationStats,
    /// Inputs that could not be normalised; the rest were submitted.
    pub rejected: Vec<ExtractionError>,
}

/// Generate learning material for an already-built submission.
///
/// # Errors
/// - [`StudyError::Validation`] when the submission has no material
/// - [`StudyError::ProviderNotConfigured`] when no backend can be resolved
/// - [`StudyError::Generation`] when the model call fails
pub async fn generate(
    submission: &Submission,
    config: &StudyConfig,
) -> Result<GenerationOutput, StudyError> {
    let request = build_request(submission)?;
    let model = resolve_model(config)?;
    Ok(generate_content(model.as_ref(), request, config).await?)
}

/// Normalise `inputs` (paths or URLs), add them to `submission` and generate.
///
/// Inputs that fail to normalise are reported in
/// [`StudyOutput::rejected`]; they do not stop the run as long as something
/// is left to submit.
pub async fn generate_from_inputs<S: AsRef<str>>(
    inputs: &[S],
    mut submission: Submission,
    config: &StudyConfig,
) -> Result<StudyOutput, StudyError> {
    info!("Generating learning material from {} inputs", inputs.len());

    let normalized = normalize_inputs(inputs, config).await;
    submission.files.extend(normalized.files);
    debug!("Submitting {} files", submission.files.len());

    let output = generate(&submission, config).await?;
    Ok(StudyOutput {
        content: output.content,
        stats: output.stats,
        rejected: normalized.rejected,
    })
}

/// Generate and write the material as pretty JSON.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn generate_to_file<S: AsRef<str>>(
    inputs: &[S],
    submission: Submission,
    output_path: impl AsRef<Path>,
    config: &StudyConfig,
) -> Result<StudyOutput, StudyError> {
    let output = generate_from_inputs(inputs, submission, config).await?;
    let json = serde_json::to_vec_pretty(&output.content)
        .map_err(|e| StudyError::Internal(format!("serialising content: {e}")))?;
    write_atomic(output_path.as_ref(), &json).await?;
    Ok(output)
}

/// Synchronous wrapper around [`generate_from_inputs`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync<S: AsRef<str>>(
    inputs: &[S],
    submission: Submission,
    config: &StudyConfig,
) -> Result<StudyOutput, StudyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| StudyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_from_inputs(inputs, submission, config))
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StudyError> {
    let write_err = |e| StudyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = std::path::PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}

// ── Model resolution ─────────────────────────────────────────────────────

/// Resolve the content model, from most-specific to least-specific.
///
/// 1. **Pre-built model** (`config.content_model`), used as-is.
/// 2. **Backend::Gemini**: native REST backend; needs a Gemini key.
/// 3. **Backend::Provider**: edgequake-llm provider via [`resolve_provider`].
/// 4. **Backend::Auto**: native Gemini when a key is present in the config or
///    in `GEMINI_API_KEY` / `GOOGLE_API_KEY`, unless a provider was set
///    explicitly; otherwise the provider chain.
pub fn resolve_model(config: &StudyConfig) -> Result<Arc<dyn ContentModel>, StudyError> {
    if let Some(ref model) = config.content_model {
        return Ok(Arc::clone(model));
    }

    match config.backend {
        Backend::Gemini => Ok(Arc::new(GeminiModel::from_config(config)?)),
        Backend::Provider => provider_model(config),
        Backend::Auto => {
            let explicit_provider = config.provider.is_some() || config.provider_name.is_some();
            if !explicit_provider && gemini_api_key(config).is_some() {
                debug!("Using native Gemini backend");
                Ok(Arc::new(GeminiModel::from_config(config)?))
            } else {
                provider_model(config)
            }
        }
    }
}

fn provider_model(config: &StudyConfig) -> Result<Arc<dyn ContentModel>, StudyError> {
    let (provider, label) = resolve_provider(config)?;
    debug!("Using provider backend {}", label);
    Ok(Arc::new(ProviderModel::new(provider, label, config)))
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, StudyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        StudyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve an edgequake-llm provider and a label for logs.
///
/// 1. Pre-built provider (`config.provider`)
/// 2. Named provider + model (`config.provider_name`)
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. Full auto-detection (`ProviderFactory::from_env`)
fn resolve_provider(config: &StudyConfig) -> Result<(Arc<dyn LLMProvider>, String), StudyError> {
    if let Some(ref provider) = config.provider {
        let label = config.provider_name.clone().unwrap_or_else(|| "custom".to_string());
        return Ok((Arc::clone(provider), label));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
        return Ok((create_provider(name, model)?, format!("{name}/{model}")));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return Ok((create_provider(&prov, &model)?, format!("{prov}/{model}")));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or(DEFAULT_PROVIDER_MODEL);
            return Ok((create_provider("openai", model)?, format!("openai/{model}")));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| StudyError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No model backend could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerationError;
    use crate::pipeline::llm::{GenerationRequest, ModelReply};
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl ContentModel for Unreachable {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn complete(&self, _: &GenerationRequest) -> Result<ModelReply, GenerationError> {
            Err(GenerationError::Transport("connection refused".into()))
        }
    }

    fn config() -> StudyConfig {
        StudyConfig::builder()
            .content_model(Arc::new(Unreachable))
            .build()
            .unwrap()
    }

    #[test]
    fn prebuilt_model_wins() {
        let model = resolve_model(&config()).unwrap();
        assert_eq!(model.name(), "unreachable");
    }

    #[test]
    fn explicit_gemini_with_key_in_config() {
        let config = StudyConfig::builder()
            .backend(Backend::Gemini)
            .api_key("test-key")
            .model("gemini-2.5-pro")
            .build()
            .unwrap();
        let model = resolve_model(&config).unwrap();
        assert_eq!(model.name(), "gemini-2.5-pro");
    }

    #[tokio::test]
    async fn empty_submission_never_reaches_the_model() {
        let err = generate(&Submission::default(), &config()).await.unwrap_err();
        assert!(matches!(err, StudyError::Validation));
    }

    #[tokio::test]
    async fn transport_failure_is_surfaced() {
        let submission = Submission::default().with_text("Photosynthese");
        let err = generate(&submission, &config()).await.unwrap_err();
        assert!(matches!(
            err,
            StudyError::Generation(GenerationError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn all_inputs_rejected_leaves_nothing_to_submit() {
        let inputs = ["/definitely/missing/script.pdf"];
        let err = generate_from_inputs(&inputs, Submission::default(), &config())
            .await
            .unwrap_err();
        assert!(matches!(err, StudyError::Validation));
    }

    #[tokio::test]
    async fn write_atomic_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/content.json");
        write_atomic(&path, b"{}").await.unwrap();
        write_atomic(&path, b"{\"a\":1}").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{\"a\":1}");
        assert!(!dir.path().join("out/content.json.tmp").exists());
    }
}
