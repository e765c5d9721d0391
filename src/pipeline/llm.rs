//! Model interaction: the [`ContentModel`] seam, its two backends, and the
//! generation client that turns one reply into [`GeneratedContent`].
//!
//! A request carries the system instruction, the ordered content parts, the
//! output schema and the response MIME type. How a backend enforces the
//! schema is its own business:
//!
//! * [`GeminiModel`] sends it as `responseSchema` and PDFs as inline data,
//!   so the endpoint itself constrains the reply.
//! * [`ProviderModel`] wraps any edgequake-llm provider and spells the
//!   schema out in the system message.
//!
//! Either way the reply is checked the same way in [`generate_content`]:
//! empty → [`GenerationError::EmptyResponse`], not the declared shape →
//! [`GenerationError::Parse`]. There is exactly one call and no retry.

use crate::config::{ContentPolicy, StudyConfig};
use crate::content::{output_schema, GeneratedContent};
use crate::error::{GenerationError, StudyError};
use crate::pipeline::encode::encode_inline;
use crate::pipeline::postprocess::{clean_reply, contract_findings, polish_content};
use crate::pipeline::request::{ContentPart, ContentRequest};
use crate::prompts::{self, SYSTEM_INSTRUCTION};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// MIME type every backend is asked to answer with.
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Everything a backend needs to issue the one model call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub parts: Vec<ContentPart>,
    pub output_schema: Value,
    pub response_mime_type: &'static str,
}

impl GenerationRequest {
    /// Wrap built content parts with the system instruction and schema.
    pub fn new(content: ContentRequest, config: &StudyConfig) -> Self {
        Self {
            system_instruction: config
                .system_instruction
                .clone()
                .unwrap_or_else(|| SYSTEM_INSTRUCTION.to_string()),
            parts: content.parts,
            output_schema: output_schema(),
            response_mime_type: RESPONSE_MIME_TYPE,
        }
    }
}

/// Raw reply of a backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Reply text; `None` when the endpoint answered without any.
    pub text: Option<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Per-call statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    pub model: String,
    pub parts: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    /// Contract deviations accepted under the permissive policy.
    pub findings: Vec<String>,
}

/// Parsed material plus statistics for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOutput {
    pub content: GeneratedContent,
    pub stats: GenerationStats,
}

/// A generative model that answers one schema-constrained request.
///
/// Implementations issue exactly one outbound call per `complete` and must
/// not retry.
#[async_trait]
pub trait ContentModel: Send + Sync {
    /// Human-readable identifier used in logs and stats.
    fn name(&self) -> &str;

    async fn complete(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError>;
}

/// Issue the request and parse the reply into learning material.
pub async fn generate_content(
    model: &dyn ContentModel,
    content: ContentRequest,
    config: &StudyConfig,
) -> Result<GenerationOutput, GenerationError> {
    let request = GenerationRequest::new(content, config);
    let parts = request.parts.len();
    let cb = config.progress_callback.as_ref();

    if let Some(cb) = cb {
        cb.on_generation_start(parts);
    }
    info!("Requesting learning material from {} ({} parts)", model.name(), parts);

    let start = Instant::now();
    let result = call_and_parse(model, &request, config.content_policy).await;
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok((content, reply, findings)) => {
            let stats = GenerationStats {
                model: model.name().to_string(),
                parts,
                input_tokens: reply.input_tokens,
                output_tokens: reply.output_tokens,
                duration_ms,
                findings,
            };
            debug!(
                "{} input tokens, {} output tokens, {}ms",
                stats.input_tokens, stats.output_tokens, stats.duration_ms
            );
            if let Some(cb) = cb {
                cb.on_generation_complete(&stats);
            }
            Ok(GenerationOutput { content, stats })
        }
        Err(e) => {
            if let Some(cb) = cb {
                cb.on_generation_failed(&e.to_string());
            }
            Err(e)
        }
    }
}

async fn call_and_parse(
    model: &dyn ContentModel,
    request: &GenerationRequest,
    policy: ContentPolicy,
) -> Result<(GeneratedContent, ModelReply, Vec<String>), GenerationError> {
    let reply = model.complete(request).await?;

    let raw = match reply.text.as_deref() {
        Some(text) if !text.trim().is_empty() => text,
        _ => return Err(GenerationError::EmptyResponse),
    };

    let mut content = parse_reply(raw)?;
    polish_content(&mut content);

    let findings = contract_findings(&content);
    if !findings.is_empty() {
        match policy {
            ContentPolicy::Strict => return Err(GenerationError::ContractViolation(findings)),
            ContentPolicy::Permissive => {
                for finding in &findings {
                    warn!("Accepting non-conforming reply: {}", finding);
                }
            }
        }
    }

    Ok((content, reply, findings))
}

/// Parse reply text as [`GeneratedContent`].
pub fn parse_reply(raw: &str) -> Result<GeneratedContent, GenerationError> {
    let cleaned = clean_reply(raw);
    serde_json::from_str(&cleaned).map_err(|e| GenerationError::Parse(e.to_string()))
}

// ── Native Gemini backend ────────────────────────────────────────────────

/// Gemini `generateContent` over REST with endpoint-side schema enforcement.
pub struct GeminiModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, config: &StudyConfig) -> Result<Self, StudyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| StudyError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base_url.clone(),
            model: config.model_or_default().to_string(),
            api_key: api_key.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }

    /// Build from config, taking the key from the config or the environment.
    pub fn from_config(config: &StudyConfig) -> Result<Self, StudyError> {
        let key = gemini_api_key(config).ok_or_else(|| StudyError::ProviderNotConfigured {
            provider: "gemini".to_string(),
            hint: "Set GEMINI_API_KEY (or GOOGLE_API_KEY), or pass --api-key.".to_string(),
        })?;
        Self::new(key, config)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// JSON body of a `generateContent` call.
    pub fn request_body(&self, request: &GenerationRequest) -> Value {
        let parts: Vec<Value> = request
            .parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": text }),
                ContentPart::InlineData { mime_type, data } => json!({
                    "inlineData": { "mimeType": mime_type, "data": encode_inline(data) }
                }),
            })
            .collect();

        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": {
                "responseMimeType": request.response_mime_type,
                "responseSchema": request.output_schema,
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            }
        })
    }
}

/// API key for the native backend: config first, then the environment.
pub fn gemini_api_key(config: &StudyConfig) -> Option<String> {
    config
        .api_key
        .clone()
        .or_else(|| std::env::var("GEMINI_API_KEY").ok())
        .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

/// Turn a `generateContent` response body into a [`ModelReply`].
fn parse_gemini_body(body: &str) -> Result<ModelReply, GenerationError> {
    let response: GeminiResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::Parse(format!("unexpected response envelope: {e}")))?;

    let usage = response.usage_metadata.unwrap_or_default();
    let candidate = response.candidates.into_iter().next();

    if let Some(reason) = candidate.as_ref().and_then(|c| c.finish_reason.as_deref()) {
        if reason != "STOP" {
            warn!("Gemini finished with reason {}", reason);
        }
    }

    let text: String = candidate
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    Ok(ModelReply {
        text: if text.is_empty() { None } else { Some(text) },
        input_tokens: usage.prompt_token_count,
        output_tokens: usage.candidates_token_count,
    })
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn gemini_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl ContentModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
        let body = self.request_body(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout {
                        secs: self.timeout_secs,
                    }
                } else {
                    GenerationError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GenerationError::Auth {
                provider: "gemini".to_string(),
                detail: gemini_error_message(&text),
            });
        }
        if !status.is_success() {
            return Err(GenerationError::Transport(format!(
                "HTTP {}: {}",
                status,
                gemini_error_message(&text)
            )));
        }

        parse_gemini_body(&text)
    }
}

// ── edgequake-llm provider backend ───────────────────────────────────────

/// Any edgequake-llm provider. The schema travels in the system message.
///
/// Chat messages cannot interleave text and attachments, so the request's
/// part order is not preserved: all text parts are joined into one user turn
/// and every PDF rides along as an attachment of that turn.
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
    label: String,
    temperature: f32,
    max_tokens: usize,
    timeout_secs: u64,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &StudyConfig) -> Self {
        Self {
            provider,
            label: label.into(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// System + user messages for a request.
    ///
    /// Text parts are joined into the user turn; binary parts ride along as
    /// base64 attachments with their own MIME type.
    pub fn messages(request: &GenerationRequest) -> Vec<ChatMessage> {
        let system = prompts::with_schema(&request.system_instruction, &request.output_schema);

        let mut texts = Vec::new();
        let mut attachments = Vec::new();
        for part in &request.parts {
            match part {
                ContentPart::Text(text) => texts.push(text.as_str()),
                ContentPart::InlineData { mime_type, data } => {
                    attachments.push(ImageData::new(encode_inline(data), mime_type.as_str()));
                }
            }
        }

        vec![
            ChatMessage::system(system),
            ChatMessage::user_with_images(texts.join("\n\n"), attachments),
        ]
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContentModel for ProviderModel {
    fn name(&self) -> &str {
        &self.label
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
        let messages = Self::messages(request);
        let options = self.options();

        let call = self.provider.chat(&messages, Some(&options));
        let response = tokio::time::timeout(Duration::from_secs(self.timeout_secs), call)
            .await
            .map_err(|_| GenerationError::Timeout {
                secs: self.timeout_secs,
            })?
            .map_err(|e| {
                let detail = e.to_string();
                let lower = detail.to_lowercase();
                if lower.contains("401") || lower.contains("403") || lower.contains("auth") {
                    GenerationError::Auth {
                        provider: self.label.clone(),
                        detail,
                    }
                } else {
                    GenerationError::Transport(detail)
                }
            })?;

        Ok(ModelReply {
            text: Some(response.content).filter(|t| !t.is_empty()),
            input_tokens: response.prompt_tokens as usize,
            output_tokens: response.completion_tokens as usize,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::input::FileInput;
    use crate::pipeline::request::{build_request, Submission};
    use std::sync::Mutex;

    /// Replays a canned reply and records the request it saw.
    struct Canned {
        reply: Result<ModelReply, GenerationError>,
        seen: Mutex<Option<GenerationRequest>>,
    }

    impl Canned {
        fn text(text: &str) -> Self {
            Self {
                reply: Ok(ModelReply {
                    text: Some(text.to_string()),
                    input_tokens: 10,
                    output_tokens: 20,
                }),
                seen: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ContentModel for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, request: &GenerationRequest) -> Result<ModelReply, GenerationError> {
            *self.seen.lock().unwrap() = Some(request.clone());
            self.reply.clone()
        }
    }

    fn valid_reply() -> String {
        let cards: Vec<Value> = (0..10)
            .map(|i| json!({ "term": format!("T{i}"), "definition": "D" }))
            .collect();
        let question = json!({
            "text": "Q", "options": ["a", "b"], "correctAnswerIndex": 1,
            "explanation": "E", "hint": "H"
        });
        json!({
            "summary": { "title": "S", "chapters": [{ "title": "K", "topics": [{
                "title": "T", "content": "- x", "studyQuestions": ["1", "2"]
            }]}]},
            "flashcards": cards,
            "quiz": { "chapters": [{ "title": "K", "questions": [question.clone(), question.clone(), question.clone(), question] }] }
        })
        .to_string()
    }

    fn request() -> ContentRequest {
        build_request(&Submission::default().with_text("Zellbiologie")).unwrap()
    }

    #[tokio::test]
    async fn parses_valid_reply_and_records_stats() {
        let model = Canned::text(&format!("```json\n{}\n```", valid_reply()));
        let out = generate_content(&model, request(), &StudyConfig::default())
            .await
            .unwrap();
        assert_eq!(out.content.flashcards.len(), 10);
        assert_eq!(out.content.summary.chapters[0].topics[0].content, "• x");
        assert_eq!(out.stats.input_tokens, 10);
        assert_eq!(out.stats.output_tokens, 20);
        assert_eq!(out.stats.parts, 2);
        assert!(out.stats.findings.is_empty());

        let seen = model.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.system_instruction, SYSTEM_INSTRUCTION);
        assert_eq!(seen.response_mime_type, "application/json");
        assert_eq!(seen.output_schema, output_schema());
    }

    #[tokio::test]
    async fn empty_reply_is_reported() {
        let model = Canned::text("   ");
        let err = generate_content(&model, request(), &StudyConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err, GenerationError::EmptyResponse);
    }

    #[tokio::test]
    async fn malformed_reply_is_a_parse_failure() {
        let model = Canned::text("{\"summary\": 42}");
        let err = generate_content(&model, request(), &StudyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Parse(_)));
    }

    #[test]
    fn reply_missing_required_keys_is_a_parse_failure() {
        let empty = parse_reply(r#"{"summary":{},"flashcards":[],"quiz":{}}"#);
        assert!(matches!(empty, Err(GenerationError::Parse(_))));

        let mut value: Value = serde_json::from_str(&valid_reply()).unwrap();
        let topic = &mut value["summary"]["chapters"][0]["topics"][0];
        topic.as_object_mut().unwrap().remove("studyQuestions");
        assert!(matches!(
            parse_reply(&value.to_string()),
            Err(GenerationError::Parse(_))
        ));

        let mut value: Value = serde_json::from_str(&valid_reply()).unwrap();
        let question = &mut value["quiz"]["chapters"][0]["questions"][2];
        question.as_object_mut().unwrap().remove("hint");
        assert!(matches!(
            parse_reply(&value.to_string()),
            Err(GenerationError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn transport_failure_passes_through() {
        let model = Canned {
            reply: Err(GenerationError::Transport("connection reset".into())),
            seen: Mutex::new(None),
        };
        let err = generate_content(&model, request(), &StudyConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::Transport(_)));
    }

    #[tokio::test]
    async fn policy_decides_on_contract_deviations() {
        let mut value: Value = serde_json::from_str(&valid_reply()).unwrap();
        value["flashcards"].as_array_mut().unwrap().truncate(3);
        let reply = value.to_string();

        let permissive = generate_content(&Canned::text(&reply), request(), &StudyConfig::default())
            .await
            .unwrap();
        assert_eq!(permissive.stats.findings.len(), 1);

        let strict = StudyConfig::builder()
            .content_policy(ContentPolicy::Strict)
            .build()
            .unwrap();
        let err = generate_content(&Canned::text(&reply), request(), &strict)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::ContractViolation(_)));
    }

    #[test]
    fn gemini_body_carries_schema_and_inline_pdf() {
        let model = GeminiModel::new("key", &StudyConfig::default()).unwrap();
        let submission = Submission::new(vec![FileInput::pdf("a.pdf", b"%PDF".to_vec())]);
        let req = GenerationRequest::new(build_request(&submission).unwrap(), &StudyConfig::default());
        let body = model.request_body(&req);

        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"], output_schema());
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[0]["inlineData"]["data"], "JVBERg==");
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Deutsch"));
        assert!(model.endpoint().ends_with("/v1beta/models/gemini-2.5-flash:generateContent"));
    }

    #[test]
    fn gemini_body_parsing() {
        let body = r#"{
            "candidates": [{ "content": { "parts": [{ "text": "{\"a\"" }, { "text": ": 1}" }], "role": "model" }, "finishReason": "STOP" }],
            "usageMetadata": { "promptTokenCount": 12, "candidatesTokenCount": 34, "totalTokenCount": 46 }
        }"#;
        let reply = parse_gemini_body(body).unwrap();
        assert_eq!(reply.text.as_deref(), Some("{\"a\": 1}"));
        assert_eq!(reply.input_tokens, 12);
        assert_eq!(reply.output_tokens, 34);
    }

    #[test]
    fn gemini_body_without_candidates_has_no_text() {
        let reply = parse_gemini_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert_eq!(reply.text, None);
    }

    #[test]
    fn gemini_error_message_extraction() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(gemini_error_message(body), "API key not valid");
        assert_eq!(gemini_error_message("oops"), "oops");
    }

    #[test]
    fn provider_messages_embed_schema() {
        let submission = Submission::new(vec![FileInput::pdf("a.pdf", b"%PDF".to_vec())]).with_text("Notiz");
        let req = GenerationRequest::new(build_request(&submission).unwrap(), &StudyConfig::default());
        let messages = ProviderModel::messages(&req);
        assert_eq!(messages.len(), 2);
    }
}
