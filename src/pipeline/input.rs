//! Input normalisation: turn uploaded files (local paths or URLs) into
//! [`FileInput`]s the request builder can consume.
//!
//! PDFs are passed on untouched as binary payloads; the model reads them
//! natively. Word documents are reduced to their paragraph text here, since
//! no endpoint accepts `.docx`. Everything else is read as text.
//!
//! A file that cannot be normalised yields an [`ExtractionError`] and is
//! left out; it never aborts the other files. A broken Word file is always
//! reported, never replaced by empty text.

use crate::config::StudyConfig;
use crate::error::{ExtractionError, StudyError};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const PDF_MIME: &str = "application/pdf";
pub const TEXT_MIME: &str = "text/plain";

/// The two payload kinds a normalised file can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputKind {
    Pdf,
    Text,
}

impl InputKind {
    pub fn mime_type(self) -> &'static str {
        match self {
            InputKind::Pdf => PDF_MIME,
            InputKind::Text => TEXT_MIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Payload {
    Binary(Vec<u8>),
    Text(String),
}

/// A normalised upload. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInput {
    name: String,
    payload: Payload,
}

impl FileInput {
    /// A PDF passed to the model as inline binary data.
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Binary(bytes),
        }
    }

    /// A document already reduced to text.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            payload: Payload::Text(text.into()),
        }
    }

    /// Normalise raw uploaded bytes, choosing the kind from the file name
    /// and the PDF magic bytes.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ExtractionError> {
        let name = name.into();
        let ext = extension(&name);

        if ext.as_deref() == Some("pdf") || bytes.starts_with(b"%PDF") {
            if !bytes.starts_with(b"%PDF") {
                return Err(ExtractionError::Unreadable {
                    detail: "file is not a valid PDF".to_string(),
                    name,
                });
            }
            return Ok(Self::pdf(name, bytes));
        }

        let text = if ext.as_deref() == Some("docx") {
            extract_docx_text(&bytes).map_err(|detail| ExtractionError::WordExtraction {
                name: name.clone(),
                detail,
            })?
        } else {
            if bytes.contains(&0) {
                return Err(ExtractionError::Unreadable {
                    name,
                    detail: "binary file; upload PDF, Word or text".to_string(),
                });
            }
            String::from_utf8_lossy(&bytes).into_owned()
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument { name });
        }
        Ok(Self::text(name, text))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> InputKind {
        match self.payload {
            Payload::Binary(_) => InputKind::Pdf,
            Payload::Text(_) => InputKind::Text,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.kind().mime_type()
    }

    /// Binary payload of a PDF-kind input.
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Binary(b) => Some(b),
            Payload::Text(_) => None,
        }
    }

    /// Text payload of a text-kind input.
    pub fn text_content(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(t) => Some(t),
            Payload::Binary(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::Binary(b) => b.len(),
            Payload::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of normalising a batch of inputs.
#[derive(Debug, Default)]
pub struct NormalizedInputs {
    /// Successfully normalised files, in input order.
    pub files: Vec<FileInput>,
    /// Files that were left out, in input order.
    pub rejected: Vec<ExtractionError>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Normalise every input (path or URL), reading up to
/// `config.read_concurrency` files at once. Order is preserved.
pub async fn normalize_inputs<S: AsRef<str>>(inputs: &[S], config: &StudyConfig) -> NormalizedInputs {
    let cb = config.progress_callback.clone();
    if let Some(ref cb) = cb {
        cb.on_normalize_start(inputs.len());
    }

    let results: Vec<Result<FileInput, ExtractionError>> = stream::iter(inputs.iter().map(|input| {
        let input = input.as_ref().to_string();
        let timeout = config.download_timeout_secs;
        async move { normalize_one(&input, timeout).await }
    }))
    .buffered(config.read_concurrency.max(1))
    .collect()
    .await;

    let mut normalized = NormalizedInputs::default();
    for result in results {
        match result {
            Ok(file) => {
                debug!("Normalised {} ({:?}, {} bytes)", file.name(), file.kind(), file.len());
                if let Some(ref cb) = cb {
                    cb.on_file_ready(file.name(), file.kind());
                }
                normalized.files.push(file);
            }
            Err(e) => {
                warn!("Skipping input: {}", e);
                if let Some(ref cb) = cb {
                    cb.on_file_rejected(e.name(), &e.to_string());
                }
                normalized.rejected.push(e);
            }
        }
    }

    info!(
        "Normalised {} inputs ({} rejected)",
        normalized.files.len(),
        normalized.rejected.len()
    );
    normalized
}

/// Normalise a single local path or URL.
pub async fn normalize_one(input: &str, timeout_secs: u64) -> Result<FileInput, ExtractionError> {
    if is_url(input) {
        let (name, bytes) = download_url(input, timeout_secs)
            .await
            .map_err(|e| ExtractionError::Download {
                name: input.to_string(),
                detail: e.to_string(),
            })?;
        FileInput::from_bytes(name, bytes)
    } else {
        let path = PathBuf::from(input);
        let bytes = read_local(&path).await.map_err(|e| ExtractionError::Unreadable {
            name: input.to_string(),
            detail: e.to_string(),
        })?;
        FileInput::from_bytes(file_name(&path), bytes)
    }
}

/// Read a local file, mapping the common failures to readable errors.
async fn read_local(path: &Path) -> Result<Vec<u8>, StudyError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StudyError::InputNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => StudyError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => StudyError::Internal(format!("reading {}: {}", path.display(), e)),
    })
}

/// Download a URL into memory, returning a file name and the body.
async fn download_url(url: &str, timeout_secs: u64) -> Result<(String, Vec<u8>), StudyError> {
    info!("Downloading document from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StudyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            StudyError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            StudyError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(StudyError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StudyError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok((filename_from_url(url), bytes.to_vec()))
}

/// Extract a reasonable file name from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download.txt".to_string()
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// Pull the paragraph text out of a `.docx` archive, one paragraph per line.
fn extract_docx_text(bytes: &[u8]) -> Result<String, String> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let docx = docx_rs::read_docx(bytes).map_err(|e| format!("{e:?}"))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            let mut line = String::new();
            for pc in &para.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        if let RunChild::Text(t) = rc {
                            line.push_str(&t.text);
                        }
                    }
                }
            }
            if !line.trim().is_empty() {
                paragraphs.push(line);
            }
        }
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/skript.pdf"));
        assert!(is_url("http://example.com/skript.pdf"));
        assert!(!is_url("/tmp/skript.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn pdf_by_extension_and_magic() {
        let f = FileInput::from_bytes("skript.PDF", b"%PDF-1.7 ...".to_vec()).unwrap();
        assert_eq!(f.kind(), InputKind::Pdf);
        assert_eq!(f.mime_type(), "application/pdf");
        assert!(f.bytes().is_some());
        assert!(f.text_content().is_none());

        let f = FileInput::from_bytes("upload", b"%PDF-1.4".to_vec()).unwrap();
        assert_eq!(f.kind(), InputKind::Pdf);
    }

    #[test]
    fn pdf_extension_without_magic_is_rejected() {
        let err = FileInput::from_bytes("fake.pdf", b"hello".to_vec()).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }

    #[test]
    fn text_files_become_text_kind() {
        let f = FileInput::from_bytes("notes.md", "# Titel\nInhalt".as_bytes().to_vec()).unwrap();
        assert_eq!(f.kind(), InputKind::Text);
        assert_eq!(f.mime_type(), "text/plain");
        assert_eq!(f.text_content(), Some("# Titel\nInhalt"));
    }

    #[test]
    fn blank_text_is_rejected() {
        let err = FileInput::from_bytes("empty.txt", b"  \n ".to_vec()).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::EmptyDocument {
                name: "empty.txt".into()
            }
        );
    }

    #[test]
    fn binary_garbage_is_rejected() {
        let err = FileInput::from_bytes("data.bin", vec![1, 0, 2, 3]).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }

    #[test]
    fn broken_docx_fails_loudly() {
        let err = FileInput::from_bytes("kaputt.docx", b"not a zip archive".to_vec()).unwrap_err();
        match err {
            ExtractionError::WordExtraction { name, .. } => assert_eq!(name, "kaputt.docx"),
            other => panic!("expected WordExtraction, got {other:?}"),
        }
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(filename_from_url("https://x.org/a/skript.pdf"), "skript.pdf");
        assert_eq!(filename_from_url("https://x.org/"), "download.txt");
    }

    #[tokio::test]
    async fn missing_local_file_is_rejected_not_fatal() {
        let config = StudyConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.txt");
        std::fs::write(&good, "Photosynthese").unwrap();
        let inputs = vec![
            "/definitely/not/here.txt".to_string(),
            good.to_string_lossy().to_string(),
        ];

        let normalized = normalize_inputs(&inputs, &config).await;
        assert_eq!(normalized.files.len(), 1);
        assert_eq!(normalized.files[0].name(), "ok.txt");
        assert_eq!(normalized.rejected.len(), 1);
        assert_eq!(normalized.rejected[0].name(), "/definitely/not/here.txt");
    }
}
