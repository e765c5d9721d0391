//! Content request builder: files + free text + hints → ordered request parts.
//!
//! Part order is fixed: the free-text chunk (if any), one part per file in
//! upload order, then the instruction block. The builder is a pure
//! function; a request is rebuilt for every submission.

use crate::error::StudyError;
use crate::pipeline::input::FileInput;
use crate::prompts;

/// What the user submitted in one go.
#[derive(Debug, Clone, Default)]
pub struct Submission {
    pub files: Vec<FileInput>,
    pub text: String,
    pub focus: Option<String>,
    pub exclude: Option<String>,
}

impl Submission {
    pub fn new(files: Vec<FileInput>) -> Self {
        Self {
            files,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }

    pub fn with_exclude(mut self, exclude: impl Into<String>) -> Self {
        self.exclude = Some(exclude.into());
        self
    }

    /// A submission needs at least one file or some non-blank text.
    pub fn validate(&self) -> Result<(), StudyError> {
        if self.files.is_empty() && self.text.trim().is_empty() {
            return Err(StudyError::Validation);
        }
        Ok(())
    }

    fn focus_hint(&self) -> Option<&str> {
        non_blank(self.focus.as_deref())
    }

    fn exclude_hint(&self) -> Option<&str> {
        non_blank(self.exclude.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// One part of the request body.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    InlineData { mime_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(t) => Some(t),
            ContentPart::InlineData { .. } => None,
        }
    }
}

/// Ordered request parts; the last one is always the instruction block.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRequest {
    pub parts: Vec<ContentPart>,
}

impl ContentRequest {
    /// The trailing instruction block.
    pub fn instructions(&self) -> &str {
        self.parts.last().and_then(ContentPart::as_text).unwrap_or("")
    }

    /// Parts carrying user material (everything but the instruction block).
    pub fn material(&self) -> &[ContentPart] {
        &self.parts[..self.parts.len().saturating_sub(1)]
    }
}

/// Build the request for a submission.
///
/// # Errors
/// [`StudyError::Validation`] when the submission has neither files nor text.
pub fn build_request(submission: &Submission) -> Result<ContentRequest, StudyError> {
    submission.validate()?;

    let mut parts = Vec::with_capacity(submission.files.len() + 2);

    if !submission.text.trim().is_empty() {
        parts.push(ContentPart::Text(prompts::free_text_part(&submission.text)));
    }

    for file in &submission.files {
        let part = match (file.bytes(), file.text_content()) {
            (Some(bytes), _) => ContentPart::InlineData {
                mime_type: file.mime_type().to_string(),
                data: bytes.to_vec(),
            },
            (None, Some(text)) => ContentPart::Text(prompts::document_part(file.name(), text)),
            (None, None) => continue,
        };
        parts.push(part);
    }

    parts.push(ContentPart::Text(instruction_block(
        submission.focus_hint(),
        submission.exclude_hint(),
    )));

    Ok(ContentRequest { parts })
}

/// Analysis directive, optional focus/exclusion directives, output contract.
pub fn instruction_block(focus: Option<&str>, exclude: Option<&str>) -> String {
    let mut block = String::from(prompts::ANALYSIS_DIRECTIVE);
    if let Some(focus) = focus {
        block.push('\n');
        block.push_str(&prompts::focus_directive(focus));
    }
    if let Some(exclude) = exclude {
        block.push('\n');
        block.push_str(&prompts::exclude_directive(exclude));
    }
    block.push_str("\n\n");
    block.push_str(prompts::OUTPUT_CONTRACT);
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{EXCLUDE_MARKER, FOCUS_MARKER};

    fn pdf(name: &str) -> FileInput {
        FileInput::pdf(name, b"%PDF-1.7".to_vec())
    }

    #[test]
    fn empty_submission_is_a_validation_error() {
        let err = build_request(&Submission::default()).unwrap_err();
        assert!(matches!(err, StudyError::Validation));

        let blank = Submission::default().with_text("   \n");
        assert!(matches!(build_request(&blank), Err(StudyError::Validation)));
    }

    #[test]
    fn two_files_with_focus_only() {
        let submission = Submission::new(vec![pdf("a.pdf"), FileInput::text("b.txt", "Inhalt")])
            .with_focus("Marketing")
            .with_exclude("");
        let request = build_request(&submission).unwrap();

        assert_eq!(request.parts.len(), 3);
        assert_eq!(request.material().len(), 2);
        let instructions = request.instructions();
        assert!(instructions.contains(FOCUS_MARKER));
        assert!(instructions.contains("Marketing"));
        assert!(!instructions.contains(EXCLUDE_MARKER));
    }

    #[test]
    fn directives_present_iff_hints_non_empty() {
        for (focus, exclude) in [
            (None, None),
            (Some("A"), None),
            (None, Some("B")),
            (Some("A"), Some("B")),
            (Some(" "), Some("")),
        ] {
            let mut s = Submission::default().with_text("Text");
            s.focus = focus.map(str::to_string);
            s.exclude = exclude.map(str::to_string);
            let request = build_request(&s).unwrap();
            let block = request.instructions();

            let want_focus = focus.is_some_and(|f| !f.trim().is_empty());
            let want_exclude = exclude.is_some_and(|e| !e.trim().is_empty());
            assert_eq!(block.contains(FOCUS_MARKER), want_focus, "{focus:?}");
            assert_eq!(block.contains(EXCLUDE_MARKER), want_exclude, "{exclude:?}");
        }
    }

    #[test]
    fn part_order_text_then_files_then_instructions() {
        let submission = Submission::new(vec![pdf("a.pdf"), FileInput::text("b.txt", "Notizen")])
            .with_text("Eigene Notiz");
        let request = build_request(&submission).unwrap();

        assert_eq!(request.parts.len(), 4);
        assert_eq!(
            request.parts[0].as_text(),
            Some("Zusätzlicher Textinhalt:\nEigene Notiz")
        );
        assert_eq!(
            request.parts[1],
            ContentPart::InlineData {
                mime_type: "application/pdf".into(),
                data: b"%PDF-1.7".to_vec(),
            }
        );
        assert_eq!(request.parts[2].as_text(), Some("Dokument: b.txt\nInhalt:\nNotizen"));
        assert!(request.instructions().starts_with(crate::prompts::ANALYSIS_DIRECTIVE));
    }

    #[test]
    fn instruction_block_always_carries_contract() {
        let block = instruction_block(None, None);
        assert!(block.contains("'summary', 'flashcards', 'quiz'"));
        assert!(block.contains("GENAU 4 Fragen pro Kapitel"));
    }
}
