//! The learning-material data model and the output schema sent with every
//! generation request.
//!
//! The serde field names are the wire names the model is asked to produce
//! (`studyQuestions`, `correctAnswerIndex`), so a reply is deserialised
//! straight into [`GeneratedContent`]. [`output_schema`] describes the very
//! same shape for the endpoint; keep the two in lock-step. Every key the
//! schema lists as required is a required field here, so a reply missing one
//! fails to parse.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Structured summary, flashcards and quiz produced by one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub summary: SummaryData,
    pub flashcards: Vec<Flashcard>,
    pub quiz: QuizData,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryData {
    pub title: String,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterSummary {
    pub title: String,
    pub topics: Vec<Topic>,
}

/// One topic of a summary chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub title: String,
    /// Bullet-formatted text, one `• ` bullet per line.
    pub content: String,
    pub study_questions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuizData {
    pub chapters: Vec<QuizChapter>,
}

impl QuizData {
    /// Number of questions across all chapters.
    pub fn total_questions(&self) -> usize {
        self.chapters.iter().map(|c| c.questions.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizChapter {
    pub title: String,
    pub questions: Vec<QuizQuestion>,
}

/// A multiple-choice question.
///
/// `correct_answer_index` is expected to address `options`; a negative value
/// fails deserialisation, an out-of-range one is reported by
/// [`crate::pipeline::postprocess::contract_findings`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
    pub hint: String,
}

impl QuizQuestion {
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer_index
    }

    /// Option text the model marked as correct, if the index is valid.
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer_index)
            .map(String::as_str)
    }
}

/// Letter label shown next to an option (`A`, `B`, …).
pub fn option_label(index: usize) -> char {
    char::from_u32('A' as u32 + index as u32).unwrap_or('?')
}

// ── Output schema ────────────────────────────────────────────────────────

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn array_of(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({ "type": "OBJECT", "properties": properties, "required": required })
}

/// JSON schema (Gemini `responseSchema` dialect) mirroring [`GeneratedContent`].
pub fn output_schema() -> Value {
    let topic = object(
        json!({
            "title": string(),
            "content": string(),
            "studyQuestions": array_of(string()),
        }),
        &["title", "content", "studyQuestions"],
    );
    let chapter_summary = object(
        json!({ "title": string(), "topics": array_of(topic) }),
        &["title", "topics"],
    );
    let summary = object(
        json!({ "title": string(), "chapters": array_of(chapter_summary) }),
        &["title", "chapters"],
    );

    let flashcard = object(
        json!({ "term": string(), "definition": string() }),
        &["term", "definition"],
    );

    let question = object(
        json!({
            "text": string(),
            "options": array_of(string()),
            "correctAnswerIndex": { "type": "INTEGER" },
            "explanation": string(),
            "hint": string(),
        }),
        &["text", "options", "correctAnswerIndex", "explanation", "hint"],
    );
    let quiz_chapter = object(
        json!({ "title": string(), "questions": array_of(question) }),
        &["title", "questions"],
    );
    let quiz = object(json!({ "chapters": array_of(quiz_chapter) }), &["chapters"]);

    object(
        json!({
            "summary": summary,
            "flashcards": array_of(flashcard),
            "quiz": quiz,
        }),
        &["summary", "flashcards", "quiz"],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "summary": {
            "title": "Marketing",
            "chapters": [{
                "title": "Grundlagen",
                "topics": [{
                    "title": "4P",
                    "content": "• Product\n• Price",
                    "studyQuestions": ["Was sind die 4P?", "Wozu dient Price?"]
                }]
            }]
        },
        "flashcards": [{ "term": "USP", "definition": "Alleinstellungsmerkmal" }],
        "quiz": {
            "chapters": [{
                "title": "Grundlagen",
                "questions": [{
                    "text": "Was gehört zu den 4P?",
                    "options": ["Product", "People"],
                    "correctAnswerIndex": 0,
                    "explanation": "Product ist eines der 4P.",
                    "hint": "Denk an das Produkt."
                }]
            }]
        }
    }"#;

    #[test]
    fn deserialises_wire_names() {
        let content: GeneratedContent = serde_json::from_str(SAMPLE).unwrap();
        let topic = &content.summary.chapters[0].topics[0];
        assert_eq!(topic.study_questions.len(), 2);
        let q = &content.quiz.chapters[0].questions[0];
        assert_eq!(q.correct_answer_index, 0);
        assert_eq!(q.correct_option(), Some("Product"));
        assert!(q.is_correct(0));
        assert!(!q.is_correct(1));
    }

    #[test]
    fn serialises_back_to_camel_case() {
        let content: GeneratedContent = serde_json::from_str(SAMPLE).unwrap();
        let json = serde_json::to_string(&content).unwrap();
        assert!(json.contains("\"studyQuestions\""));
        assert!(json.contains("\"correctAnswerIndex\""));
    }

    #[test]
    fn missing_top_level_key_fails() {
        let err = serde_json::from_str::<GeneratedContent>(r#"{"summary":{},"flashcards":[]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn empty_objects_fail() {
        let err = serde_json::from_str::<GeneratedContent>(
            r#"{"summary":{},"flashcards":[],"quiz":{}}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn missing_nested_keys_fail() {
        for key in ["\"studyQuestions\"", "\"content\"", "\"hint\"", "\"explanation\""] {
            let json = SAMPLE.replacen(key, "\"unused\"", 1);
            assert!(
                serde_json::from_str::<GeneratedContent>(&json).is_err(),
                "accepted reply without {key}"
            );
        }
    }

    #[test]
    fn negative_answer_index_fails() {
        let json = SAMPLE.replace("\"correctAnswerIndex\": 0", "\"correctAnswerIndex\": -1");
        assert!(serde_json::from_str::<GeneratedContent>(&json).is_err());
    }

    #[test]
    fn total_questions_sums_chapters() {
        let content: GeneratedContent = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(content.quiz.total_questions(), 1);
        assert_eq!(QuizData::default().total_questions(), 0);
    }

    #[test]
    fn schema_requires_three_top_level_keys() {
        let schema = output_schema();
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["required"], json!(["summary", "flashcards", "quiz"]));
        let question = &schema["properties"]["quiz"]["properties"]["chapters"]["items"]
            ["properties"]["questions"]["items"];
        assert_eq!(question["properties"]["correctAnswerIndex"]["type"], "INTEGER");
        assert_eq!(question["properties"]["options"]["type"], "ARRAY");
    }

    #[test]
    fn option_labels() {
        assert_eq!(option_label(0), 'A');
        assert_eq!(option_label(3), 'D');
    }
}
