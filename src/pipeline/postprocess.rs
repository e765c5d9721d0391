//! Post-processing: deterministic cleanup of the model reply and of the
//! generated material.
//!
//! Even with a declared response schema, replies arrive with quirks:
//!
//! - the JSON wrapped in ` ```json ... ``` ` fences (providers without
//!   native structured output do this constantly)
//! - a BOM or zero-width characters in front of the opening brace
//! - topic content using `-` or `*` bullets instead of the requested `• `
//! - Windows line endings inside strings
//!
//! [`clean_reply`] runs before parsing, [`polish_content`] after.
//! [`contract_findings`] lists where the reply breaks the counts the prompt
//! asked for; the generation client decides what to do with them.

use crate::content::GeneratedContent;
use once_cell::sync::Lazy;
use regex::Regex;

/// Bullet every topic-content line should start with.
pub const BULLET: &str = "• ";

/// Clean the raw reply text so it can be handed to the JSON parser.
///
/// Rules (applied in order):
/// 1. Remove invisible Unicode (BOM, zero-width spaces, soft hyphens)
/// 2. Strip outer code fences
/// 3. Cut surrounding prose off the outermost `{ … }` object
pub fn clean_reply(input: &str) -> String {
    let s = remove_invisible_chars(input);
    let s = strip_code_fences(&s);
    extract_json_object(&s)
}

/// Normalise the generated material in place.
pub fn polish_content(content: &mut GeneratedContent) {
    content.summary.title = content.summary.title.trim().to_string();
    for chapter in &mut content.summary.chapters {
        chapter.title = chapter.title.trim().to_string();
        for topic in &mut chapter.topics {
            topic.title = topic.title.trim().to_string();
            topic.content = normalise_bullets(&topic.content);
            topic.study_questions.retain(|q| !q.trim().is_empty());
        }
    }
    for card in &mut content.flashcards {
        card.term = card.term.trim().to_string();
        card.definition = card.definition.trim().to_string();
    }
}

/// Where the reply breaks the counts and index ranges the prompt demands.
pub fn contract_findings(content: &GeneratedContent) -> Vec<String> {
    let mut findings = Vec::new();

    let cards = content.flashcards.len();
    if !(10..=20).contains(&cards) {
        findings.push(format!("expected 10–20 flashcards, got {cards}"));
    }

    for chapter in &content.summary.chapters {
        for topic in &chapter.topics {
            let n = topic.study_questions.len();
            if !(2..=3).contains(&n) {
                findings.push(format!(
                    "topic '{}' has {n} study questions (expected 2–3)",
                    topic.title
                ));
            }
        }
    }

    for chapter in &content.quiz.chapters {
        if chapter.questions.len() != 4 {
            findings.push(format!(
                "quiz chapter '{}' has {} questions (expected 4)",
                chapter.title,
                chapter.questions.len()
            ));
        }
        for (i, q) in chapter.questions.iter().enumerate() {
            if q.options.len() < 2 {
                findings.push(format!(
                    "question {} of '{}' has {} options (expected ≥ 2)",
                    i + 1,
                    chapter.title,
                    q.options.len()
                ));
            }
            if q.correct_answer_index >= q.options.len() {
                findings.push(format!(
                    "question {} of '{}' marks option {} correct but has {} options",
                    i + 1,
                    chapter.title,
                    q.correct_answer_index,
                    q.options.len()
                ));
            }
        }
    }

    findings
}

// ── Rule 1: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

// ── Rule 2: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*)\n```\s*$").unwrap());

fn strip_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(caps) = RE_OUTER_FENCES.captures(trimmed) {
        caps[1].trim().to_string()
    } else {
        trimmed.to_string()
    }
}

// ── Rule 3: Extract the outermost JSON object ────────────────────────────────

fn extract_json_object(input: &str) -> String {
    match (input.find('{'), input.rfind('}')) {
        (Some(start), Some(end)) if start < end => input[start..=end].to_string(),
        _ => input.to_string(),
    }
}

// ── Content: bullets ─────────────────────────────────────────────────────────

static RE_LIST_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:[-*+•·▪]|\d+[.)])\s+").unwrap());

/// One `• ` bullet per non-blank line, LF line endings.
fn normalise_bullets(content: &str) -> String {
    content
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let body = RE_LIST_MARKER.replace(line, "");
            format!("{BULLET}{}", body.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}
