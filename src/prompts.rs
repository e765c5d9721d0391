//! Prompts for generating learning material.
//!
//! Every string the model reads lives here so wording changes touch one
//! file and tests can inspect the exact text. Callers can override the
//! system instruction via [`crate::config::StudyConfig::system_instruction`];
//! the per-request instruction block is always built from the pieces below.

/// Default system instruction: a thorough, pedagogically trained tutor that
/// always answers in German.
pub const SYSTEM_INSTRUCTION: &str = r#"Du bist ein erstklassiger, pädagogisch geschulter KI-Tutor.
Deine Aufgabe ist es, Lernmaterialien aus hochgeladenen Dokumenten zu erstellen.
Die Sprache ist IMMER Deutsch.
Du arbeitest gründlich, nicht oberflächlich.
Du erstellst:
1. Eine übersichtliche Zusammenfassung in Stichpunkten (kein langer Fließtext).
2. Interaktive Flashcards (Begriff & Definition).
3. Ein anspruchsvolles Quiz mit 4 Fragen pro Kapitel."#;

/// Opening line of every instruction block.
pub const ANALYSIS_DIRECTIVE: &str = "Analysiere die bereitgestellten Inhalte gründlich.";

/// Marker that starts the focus directive.
pub const FOCUS_MARKER: &str = "Lege den FOKUS besonders auf:";

/// Marker that starts the exclusion directive.
pub const EXCLUDE_MARKER: &str = "LASSE FOLGENDES WEG:";

/// Output contract and structural rules, appended after the directives.
pub const OUTPUT_CONTRACT: &str = r#"Erstelle ein einziges JSON-Objekt, das alle folgenden Schlüssel enthält: 'summary', 'flashcards', 'quiz'.

Strukturregeln:
1. 'summary': { title: string, chapters: [{ title: string, topics: [{ title: string, content: string (Stichpunkte), studyQuestions: string[] }] }] }
   - WICHTIG: Der Content MUSS aus prägnanten Stichpunkten bestehen, KEIN Blocktext.
   - Nutze '• ' am Zeilenanfang für jeden Punkt.
   - Füge unter jedem Thema 2-3 Lernfragen ('studyQuestions') hinzu.

2. 'flashcards': [{ term: string, definition: string }]
   - Erstelle ca. 10-20 wichtige Flashcards.

3. 'quiz': { chapters: [{ title: string, questions: [{ text: string, options: string[], correctAnswerIndex: number, explanation: string, hint: string }] }] }
   - Erstelle GENAU 4 Fragen pro Kapitel.
   - 'explanation': Warum ist die Antwort richtig/falsch?
   - 'hint': Ein hilfreicher Tipp, der nicht die Lösung verrät."#;

/// Prefix of the free-text content part.
pub const FREE_TEXT_PREFIX: &str = "Zusätzlicher Textinhalt:";

/// Appended to the system instruction for backends that cannot enforce a
/// response schema themselves.
pub const SCHEMA_SUFFIX: &str = r#"

Antworte ausschließlich mit einem JSON-Dokument, das exakt diesem Schema entspricht (keine Code-Fences, kein Kommentar):
"#;

pub fn focus_directive(focus: &str) -> String {
    format!("{FOCUS_MARKER} {focus}.")
}

pub fn exclude_directive(exclude: &str) -> String {
    format!("{EXCLUDE_MARKER} {exclude}.")
}

/// Content part for free text typed by the user.
pub fn free_text_part(text: &str) -> String {
    format!("{FREE_TEXT_PREFIX}\n{text}")
}

/// Content part for a text-kind document.
pub fn document_part(name: &str, text: &str) -> String {
    format!("Dokument: {name}\nInhalt:\n{text}")
}

/// System instruction with the output schema spelled out, for providers
/// without native structured output.
pub fn with_schema(instruction: &str, schema: &serde_json::Value) -> String {
    let schema = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!("{instruction}{SCHEMA_SUFFIX}{schema}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_instruction_fixes_language() {
        assert!(SYSTEM_INSTRUCTION.contains("IMMER Deutsch"));
        assert!(SYSTEM_INSTRUCTION.contains("gründlich"));
    }

    #[test]
    fn contract_names_all_rules() {
        for needle in ["'summary'", "'flashcards'", "'quiz'", "2-3 Lernfragen", "10-20", "GENAU 4", "• "] {
            assert!(OUTPUT_CONTRACT.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn directives_carry_user_text() {
        assert_eq!(focus_directive("Marketing"), "Lege den FOKUS besonders auf: Marketing.");
        assert_eq!(exclude_directive("Kapitel 3"), "LASSE FOLGENDES WEG: Kapitel 3.");
    }

    #[test]
    fn document_part_layout() {
        assert_eq!(document_part("a.txt", "x"), "Dokument: a.txt\nInhalt:\nx");
        assert_eq!(free_text_part("y"), "Zusätzlicher Textinhalt:\ny");
    }

    #[test]
    fn with_schema_appends_json() {
        let s = with_schema("base", &serde_json::json!({"type": "OBJECT"}));
        assert!(s.starts_with("base"));
        assert!(s.contains("\"OBJECT\""));
    }
}
