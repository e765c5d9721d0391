//! Markdown rendering of the learning material, the text counterpart of the
//! PDF export.

use crate::content::{option_label, Flashcard, GeneratedContent, QuizData, SummaryData};
use crate::export::layout::FALLBACK_TITLE;
use std::fmt::Write;

/// Render the summary as Markdown: title, numbered chapters, topic headers,
/// bullet content and a "Lernfragen" block per topic.
pub fn render_summary(summary: &SummaryData) -> String {
    let mut out = String::new();

    let title = match summary.title.trim() {
        "" => FALLBACK_TITLE,
        t => t,
    };
    let _ = writeln!(out, "# {title}\n");

    for (c_idx, chapter) in summary.chapters.iter().enumerate() {
        let _ = writeln!(out, "## {}. {}\n", c_idx + 1, chapter.title);

        for topic in &chapter.topics {
            let _ = writeln!(out, "### {}\n", topic.title);

            let content = topic.content.trim();
            if !content.is_empty() {
                for line in content.lines() {
                    let _ = writeln!(out, "{}  ", line.trim_end());
                }
                out.push('\n');
            }

            if !topic.study_questions.is_empty() {
                out.push_str("**Lernfragen**\n\n");
                for question in &topic.study_questions {
                    let _ = writeln!(out, "- {question}");
                }
                out.push('\n');
            }
        }
    }

    let trimmed = out.trim_end().len();
    out.truncate(trimmed);
    out.push('\n');
    out
}

/// Flashcards as a term/definition list.
pub fn render_flashcards(cards: &[Flashcard]) -> String {
    let mut out = String::from("## Karteikarten\n\n");
    for card in cards {
        let _ = writeln!(out, "- **{}**: {}", card.term, card.definition);
    }
    out
}

/// Quiz with options, hint, solution and explanation per question.
pub fn render_quiz(quiz: &QuizData) -> String {
    let mut out = String::from("## Quiz\n");
    for (c_idx, chapter) in quiz.chapters.iter().enumerate() {
        let _ = writeln!(out, "\n### Kapitel {}: {}", c_idx + 1, chapter.title);
        for (q_idx, question) in chapter.questions.iter().enumerate() {
            let _ = writeln!(out, "\n{}. {}", q_idx + 1, question.text);
            for (o_idx, option) in question.options.iter().enumerate() {
                let _ = writeln!(out, "   - {}) {}", option_label(o_idx), option);
            }
            if !question.hint.is_empty() {
                let _ = writeln!(out, "\n   *Tipp:* {}", question.hint);
            }
            if let Some(correct) = question.correct_option() {
                let _ = writeln!(
                    out,
                    "\n   **Lösung:** {}) {}",
                    option_label(question.correct_answer_index),
                    correct
                );
            }
            if !question.explanation.is_empty() {
                let _ = writeln!(out, "   {}", question.explanation);
            }
        }
    }
    out
}

/// Summary, flashcards and quiz in one document.
pub fn render_study_sheet(content: &GeneratedContent) -> String {
    format!(
        "{}\n{}\n{}",
        render_summary(&content.summary),
        render_flashcards(&content.flashcards),
        render_quiz(&content.quiz)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ChapterSummary, QuizChapter, QuizQuestion, Topic};

    #[test]
    fn renders_structure() {
        let summary = SummaryData {
            title: "Statistik".into(),
            chapters: vec![ChapterSummary {
                title: "Grundlagen".into(),
                topics: vec![Topic {
                    title: "Mittelwert".into(),
                    content: "• Summe durch Anzahl\n• empfindlich für Ausreißer".into(),
                    study_questions: vec!["Wann ist der Median besser?".into()],
                }],
            }],
        };
        let md = render_summary(&summary);
        assert!(md.starts_with("# Statistik\n\n## 1. Grundlagen\n\n### Mittelwert\n\n"));
        assert!(md.contains("• Summe durch Anzahl  \n• empfindlich für Ausreißer  \n"));
        assert!(md.contains("**Lernfragen**\n\n- Wann ist der Median besser?\n"));
        assert!(md.ends_with("besser?\n"));
    }

    #[test]
    fn empty_summary_uses_fallback_title() {
        assert_eq!(render_summary(&SummaryData::default()), "# Lernzusammenfassung\n");
    }

    #[test]
    fn quiz_lists_options_and_solution() {
        let quiz = QuizData {
            chapters: vec![QuizChapter {
                title: "Grundlagen".into(),
                questions: vec![QuizQuestion {
                    text: "Was ist 2 + 2?".into(),
                    options: vec!["3".into(), "4".into()],
                    correct_answer_index: 1,
                    explanation: "Addition.".into(),
                    hint: "Zähle.".into(),
                }],
            }],
        };
        let md = render_quiz(&quiz);
        assert!(md.contains("### Kapitel 1: Grundlagen"));
        assert!(md.contains("1. Was ist 2 + 2?\n   - A) 3\n   - B) 4\n"));
        assert!(md.contains("**Lösung:** B) 4"));
        assert!(md.contains("*Tipp:* Zähle."));
    }

    #[test]
    fn flashcards_as_list() {
        let md = render_flashcards(&[Flashcard {
            term: "Median".into(),
            definition: "Mittlerer Wert".into(),
        }]);
        assert_eq!(md, "## Karteikarten\n\n- **Median**: Mittlerer Wert\n");
    }
}
