//! Quiz engine: walks the generated quiz chapter by chapter, question by
//! question, tracking selection, hint visibility and score.
//!
//! ```text
//! unanswered ──select_option──▶ answered ──advance──▶ next unanswered
//!     │                                        └──▶ finished (Completed)
//!     └── reveal_hint (pre-answer only)
//! any non-finished ──stop_early──▶ finished (Stopped)
//! ```
//!
//! Answers are final: once an option is selected the question locks, the
//! correct option and explanation become visible and the score updates.
//! Chapters without questions are skipped.

use crate::content::{QuizChapter, QuizData, QuizQuestion};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why the quiz ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Every question was answered.
    Completed,
    /// The learner stopped early.
    Stopped,
}

/// Feedback band of a finished quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Excellent,
    Great,
    Good,
    KeepGoing,
}

impl Band {
    /// Band for a rounded percentage.
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Band::Excellent,
            75..=89 => Band::Great,
            50..=74 => Band::Good,
            _ => Band::KeepGoing,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Band::Excellent => "Fantastisch! Du bist ein echter Experte.",
            Band::Great => "Super Leistung! Weiter so.",
            Band::Good => "Gut gemacht! Du bist auf dem richtigen Weg.",
            Band::KeepGoing => "Nicht aufgeben! Wiederholung ist der Schlüssel zum Erfolg.",
        }
    }
}

/// Result screen of a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizReport {
    pub score: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent; 0 for an empty quiz.
    pub percentage: u32,
    pub band: Band,
    pub reason: Option<FinishReason>,
}

impl QuizReport {
    pub fn message(&self) -> &'static str {
        self.band.message()
    }
}

/// Quiz progression state.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizEngine {
    quiz: QuizData,
    chapter_index: usize,
    question_index: usize,
    selected: Option<usize>,
    hint_visible: bool,
    score: usize,
    finished: Option<FinishReason>,
}

impl QuizEngine {
    pub fn new(quiz: QuizData) -> Self {
        let chapter_index = first_non_empty(&quiz.chapters, 0).unwrap_or(0);
        Self {
            quiz,
            chapter_index,
            question_index: 0,
            selected: None,
            hint_visible: false,
            score: 0,
            finished: None,
        }
    }

    pub fn quiz(&self) -> &QuizData {
        &self.quiz
    }

    pub fn chapter_index(&self) -> usize {
        self.chapter_index
    }

    pub fn question_index(&self) -> usize {
        self.question_index
    }

    pub fn current_chapter(&self) -> Option<&QuizChapter> {
        if self.is_finished() {
            return None;
        }
        self.quiz.chapters.get(self.chapter_index)
    }

    /// The question on screen, `None` once finished or for an empty quiz.
    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.current_chapter()?.questions.get(self.question_index)
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_answered(&self) -> bool {
        self.selected.is_some()
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.quiz.total_questions()
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finished
    }

    /// Whether the current question is the last one of the whole quiz.
    pub fn is_last_question(&self) -> bool {
        if self.current_question().is_none() {
            return false;
        }
        let in_chapter = self
            .current_chapter()
            .map(|c| self.question_index + 1 >= c.questions.len())
            .unwrap_or(true);
        in_chapter && first_non_empty(&self.quiz.chapters, self.chapter_index + 1).is_none()
    }

    /// Questions before the current position: 0 at the start, [`total`](Self::total)
    /// once the last question has been advanced past.
    pub fn processed(&self) -> usize {
        if self.finished == Some(FinishReason::Completed) {
            return self.total();
        }
        let before: usize = self
            .quiz
            .chapters
            .iter()
            .take(self.chapter_index)
            .map(|c| c.questions.len())
            .sum();
        before + self.question_index
    }

    /// Progress through the quiz in `0.0..=1.0`.
    pub fn progress(&self) -> f32 {
        match self.total() {
            0 => 0.0,
            total => self.processed() as f32 / total as f32,
        }
    }

    /// Answer the current question. Returns whether the answer was correct,
    /// or `None` when nothing changed (already answered, finished, out of range).
    pub fn select_option(&mut self, option: usize) -> Option<bool> {
        if self.is_answered() {
            return None;
        }
        let question = self.current_question()?;
        if option >= question.options.len() {
            return None;
        }

        let correct = question.is_correct(option);
        self.selected = Some(option);
        if correct {
            self.score += 1;
        }
        debug!(
            "Quiz {}/{}: option {} {}",
            self.chapter_index + 1,
            self.question_index + 1,
            option,
            if correct { "correct" } else { "wrong" }
        );
        Some(correct)
    }

    /// Show the hint of the current question. Only possible before answering.
    pub fn reveal_hint(&mut self) -> bool {
        if self.is_answered() || self.current_question().is_none() {
            return false;
        }
        self.hint_visible = true;
        true
    }

    /// Move on after answering. Finishes the quiz after the last question.
    pub fn advance(&mut self) -> bool {
        if !self.is_answered() || self.is_finished() {
            return false;
        }

        self.selected = None;
        self.hint_visible = false;

        let chapter_len = self
            .quiz
            .chapters
            .get(self.chapter_index)
            .map_or(0, |c| c.questions.len());

        if self.question_index + 1 < chapter_len {
            self.question_index += 1;
        } else if let Some(next) = first_non_empty(&self.quiz.chapters, self.chapter_index + 1) {
            self.chapter_index = next;
            self.question_index = 0;
        } else {
            self.finished = Some(FinishReason::Completed);
        }
        true
    }

    /// End the quiz before the last question.
    pub fn stop_early(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.finished = Some(FinishReason::Stopped);
        true
    }

    /// Back to the first question with a zero score.
    pub fn restart(&mut self) {
        *self = Self::new(std::mem::take(&mut self.quiz));
    }

    pub fn report(&self) -> QuizReport {
        let total = self.total();
        let percentage = percentage(self.score, total);
        QuizReport {
            score: self.score,
            total,
            percentage,
            band: Band::for_percentage(percentage),
            reason: self.finished,
        }
    }

    /// "Kapitel i von n" for the current chapter.
    pub fn chapter_label(&self) -> String {
        format!(
            "Kapitel {} von {}",
            self.chapter_index + 1,
            self.quiz.chapters.len()
        )
    }

    /// "Frage j / m" for the current question within its chapter.
    pub fn question_label(&self) -> String {
        let m = self.current_chapter().map_or(0, |c| c.questions.len());
        format!("Frage {} / {}", self.question_index + 1, m)
    }
}

/// Score as a rounded whole percentage; 0 when there is nothing to score.
pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((score * 200 + total) / (total * 2)) as u32
}

fn first_non_empty(chapters: &[QuizChapter], from: usize) -> Option<usize> {
    chapters
        .iter()
        .enumerate()
        .skip(from)
        .find(|(_, c)| !c.questions.is_empty())
        .map(|(i, _)| i)
}
