//! A4 page layout for the summary export.
//!
//! Works in millimetres with the origin at the top-left corner, flowing
//! top to bottom. [`crate::export::pdf`] converts to PDF points when drawing.
//! Keeping the layout pure means page breaks and wrapping are testable
//! without a pdfium library.
//!
//! ```text
//! Title                              22pt
//! Erstellt mit SmartLearn AI am …    10pt
//! 1. Chapter                         16pt bold
//!    Topic                           12pt bold
//!    • wrapped bullet content        10pt
//!      Lernfragen:                   10pt italic
//!      • question                    10pt italic
//! ──────────────────────────────     rule between chapters
//! ```

use crate::content::SummaryData;

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

/// Title shown when the summary has none.
pub const FALLBACK_TITLE: &str = "Lernzusammenfassung";

const TOP_MM: f32 = 20.0;
const BODY_SIZE: f32 = 10.0;
const LINE_HEIGHT_MM: f32 = 5.0;
const QUESTION_INDENT_MM: f32 = 5.0;

/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;
const MM_PER_POINT: f32 = 25.4 / 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

/// One drawing instruction, positioned in millimetres from the top-left.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// A single line of text; `y` is the baseline.
    Text {
        text: String,
        x: f32,
        y: f32,
        size: f32,
        style: FontStyle,
    },
    /// Horizontal separator.
    Rule { x1: f32, x2: f32, y: f32 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    /// Text of every text element, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Rule { .. } => None,
        })
    }
}

/// Flowing cursor over a growing list of pages.
struct Flow {
    pages: Vec<Page>,
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: TOP_MM,
        }
    }

    /// Start a new page when `height` more millimetres would not fit.
    fn ensure_room(&mut self, height: f32) {
        if self.y + height >= PAGE_HEIGHT_MM - MARGIN_MM {
            self.pages.push(Page::default());
            self.y = TOP_MM;
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn text(&mut self, text: impl Into<String>, x: f32, size: f32, style: FontStyle) {
        let y = self.y;
        self.push(Element::Text {
            text: text.into(),
            x,
            y,
            size,
            style,
        });
    }

    /// Wrapped lines at `LINE_HEIGHT_MM` spacing. A block that fits on one
    /// page is kept together; a taller one breaks between lines.
    fn block(&mut self, lines: Vec<String>, x: f32, style: FontStyle) {
        let height = lines.len() as f32 * LINE_HEIGHT_MM;
        if height < PAGE_HEIGHT_MM - MARGIN_MM - TOP_MM {
            self.ensure_room(height);
        }
        for line in lines {
            self.ensure_room(LINE_HEIGHT_MM);
            self.text(line, x, BODY_SIZE, style);
            self.y += LINE_HEIGHT_MM;
        }
    }
}

/// Lay out a summary. `date` is the already formatted creation date.
pub fn layout_summary(summary: &SummaryData, date: &str) -> Vec<Page> {
    let mut flow = Flow::new();

    let title = match summary.title.trim() {
        "" => FALLBACK_TITLE,
        t => t,
    };
    flow.text(title, MARGIN_MM, 22.0, FontStyle::Regular);
    flow.y += 15.0;

    flow.text(
        format!("Erstellt mit SmartLearn AI am {date}"),
        MARGIN_MM,
        BODY_SIZE,
        FontStyle::Regular,
    );
    flow.y += 15.0;

    let body_chars = chars_per_line(CONTENT_WIDTH_MM, BODY_SIZE);
    let question_chars = chars_per_line(CONTENT_WIDTH_MM - QUESTION_INDENT_MM, BODY_SIZE);

    for (c_idx, chapter) in summary.chapters.iter().enumerate() {
        flow.ensure_room(20.0);
        flow.text(
            format!("{}. {}", c_idx + 1, chapter.title),
            MARGIN_MM,
            16.0,
            FontStyle::Bold,
        );
        flow.y += 10.0;

        for topic in &chapter.topics {
            flow.ensure_room(20.0);
            flow.text(topic.title.as_str(), MARGIN_MM, 12.0, FontStyle::Bold);
            flow.y += 7.0;

            flow.block(wrap_text(&topic.content, body_chars), MARGIN_MM, FontStyle::Regular);
            flow.y += 5.0;

            if !topic.study_questions.is_empty() {
                flow.ensure_room(15.0);
                flow.text(
                    "Lernfragen:",
                    MARGIN_MM + QUESTION_INDENT_MM,
                    BODY_SIZE,
                    FontStyle::Italic,
                );
                flow.y += 5.0;

                for question in &topic.study_questions {
                    let lines = wrap_text(&format!("• {question}"), question_chars);
                    flow.block(lines, MARGIN_MM + QUESTION_INDENT_MM, FontStyle::Italic);
                    flow.y += 2.0;
                }
                flow.y += 5.0;
            }
        }

        flow.y += 5.0;
        flow.push(Element::Rule {
            x1: MARGIN_MM,
            x2: MARGIN_MM + CONTENT_WIDTH_MM,
            y: flow.y,
        });
        flow.y += 10.0;
    }

    flow.pages
}

/// How many average glyphs of `size` points fit into `width_mm`.
fn chars_per_line(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * AVG_GLYPH_WIDTH * MM_PER_POINT)) as usize).max(1)
}

/// Greedy word wrap; explicit newlines are kept, overlong words are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        let mut len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > max_chars {
                if len > 0 {
                    lines.push(std::mem::take(&mut line));
                    len = 0;
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if len == 0 { word.len() } else { len + 1 + word.len() };
            if needed > max_chars && len > 0 {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            line.extend(word.iter());
            len += word.len();
        }

        if len > 0 || paragraph.trim().is_empty() {
            lines.push(line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ChapterSummary, Topic};

    fn summary(chapters: usize, topics: usize, content_lines: usize) -> SummaryData {
        SummaryData {
            title: "Mikroökonomie".into(),
            chapters: (0..chapters)
                .map(|c| ChapterSummary {
                    title: format!("Kapitel {c}"),
                    topics: (0..topics)
                        .map(|t| Topic {
                            title: format!("Thema {t}"),
                            content: vec!["• Angebot und Nachfrage"; content_lines].join("\n"),
                            study_questions: vec!["Was ist ein Markt?".into(), "Warum?".into()],
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn header_title_and_date() {
        let pages = layout_summary(&summary(1, 1, 1), "19.10.2026");
        let texts: Vec<&str> = pages[0].texts().collect();
        assert_eq!(texts[0], "Mikroökonomie");
        assert_eq!(texts[1], "Erstellt mit SmartLearn AI am 19.10.2026");
        assert_eq!(texts[2], "1. Kapitel 0");
        assert_eq!(texts[3], "Thema 0");
        assert!(texts.contains(&"Lernfragen:"));
        assert!(texts.contains(&"• Was ist ein Markt?"));
    }

    #[test]
    fn empty_title_falls_back() {
        let mut s = summary(0, 0, 0);
        s.title = "  ".into();
        let pages = layout_summary(&s, "1.1.2026");
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].texts().next(), Some(FALLBACK_TITLE));
    }

    fn assert_within_margins(pages: &[Page]) {
        for page in pages {
            for element in &page.elements {
                match element {
                    Element::Text { y, .. } => {
                        assert!(*y >= TOP_MM, "text above top margin: {element:?}");
                        assert!(
                            *y <= PAGE_HEIGHT_MM - MARGIN_MM,
                            "text below bottom margin: {element:?}"
                        );
                    }
                    Element::Rule { y, .. } => {
                        assert!(*y >= TOP_MM && *y <= PAGE_HEIGHT_MM, "rule off page: {element:?}");
                    }
                }
            }
        }
    }

    #[test]
    fn long_summaries_break_pages_within_margins() {
        let pages = layout_summary(&summary(6, 4, 8), "1.1.2026");
        assert!(pages.len() > 3, "got {} pages", pages.len());
        assert_within_margins(&pages);
    }

    #[test]
    fn topic_taller_than_a_page_breaks_between_lines() {
        let pages = layout_summary(&summary(1, 1, 70), "1.1.2026");
        assert!(pages.len() >= 2, "got {} pages", pages.len());
        assert_within_margins(&pages);

        let drawn = pages
            .iter()
            .flat_map(|p| p.texts())
            .filter(|t| *t == "• Angebot und Nachfrage")
            .count();
        assert_eq!(drawn, 70);
    }

    #[test]
    fn short_block_moves_to_next_page_whole() {
        let mut s = summary(1, 2, 45);
        s.chapters[0].topics[1].content = vec!["• Kurz"; 8].join("\n");
        let pages = layout_summary(&s, "1.1.2026");
        let pages_with_short_lines: Vec<usize> = pages
            .iter()
            .enumerate()
            .filter(|(_, p)| p.texts().any(|t| t == "• Kurz"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(pages_with_short_lines.len(), 1);
        assert_within_margins(&pages);
    }

    #[test]
    fn chapters_are_numbered_and_separated() {
        let pages = layout_summary(&summary(3, 1, 1), "1.1.2026");
        let all: Vec<&Element> = pages.iter().flat_map(|p| p.elements.iter()).collect();
        let rules = all.iter().filter(|e| matches!(e, Element::Rule { .. })).count();
        assert_eq!(rules, 3);
        let texts: Vec<&str> = pages.iter().flat_map(|p| p.texts()).collect();
        assert!(texts.contains(&"3. Kapitel 2"));
    }

    #[test]
    fn wrap_respects_width_and_newlines() {
        let lines = wrap_text("eins zwei drei vier\nfünf", 9);
        assert_eq!(lines, vec!["eins zwei", "drei vier", "fünf"]);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let lines = wrap_text("Donaudampfschifffahrt", 8);
        assert_eq!(lines, vec!["Donaudam", "pfschiff", "fahrt"]);
    }

    #[test]
    fn body_width_fits_about_ninety_characters() {
        let n = chars_per_line(CONTENT_WIDTH_MM, BODY_SIZE);
        assert!((90..=100).contains(&n), "got {n}");
    }
}
