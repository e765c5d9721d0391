//! Flashcard navigator: one card at a time, front (term) or back
//! (definition), cyclic next/previous.

use crate::content::Flashcard;
use thiserror::Error;

/// Navigation on an empty deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no flashcards available")]
pub struct NoContent;

/// Which side of the card is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Front,
    Back,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlashcardNavigator {
    cards: Vec<Flashcard>,
    index: usize,
    flipped: bool,
}

impl FlashcardNavigator {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            index: 0,
            flipped: false,
        }
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn side(&self) -> Side {
        if self.flipped {
            Side::Back
        } else {
            Side::Front
        }
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.index)
    }

    /// Text on the visible side of the current card.
    pub fn visible_text(&self) -> Option<&str> {
        self.current().map(|card| match self.side() {
            Side::Front => card.term.as_str(),
            Side::Back => card.definition.as_str(),
        })
    }

    /// Turn the current card over.
    pub fn flip(&mut self) -> Result<Side, NoContent> {
        if self.is_empty() {
            return Err(NoContent);
        }
        self.flipped = !self.flipped;
        Ok(self.side())
    }

    /// Next card, wrapping from the last to the first. Shows the front.
    pub fn next(&mut self) -> Result<&Flashcard, NoContent> {
        let n = self.len();
        if n == 0 {
            return Err(NoContent);
        }
        self.flipped = false;
        self.index = (self.index + 1) % n;
        Ok(&self.cards[self.index])
    }

    /// Previous card, wrapping from the first to the last. Shows the front.
    pub fn prev(&mut self) -> Result<&Flashcard, NoContent> {
        let n = self.len();
        if n == 0 {
            return Err(NoContent);
        }
        self.flipped = false;
        self.index = (self.index + n - 1) % n;
        Ok(&self.cards[self.index])
    }

    /// "Karte i von n"
    pub fn progress_label(&self) -> String {
        if self.is_empty() {
            return "Karte 0 von 0".to_string();
        }
        format!("Karte {} von {}", self.index + 1, self.len())
    }
}
