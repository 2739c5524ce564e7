//! Pause tracking between typed characters
//!
//! Every ordinary character closes the pause that preceded it. Which category
//! the pause falls in depends on what was typed since the previous ordinary
//! character: nothing (within a word), a space (between words), punctuation
//! (between sentences) or a newline (between paragraphs).

use crate::writing::types::Sample;
use crate::writing::words::PUNCTUATION;

/// The pending word boundary, if any. Only one can be open at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Boundary {
    #[default]
    None,
    BetweenWord(i64),
    BetweenSentence(i64),
    BetweenParagraph(i64),
}

/// Class of an inserted character as far as pauses are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Space,
    Punctuation,
    Newline,
    Ordinary,
}

impl CharClass {
    pub fn of(c: char) -> Self {
        match c {
            ' ' => CharClass::Space,
            '\n' => CharClass::Newline,
            c if PUNCTUATION.contains(&c) => CharClass::Punctuation,
            _ => CharClass::Ordinary,
        }
    }
}

/// Pause timestamps carried across events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseTracker {
    within_word: Option<i64>,
    boundary: Boundary,
    last_char: Option<i64>,
}

impl PauseTracker {
    /// Forget every timestamp. Used whenever typing continuity breaks.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn boundary(&self) -> Boundary {
        self.boundary
    }

    pub fn within_word(&self) -> Option<i64> {
        self.within_word
    }

    /// Register an inserted character at `now`, returning the pause it closes
    pub fn on_insert(&mut self, c: char, now: i64) -> Option<Sample> {
        match CharClass::of(c) {
            CharClass::Space => {
                self.within_word = None;
                None
            }
            CharClass::Punctuation => {
                self.within_word = None;
                if !matches!(self.boundary, Boundary::BetweenSentence(_)) {
                    self.boundary = self
                        .last_char
                        .map_or(Boundary::None, Boundary::BetweenSentence);
                }
                None
            }
            CharClass::Newline => {
                self.within_word = None;
                if !matches!(self.boundary, Boundary::BetweenParagraph(_)) {
                    self.boundary = self
                        .last_char
                        .map_or(Boundary::None, Boundary::BetweenParagraph);
                }
                None
            }
            CharClass::Ordinary => {
                let sample = match self.within_word {
                    Some(since) => Some(Sample::WithinWordPause(now.saturating_sub(since))),
                    None => match self.boundary {
                        Boundary::None => None,
                        Boundary::BetweenWord(since) => {
                            Some(Sample::BetweenWordPause(now.saturating_sub(since)))
                        }
                        Boundary::BetweenSentence(since) => {
                            Some(Sample::BetweenSentencePause(now.saturating_sub(since)))
                        }
                        Boundary::BetweenParagraph(since) => {
                            Some(Sample::BetweenParagraphPause(now.saturating_sub(since)))
                        }
                    },
                };
                self.within_word = Some(now);
                self.boundary = Boundary::BetweenWord(now);
                self.last_char = Some(now);
                sample
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(tracker: &mut PauseTracker, text: &str, start: i64, step: i64) -> Vec<Sample> {
        text.chars()
            .enumerate()
            .filter_map(|(i, c)| tracker.on_insert(c, start + i as i64 * step))
            .collect()
    }

    #[test]
    fn test_char_classes() {
        assert_eq!(CharClass::of(' '), CharClass::Space);
        assert_eq!(CharClass::of('\n'), CharClass::Newline);
        assert_eq!(CharClass::of('?'), CharClass::Punctuation);
        assert_eq!(CharClass::of('\t'), CharClass::Ordinary);
        assert_eq!(CharClass::of('a'), CharClass::Ordinary);
    }

    #[test]
    fn test_within_word_pauses() {
        let mut tracker = PauseTracker::default();
        let samples = type_text(&mut tracker, "abc", 0, 100);
        assert_eq!(
            samples,
            vec![Sample::WithinWordPause(100), Sample::WithinWordPause(100)]
        );
    }

    #[test]
    fn test_between_word_pause_measures_from_last_letter() {
        let mut tracker = PauseTracker::default();
        tracker.on_insert('a', 0);
        assert_eq!(tracker.on_insert(' ', 300), None);
        assert_eq!(tracker.boundary(), Boundary::BetweenWord(0));
        assert_eq!(tracker.on_insert('b', 1000), Some(Sample::BetweenWordPause(1000)));
    }

    #[test]
    fn test_sentence_pause_replaces_word_boundary() {
        let mut tracker = PauseTracker::default();
        tracker.on_insert('a', 0);
        tracker.on_insert('.', 100);
        tracker.on_insert(' ', 200);
        assert_eq!(tracker.boundary(), Boundary::BetweenSentence(0));
        assert_eq!(tracker.on_insert('B', 900), Some(Sample::BetweenSentencePause(900)));
        assert_eq!(tracker.boundary(), Boundary::BetweenWord(900));
    }

    #[test]
    fn test_repeated_punctuation_keeps_first_seed() {
        let mut tracker = PauseTracker::default();
        tracker.on_insert('a', 0);
        tracker.on_insert('!', 100);
        tracker.on_insert('?', 200);
        assert_eq!(tracker.boundary(), Boundary::BetweenSentence(0));
    }

    #[test]
    fn test_paragraph_pause() {
        let mut tracker = PauseTracker::default();
        tracker.on_insert('a', 0);
        tracker.on_insert('.', 50);
        tracker.on_insert('\n', 100);
        tracker.on_insert('\n', 150);
        assert_eq!(tracker.boundary(), Boundary::BetweenParagraph(0));
        assert_eq!(tracker.on_insert('N', 4000), Some(Sample::BetweenParagraphPause(4000)));
    }

    #[test]
    fn test_punctuation_without_prior_letter_seeds_nothing() {
        let mut tracker = PauseTracker::default();
        tracker.on_insert('.', 0);
        assert_eq!(tracker.boundary(), Boundary::None);
        assert_eq!(tracker.on_insert('a', 500), None);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut tracker = PauseTracker::default();
        tracker.on_insert('a', 0);
        tracker.reset();
        assert_eq!(tracker, PauseTracker::default());
        assert_eq!(tracker.on_insert('b', 100), None);
    }
}
