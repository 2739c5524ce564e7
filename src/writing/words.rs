//! Word counting for whole texts and edited spans
//!
//! Words are maximal runs of characters outside the separator set. When a
//! span is cut out of a larger text, a word straddling either cut is only
//! partially inside the span and is not counted.

/// Punctuation that ends a word and, for insertions, a sentence
pub const PUNCTUATION: [char; 6] = [',', '.', '?', '!', ';', ':'];

/// Whitespace recognised as a word separator
const WHITESPACE: [char; 6] = [' ', '\t', '\n', '\r', '\x0c', '\x0b'];

/// Whether `c` separates words
pub fn is_separator(c: char) -> bool {
    WHITESPACE.contains(&c) || PUNCTUATION.contains(&c)
}

/// Word counter used for articles, chunks and jumps
pub struct WordCounter;

impl WordCounter {
    /// Count words in a complete text
    pub fn count_words(text: &str) -> usize {
        text.split(is_separator).filter(|t| !t.is_empty()).count()
    }

    /// Count words in `span`, dropping fragments cut at either boundary.
    ///
    /// A boundary is a cut when both the span's edge character and the
    /// neighbouring context character are word characters.
    pub fn count_span_words(span: &str, preceding: &str, subsequent: &str) -> usize {
        let (first, last) = match (span.chars().next(), span.chars().next_back()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0,
        };

        let mut fragments = 0;
        if !is_separator(first) {
            if let Some(before) = preceding.chars().next_back() {
                if !is_separator(before) {
                    fragments += 1;
                }
            }
        }
        if !is_separator(last) {
            if let Some(after) = subsequent.chars().next() {
                if !is_separator(after) {
                    fragments += 1;
                }
            }
        }

        Self::count_words(span).saturating_sub(fragments)
    }

    /// Count words removed by a deletion chunk
    pub fn count_deleted_words(deletion: &str, preceding: &str, subsequent: &str) -> usize {
        Self::count_span_words(deletion, preceding, subsequent)
    }

    /// Count words typed in an insertion chunk.
    ///
    /// Only the leading edge is corrected: the trailing context is taken to be
    /// a single space regardless of what follows the chunk.
    pub fn count_inserted_words(insertion: &str, preceding: &str) -> usize {
        Self::count_span_words(insertion, preceding, " ")
    }

    /// Count words skipped over by a caret jump
    pub fn count_jump_words(skipped: &str, preceding: &str, subsequent: &str) -> usize {
        if skipped.is_empty() {
            return 0;
        }
        Self::count_span_words(skipped, preceding, subsequent)
    }
}
