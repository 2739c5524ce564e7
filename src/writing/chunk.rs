//! Insertion and deletion chunk buffers
//!
//! A chunk is a burst of typing or deleting treated as one unit. Each buffer
//! is either idle or holds the open chunk; closing a chunk yields a
//! `(word count, duration)` sample.

use crate::writing::types::Sample;
use crate::writing::words::WordCounter;

/// An open chunk with the snapshot context around it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenChunk {
    pub text: String,
    pub started_ms: i64,
    pub preceding: String,
    pub subsequent: String,
}

/// Typing burst buffer. Bursts are delimited by long pauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InsertionChunk {
    #[default]
    Idle,
    Open(OpenChunk),
}

impl InsertionChunk {
    /// Drop the open chunk without recording it
    pub fn discard(&mut self) {
        *self = InsertionChunk::Idle;
    }

    /// Close the open chunk (if any) and start a new one with `c`
    pub fn restart(&mut self, c: char, now: i64, preceding: String) -> Option<Sample> {
        let sample = match self {
            InsertionChunk::Idle => None,
            InsertionChunk::Open(chunk) => Some(Sample::InsertionChunk {
                words: WordCounter::count_inserted_words(&chunk.text, &chunk.preceding),
                duration_ms: now.saturating_sub(chunk.started_ms),
            }),
        };
        *self = InsertionChunk::Open(OpenChunk {
            text: c.to_string(),
            started_ms: now,
            preceding,
            subsequent: String::new(),
        });
        sample
    }

    /// Extend the open chunk. An idle buffer stays idle until the next long pause.
    pub fn append(&mut self, c: char) {
        if let InsertionChunk::Open(chunk) = self {
            chunk.text.push(c);
        }
    }
}

/// Deletion run buffer. A run continues while each removal touches the
/// already-removed text at its front or back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeletionChunk {
    #[default]
    Idle,
    Open(OpenChunk),
}

/// Where a removal sits relative to the caret before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjacency {
    /// Removal starts right after the caret (forward delete)
    After,
    /// Removal ends at the caret (backspace)
    Before,
    Detached,
}

impl Adjacency {
    /// Compare removed range `[s1, e1)` with the previous caret position
    pub fn of(s1: usize, e1: usize, last_position: isize) -> Self {
        let next = last_position + 1;
        if s1 as isize == next {
            Adjacency::After
        } else if e1 as isize == next {
            Adjacency::Before
        } else {
            Adjacency::Detached
        }
    }
}

impl DeletionChunk {
    pub fn is_open(&self) -> bool {
        matches!(self, DeletionChunk::Open(_))
    }

    /// Close the open chunk, returning its sample
    pub fn flush(&mut self, now: i64) -> Option<Sample> {
        match std::mem::take(self) {
            DeletionChunk::Idle => None,
            DeletionChunk::Open(chunk) => Some(deletion_sample(&chunk, now)),
        }
    }

    /// Merge a removed span into the run, or close the run and start another.
    ///
    /// `preceding`/`subsequent` are the previous snapshot's text around the
    /// removed span. They seed the context only when the buffer is idle; a
    /// detached removal restarts the run but keeps the earlier context.
    pub fn absorb(
        &mut self,
        removed: &str,
        adjacency: Adjacency,
        preceding: &str,
        subsequent: &str,
        now: i64,
    ) -> Option<Sample> {
        if let DeletionChunk::Open(chunk) = self {
            match adjacency {
                Adjacency::After => {
                    chunk.text.push_str(removed);
                    return None;
                }
                Adjacency::Before => {
                    chunk.text.insert_str(0, removed);
                    return None;
                }
                Adjacency::Detached => {
                    let sample = deletion_sample(chunk, now);
                    chunk.text = removed.to_string();
                    chunk.started_ms = now;
                    return Some(sample);
                }
            }
        }

        *self = DeletionChunk::Open(OpenChunk {
            text: removed.to_string(),
            started_ms: now,
            preceding: preceding.to_string(),
            subsequent: subsequent.to_string(),
        });
        None
    }
}

fn deletion_sample(chunk: &OpenChunk, now: i64) -> Sample {
    Sample::Deletion {
        words: WordCounter::count_deleted_words(&chunk.text, &chunk.preceding, &chunk.subsequent),
        duration_ms: now.saturating_sub(chunk.started_ms),
    }
}
