//! Writing record data types
//!
//! This module defines the keystroke records that enter the engine, the edit
//! shapes reconstructed between snapshots, and the feature set it emits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Score assigned to records that have not been graded
pub const UNSCORED: i64 = -1;

/// One captured input event: the whole document text right after a keystroke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystrokeEvent {
    /// Capture time in milliseconds since the Unix epoch
    #[serde(alias = "timestampMs")]
    pub timestamp_ms: i64,
    /// Full document text after the event
    #[serde(alias = "snapshotText")]
    pub snapshot: String,
    /// Browser input type tag (e.g. `insertText`, `deleteContentBackward`)
    #[serde(default, alias = "inputTypeTag")]
    pub input_type: String,
    /// Raw event data as reported by the editor, if any
    #[serde(default, alias = "rawData", skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl KeystrokeEvent {
    pub fn new(timestamp_ms: i64, snapshot: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            snapshot: snapshot.into(),
            input_type: String::new(),
            data: None,
        }
    }
}

/// A complete writing record: final text, grade, session bounds and keystrokes.
///
/// Events must be sorted by `timestamp_ms` ascending. Extraction does not
/// re-sort them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritingRecord {
    /// Submitted article text
    #[serde(alias = "finalArticleText", alias = "article")]
    pub final_text: String,
    /// Externally assigned score
    #[serde(default = "default_score")]
    pub score: i64,
    /// When the writing session was opened (ms since epoch)
    #[serde(alias = "sessionStartTimestampMs")]
    pub session_start_ms: i64,
    /// When the article was submitted (ms since epoch)
    #[serde(alias = "submitTimestampMs")]
    pub submit_ms: i64,
    /// Ordered keystroke events
    #[serde(default)]
    pub events: Vec<KeystrokeEvent>,
}

fn default_score() -> i64 {
    UNSCORED
}

/// Edit range between two snapshots, in character offsets.
///
/// `prev[..s1] == cur[..s2]` and `prev[e1..] == cur[e2..]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRange {
    pub s1: usize,
    pub e1: usize,
    pub s2: usize,
    pub e2: usize,
}

impl DiffRange {
    pub const fn new(s1: usize, e1: usize, s2: usize, e2: usize) -> Self {
        Self { s1, e1, s2, e2 }
    }

    /// Number of characters removed from the previous snapshot
    pub fn removed_len(&self) -> usize {
        self.e1.saturating_sub(self.s1)
    }

    /// Number of characters added to the current snapshot
    pub fn inserted_len(&self) -> usize {
        self.e2.saturating_sub(self.s2)
    }

    /// Caret position after the edit: index of the last touched character in
    /// the current snapshot, `-1` when a prefix was deleted.
    pub fn caret(&self) -> isize {
        self.e2 as isize - 1
    }
}

impl fmt::Display for DiffRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.s1, self.e1, self.s2, self.e2)
    }
}

/// Kind of edit reconstructed from a diff range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Same,
    Insert,
    Delete,
}

/// Operation plus whether it replaced or removed a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub operation: Operation,
    pub has_selection: bool,
}

/// A measurement emitted by a single accumulator transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    WithinWordPause(i64),
    BetweenWordPause(i64),
    BetweenSentencePause(i64),
    BetweenParagraphPause(i64),
    Deletion { words: usize, duration_ms: i64 },
    InsertionChunk { words: usize, duration_ms: i64 },
    Jump { words: usize, elapsed_ms: i64 },
}

/// Writing-process features extracted from one record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Externally supplied score
    pub score: i64,
    /// Submit time minus first event time, `None` without events
    pub total_time_ms: Option<i64>,
    /// First event time minus session start, `None` without events
    pub planning_time_ms: Option<i64>,
    /// Words in the submitted article
    pub word_count: usize,
    pub within_word_pauses: Vec<i64>,
    pub between_word_pauses: Vec<i64>,
    pub between_sentence_pauses: Vec<i64>,
    pub between_paragraph_pauses: Vec<i64>,
    /// Words removed per deletion chunk
    pub deletion_lengths: Vec<usize>,
    /// Duration of each deletion chunk, parallel to `deletion_lengths`
    pub deletion_times: Vec<i64>,
    pub insertion_chunk_count: usize,
    /// Words typed per insertion chunk
    pub insertion_chunk_lengths: Vec<usize>,
    /// Duration of each insertion chunk, parallel to `insertion_chunk_lengths`
    pub insertion_chunk_times: Vec<i64>,
    pub jump_count: usize,
    /// Elapsed time before each jump
    pub jump_times: Vec<i64>,
    /// Words skipped by each jump, parallel to `jump_times`
    pub jump_lengths: Vec<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accepts_camel_case_aliases() {
        let json = r#"{
            "finalArticleText": "Hi",
            "score": 4,
            "sessionStartTimestampMs": 1000,
            "submitTimestampMs": 9000,
            "events": [
                {"timestampMs": 2000, "snapshotText": "H", "inputTypeTag": "insertText", "rawData": "H"}
            ]
        }"#;

        let record: WritingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.final_text, "Hi");
        assert_eq!(record.score, 4);
        assert_eq!(record.events[0].snapshot, "H");
        assert_eq!(record.events[0].data.as_deref(), Some("H"));
    }

    #[test]
    fn test_record_defaults() {
        let json = r#"{
            "final_text": "",
            "session_start_ms": 0,
            "submit_ms": 10
        }"#;

        let record: WritingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.score, UNSCORED);
        assert!(record.events.is_empty());
    }

    #[test]
    fn test_feature_set_serializes_null_times() {
        let features = FeatureSet::default();
        let value = serde_json::to_value(&features).unwrap();
        assert!(value["total_time_ms"].is_null());
        assert!(value["planning_time_ms"].is_null());
        assert_eq!(value["jump_count"], 0);
    }

    #[test]
    fn test_caret_after_prefix_deletion() {
        assert_eq!(DiffRange::new(0, 1, 0, 0).caret(), -1);
        assert_eq!(DiffRange::new(3, 3, 3, 4).caret(), 3);
    }
}
