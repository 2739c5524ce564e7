//! Capture log adapter
//!
//! Parses records as stored by the browser capture page and converts them to
//! canonical [`WritingRecord`]s.

use serde::{Deserialize, Serialize};

use crate::config::{ExtractorConfig, SameSnapshotPolicy};
use crate::error::{EditError, ExtractError};
use crate::writing::classify::OperationClassifier;
use crate::writing::diff::EditionDiffer;
use crate::writing::types::{KeystrokeEvent, Operation, WritingRecord, UNSCORED};

/// One entry of the capture page's `sequences` list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureEntry {
    /// Event time (ms since epoch)
    pub time: i64,
    /// Textarea content after the event
    pub article: String,
    #[serde(default)]
    pub input_type: String,
    #[serde(default)]
    pub data: Option<String>,
    /// Selection bounds before the event, -1 when none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select_end: Option<i64>,
    /// Caret reported by the browser. Unreliable; the engine derives its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
}

/// The JSON document the capture page submits with an article
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureLog {
    pub start_time: i64,
    #[serde(default)]
    pub sequences: Vec<CaptureEntry>,
    pub submit_time: i64,
}

/// Capture log embedded in a stored row, either as a JSON string or inline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddedLog {
    Inline(CaptureLog),
    Encoded(String),
}

/// A stored writing record row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    pub record_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub article: String,
    #[serde(default = "unscored")]
    pub score: i64,
    /// Capture log; absent or empty when nothing was recorded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<EmbeddedLog>,
}

fn unscored() -> i64 {
    UNSCORED
}

/// An event whose timestamp goes backwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderViolation {
    pub index: usize,
    pub timestamp_ms: i64,
    pub previous_ms: i64,
}

/// Parse a capture log JSON document
pub fn parse_capture_log(json: &str) -> Result<CaptureLog, ExtractError> {
    serde_json::from_str(json)
        .map_err(|e| ExtractError::ParseError(format!("Failed to parse capture log: {}", e)))
}

/// Parse a canonical writing record JSON document
pub fn parse_record(json: &str) -> Result<WritingRecord, ExtractError> {
    serde_json::from_str(json)
        .map_err(|e| ExtractError::ParseError(format!("Failed to parse writing record: {}", e)))
}

/// Parse a stored row
pub fn parse_stored(json: &str) -> Result<StoredRecord, ExtractError> {
    serde_json::from_str(json)
        .map_err(|e| ExtractError::ParseError(format!("Failed to parse stored record: {}", e)))
}

/// Parse newline-delimited stored rows, ignoring blank lines
pub fn parse_stored_ndjson(input: &str) -> Result<Vec<StoredRecord>, ExtractError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            parse_stored(line.trim()).map_err(|e| {
                ExtractError::ParseError(format!("line {}: {}", n + 1, e))
            })
        })
        .collect()
}

/// Parse a JSON array of stored rows
pub fn parse_stored_array(input: &str) -> Result<Vec<StoredRecord>, ExtractError> {
    serde_json::from_str(input)
        .map_err(|e| ExtractError::ParseError(format!("Failed to parse stored records: {}", e)))
}

/// Combine a capture log with the submitted article and its score
pub fn capture_to_record(log: CaptureLog, article: &str, score: i64) -> WritingRecord {
    WritingRecord {
        final_text: article.to_string(),
        score,
        session_start_ms: log.start_time,
        submit_ms: log.submit_time,
        events: log
            .sequences
            .into_iter()
            .map(|entry| KeystrokeEvent {
                timestamp_ms: entry.time,
                snapshot: entry.article,
                input_type: entry.input_type,
                data: entry.data,
            })
            .collect(),
    }
}

/// Convert a stored row. `Ok(None)` when the row carries no capture log.
pub fn stored_to_record(stored: &StoredRecord) -> Result<Option<WritingRecord>, ExtractError> {
    let log = match &stored.record {
        None => return Ok(None),
        Some(EmbeddedLog::Encoded(json)) if json.trim().is_empty() => return Ok(None),
        Some(EmbeddedLog::Encoded(json)) => parse_capture_log(json)?,
        Some(EmbeddedLog::Inline(log)) => log.clone(),
    };
    Ok(Some(capture_to_record(log, &stored.article, stored.score)))
}

/// Report events that break the ascending-timestamp precondition
pub fn check_order(record: &WritingRecord) -> Vec<OrderViolation> {
    record
        .events
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[1].timestamp_ms < pair[0].timestamp_ms)
        .map(|(i, pair)| OrderViolation {
            index: i + 1,
            timestamp_ms: pair[1].timestamp_ms,
            previous_ms: pair[0].timestamp_ms,
        })
        .collect()
}

/// Check every precondition and every edit of a record without aggregating.
///
/// Returns all problems found rather than stopping at the first. Unchanged
/// snapshots are problems unless `config` skips them.
pub fn validate_record(record: &WritingRecord, config: &ExtractorConfig) -> Vec<String> {
    let mut problems: Vec<String> = check_order(record)
        .iter()
        .map(|v| {
            format!(
                "event {} at {} ms precedes previous event at {} ms",
                v.index, v.timestamp_ms, v.previous_ms
            )
        })
        .collect();

    if let Some(first) = record.events.first() {
        if first.timestamp_ms < record.session_start_ms {
            problems.push("first event precedes session start".to_string());
        }
    }
    if let Some(last) = record.events.last() {
        if record.submit_ms < last.timestamp_ms {
            problems.push("submit time precedes last event".to_string());
        }
    }

    let mut prev: Vec<char> = Vec::new();
    for (index, event) in record.events.iter().enumerate() {
        let cur: Vec<char> = event.snapshot.chars().collect();
        let edit = EditionDiffer::diff(&prev, &cur).and_then(|range| {
            let class = OperationClassifier::classify(&range)?;
            match (class.operation, config.same_snapshot) {
                (Operation::Same, SameSnapshotPolicy::Reject) => {
                    Err(EditError::Unsupported(range))
                }
                _ => Ok(class),
            }
        });
        if let Err(e) = edit {
            problems.push(e.at_event(index).to_string());
        }
        prev = cur;
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_capture_json() -> &'static str {
        r#"{
            "startTime": 1000,
            "sequences": [
                {"selectStart": -1, "selectEnd": -1, "position": 0, "data": "H",
                 "inputType": "insertText", "time": 4000, "article": "H"},
                {"selectStart": -1, "selectEnd": -1, "position": 1, "data": "i",
                 "inputType": "insertText", "time": 4200, "article": "Hi"}
            ],
            "submitTime": 9000
        }"#
    }

    #[test]
    fn test_parse_capture_log() {
        let log = parse_capture_log(sample_capture_json()).unwrap();
        assert_eq!(log.start_time, 1000);
        assert_eq!(log.submit_time, 9000);
        assert_eq!(log.sequences.len(), 2);
        assert_eq!(log.sequences[1].input_type, "insertText");
        assert_eq!(log.sequences[1].select_start, Some(-1));
    }

    #[test]
    fn test_stored_row_with_encoded_log() {
        let row = StoredRecord {
            record_id: "29".to_string(),
            user: Some("alice".to_string()),
            article: "Hi".to_string(),
            score: 5,
            record: Some(EmbeddedLog::Encoded(sample_capture_json().to_string())),
        };

        let record = stored_to_record(&row).unwrap().unwrap();
        assert_eq!(record.final_text, "Hi");
        assert_eq!(record.score, 5);
        assert_eq!(record.session_start_ms, 1000);
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[1].snapshot, "Hi");
    }

    #[test]
    fn test_stored_row_json_forms() {
        let encoded = serde_json::json!({
            "record_id": "1",
            "article": "Hi",
            "record": sample_capture_json()
        })
        .to_string();
        let row = parse_stored(&encoded).unwrap();
        assert_eq!(row.score, UNSCORED);
        assert!(stored_to_record(&row).unwrap().is_some());

        let inline = format!(
            r#"{{"record_id": "2", "article": "Hi", "record": {}}}"#,
            sample_capture_json()
        );
        let row = parse_stored(&inline).unwrap();
        assert!(matches!(row.record, Some(EmbeddedLog::Inline(_))));
    }

    #[test]
    fn test_stored_row_without_log() {
        let row = parse_stored(r#"{"record_id": "3", "article": "x", "record": ""}"#).unwrap();
        assert!(stored_to_record(&row).unwrap().is_none());

        let row = parse_stored(r#"{"record_id": "4", "article": "x"}"#).unwrap();
        assert!(stored_to_record(&row).unwrap().is_none());
    }

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let input = "{\"record_id\": \"a\", \"article\": \"\"}\n\n{\"record_id\": \"b\", \"article\": \"\"}\n";
        let rows = parse_stored_ndjson(input).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].record_id, "b");

        assert!(parse_stored_ndjson("{\"record_id\": 1\n").is_err());
    }

    #[test]
    fn test_check_order() {
        let record = WritingRecord {
            final_text: "ab".to_string(),
            score: 0,
            session_start_ms: 0,
            submit_ms: 100,
            events: vec![
                KeystrokeEvent::new(50, "a"),
                KeystrokeEvent::new(40, "ab"),
            ],
        };
        let violations = check_order(&record);
        assert_eq!(
            violations,
            vec![OrderViolation {
                index: 1,
                timestamp_ms: 40,
                previous_ms: 50
            }]
        );
    }

    #[test]
    fn test_validate_record_collects_all_problems() {
        let record = WritingRecord {
            final_text: "ab".to_string(),
            score: 0,
            session_start_ms: 100,
            submit_ms: 10,
            events: vec![
                KeystrokeEvent::new(50, "a"),
                KeystrokeEvent::new(60, "a pasted"),
            ],
        };
        let problems = validate_record(&record, &ExtractorConfig::default());
        assert_eq!(problems.len(), 3);
        assert!(problems[2].contains("event 1"));
    }

    #[test]
    fn test_validate_record_follows_same_snapshot_policy() {
        let record = WritingRecord {
            final_text: "ab".to_string(),
            score: 0,
            session_start_ms: 0,
            submit_ms: 300,
            events: vec![
                KeystrokeEvent::new(0, "a"),
                KeystrokeEvent::new(100, "a"),
                KeystrokeEvent::new(200, "ab"),
            ],
        };

        let problems = validate_record(&record, &ExtractorConfig::default());
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("Unsupported operation at event 1"));

        let skip = ExtractorConfig {
            same_snapshot: SameSnapshotPolicy::Skip,
            ..ExtractorConfig::default()
        };
        assert!(validate_record(&record, &skip).is_empty());
    }
}
