//! Writing feature pipeline orchestration
//!
//! This module provides the public API for feature extraction: a stateless
//! one-shot over JSON, a stateful extractor that keeps counts across records,
//! and a batch driver over stored rows that isolates per-record failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::{BatchConfig, ExtractorConfig};
use crate::error::ExtractError;
use crate::writing::accumulator;
use crate::writing::adapter::{
    capture_to_record, parse_capture_log, parse_record, stored_to_record, StoredRecord,
};
use crate::writing::types::{FeatureSet, WritingRecord};

/// Extract features from a canonical record
pub fn extract_features(
    record: &WritingRecord,
    config: &ExtractorConfig,
) -> Result<FeatureSet, ExtractError> {
    log::debug!("Extracting features from {} events", record.events.len());
    accumulator::extract(record, config)
}

/// Convert a canonical record JSON to feature set JSON (stateless, one-shot).
///
/// # Example
/// ```ignore
/// let features_json = record_to_features(record_json)?;
/// ```
pub fn record_to_features(record_json: String) -> Result<String, ExtractError> {
    let record = parse_record(&record_json)?;
    let features = extract_features(&record, &ExtractorConfig::default())?;
    Ok(serde_json::to_string(&features)?)
}

/// Convert a capture log plus its article and score to feature set JSON
pub fn capture_to_features(
    capture_json: &str,
    article: &str,
    score: i64,
) -> Result<String, ExtractError> {
    let log = parse_capture_log(capture_json)?;
    let record = capture_to_record(log, article, score);
    let features = extract_features(&record, &ExtractorConfig::default())?;
    Ok(serde_json::to_string(&features)?)
}

/// Stateful extractor that keeps its configuration and running counts.
pub struct FeatureExtractor {
    config: ExtractorConfig,
    extracted: usize,
    failed: usize,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    /// Create an extractor with default settings (2000 ms long pause)
    pub fn new() -> Self {
        Self::with_config(ExtractorConfig::default())
    }

    pub fn with_config(config: ExtractorConfig) -> Self {
        Self {
            config,
            extracted: 0,
            failed: 0,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract features from a record, counting the outcome
    pub fn extract(&mut self, record: &WritingRecord) -> Result<FeatureSet, ExtractError> {
        match extract_features(record, &self.config) {
            Ok(features) => {
                self.extracted += 1;
                Ok(features)
            }
            Err(e) => {
                self.failed += 1;
                Err(e)
            }
        }
    }

    /// Process a canonical record JSON and return feature set JSON
    pub fn process(&mut self, record_json: &str) -> Result<String, ExtractError> {
        let record = parse_record(record_json)?;
        let features = self.extract(&record)?;
        Ok(serde_json::to_string(&features)?)
    }

    /// Number of records extracted successfully
    pub fn extracted_count(&self) -> usize {
        self.extracted
    }

    /// Number of records that failed extraction
    pub fn failed_count(&self) -> usize {
        self.failed
    }
}

/// A record that could not be extracted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub record_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_index: Option<usize>,
    pub message: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Unique identifier of this run
    pub run_id: Uuid,
    /// When the run finished
    pub computed_at: DateTime<Utc>,
    pub producer: String,
    pub version: String,
    /// Rows seen, including skipped ones
    pub total: usize,
    pub extracted: usize,
    pub failed: usize,
    /// Rows excluded by user prefix or without a capture log
    pub skipped: usize,
    /// Features keyed by record id
    pub features: BTreeMap<String, FeatureSet>,
    pub failures: Vec<RecordFailure>,
}

/// Batch driver over stored rows
pub struct BatchExtractor {
    config: BatchConfig,
}

impl Default for BatchExtractor {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}

impl BatchExtractor {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    /// Extract every row. A failing row is logged and reported, never fatal.
    pub fn run(&self, rows: &[StoredRecord]) -> BatchReport {
        let mut extractor = FeatureExtractor::with_config(self.config.extractor.clone());
        let mut features = BTreeMap::new();
        let mut failures = Vec::new();
        let mut skipped = 0;

        for row in rows {
            if self.config.skips_user(row.user.as_deref()) {
                log::debug!("Skipping record {} (excluded user)", row.record_id);
                skipped += 1;
                continue;
            }

            let record = match stored_to_record(row) {
                Ok(Some(record)) => record,
                Ok(None) => {
                    log::debug!("Skipping record {} (no capture log)", row.record_id);
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    log::warn!("Record {}: {}", row.record_id, e);
                    failures.push(RecordFailure {
                        record_id: row.record_id.clone(),
                        event_index: None,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            match extractor.extract(&record) {
                Ok(set) => {
                    features.insert(row.record_id.clone(), set);
                }
                Err(e) => {
                    log::warn!(
                        "Record {} failed at event {}: {}",
                        row.record_id,
                        e.event_index()
                            .map_or_else(|| "-".to_string(), |i| i.to_string()),
                        e
                    );
                    failures.push(RecordFailure {
                        record_id: row.record_id.clone(),
                        event_index: e.event_index(),
                        message: e.to_string(),
                    });
                }
            }
        }

        log::info!(
            "Batch finished: {} extracted, {} failed, {} skipped",
            features.len(),
            failures.len(),
            skipped
        );

        BatchReport {
            run_id: Uuid::new_v4(),
            computed_at: Utc::now(),
            producer: crate::PRODUCER_NAME.to_string(),
            version: crate::FLUX_VERSION.to_string(),
            total: rows.len(),
            extracted: features.len(),
            failed: failures.len(),
            skipped,
            features,
            failures,
        }
    }
}
