//! Extraction configuration
//!
//! Both structs deserialize from partial JSON; missing fields take defaults.

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Gap between two events that ends a typing burst
pub const DEFAULT_LONG_PAUSE_MS: i64 = 2000;

/// What to do with an event whose snapshot equals the previous one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SameSnapshotPolicy {
    /// Fail the record with an unsupported-operation error
    #[default]
    Reject,
    /// Ignore the event; it still counts as the previous event for timing
    Skip,
}

/// Per-record extraction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Minimum gap (ms) between events that closes an insertion chunk
    pub long_pause_ms: i64,
    /// Handling of unchanged snapshots
    pub same_snapshot: SameSnapshotPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            long_pause_ms: DEFAULT_LONG_PAUSE_MS,
            same_snapshot: SameSnapshotPolicy::default(),
        }
    }
}

/// Individual values that replace those of a loaded config
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub long_pause_ms: Option<i64>,
    pub same_snapshot: Option<SameSnapshotPolicy>,
    /// Added to the configured prefixes
    pub skip_user_prefixes: Vec<String>,
}

/// Settings for a batch run over stored records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub extractor: ExtractorConfig,
    /// Records whose user name starts with one of these are skipped
    pub skip_user_prefixes: Vec<String>,
}

impl BatchConfig {
    pub fn from_json(json: &str) -> Result<Self, ExtractError> {
        serde_json::from_str(json)
            .map_err(|e| ExtractError::ParseError(format!("Failed to parse config: {}", e)))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Apply command-line style overrides on top of this config
    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(ms) = overrides.long_pause_ms {
            self.extractor.long_pause_ms = ms;
        }
        if let Some(policy) = overrides.same_snapshot {
            self.extractor.same_snapshot = policy;
        }
        for prefix in overrides.skip_user_prefixes {
            if !self.skip_user_prefixes.contains(&prefix) {
                self.skip_user_prefixes.push(prefix);
            }
        }
        self
    }

    /// Whether records by `user` are excluded from the batch
    pub fn skips_user(&self, user: Option<&str>) -> bool {
        match user {
            Some(name) => self
                .skip_user_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str())),
            None => false,
        }
    }
}
