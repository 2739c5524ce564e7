//! Error types for Writing Flux

use thiserror::Error;

use crate::writing::types::DiffRange;

/// Errors that can occur during feature extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed diff at event {index}: {reason}")]
    MalformedDiff { index: usize, reason: String },

    #[error("Unsupported operation at event {index}: {range}")]
    UnsupportedOperation { index: usize, range: DiffRange },
}

impl ExtractError {
    /// Index of the event that aborted extraction, if the failure is tied to one
    pub fn event_index(&self) -> Option<usize> {
        match self {
            ExtractError::MalformedDiff { index, .. }
            | ExtractError::UnsupportedOperation { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failure of a single edit reconstruction, before it is tied to an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{0}")]
    Malformed(String),

    #[error("no operation matches range {0}")]
    Unsupported(DiffRange),
}

impl EditError {
    /// Attach the index of the event being processed
    pub fn at_event(self, index: usize) -> ExtractError {
        match self {
            EditError::Malformed(reason) => ExtractError::MalformedDiff { index, reason },
            EditError::Unsupported(range) => ExtractError::UnsupportedOperation { index, range },
        }
    }
}
