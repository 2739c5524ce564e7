//! Keystroke-log feature extraction
//!
//! This module reconstructs the edit behind every captured snapshot of a
//! document and derives writing-process features from the edit stream:
//! pauses by category, typing and deleting chunks, and caret jumps.
//!
//! Pipeline: Record JSON → Adapter → (Differ, Classifier) per event → Accumulator → FeatureSet

pub mod accumulator;
pub mod adapter;
pub mod chunk;
pub mod classify;
pub mod diff;
pub mod pause;
pub mod pipeline;
pub mod types;
pub mod words;

pub use accumulator::{AccumulatorState, FeatureAccumulator, Step};
pub use classify::OperationClassifier;
pub use diff::EditionDiffer;
pub use pipeline::{
    capture_to_features, extract_features, record_to_features, BatchExtractor, BatchReport,
    FeatureExtractor, RecordFailure,
};
pub use types::{
    Classification, DiffRange, FeatureSet, KeystrokeEvent, Operation, Sample, WritingRecord,
};
pub use words::WordCounter;
