//! Writing Flux - keystroke-log analysis engine
//!
//! Flux turns the snapshot stream captured while an essay is typed into a
//! fixed set of writing-process features through a deterministic pipeline:
//! record adaptation → edit reconstruction → classification → accumulation.
//!
//! ## Modules
//!
//! - **Writing**: edit reconstruction, pause/chunk/jump accumulation and batch extraction
//! - **Config**: extraction and batch settings

pub mod config;
pub mod error;
pub mod writing;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{BatchConfig, ConfigOverrides, ExtractorConfig, SameSnapshotPolicy};
pub use error::{EditError, ExtractError};
pub use writing::{
    capture_to_features, extract_features, record_to_features, BatchExtractor, FeatureExtractor,
    FeatureSet, WritingRecord,
};

/// Flux version embedded in batch reports
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for batch reports
pub const PRODUCER_NAME: &str = "writing-flux";
