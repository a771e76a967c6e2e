use std::path::PathBuf;
use thiserror::Error;

use crate::ir::EntityKind;
use crate::validation::ValidationReport;

/// The main error type for cocomerge operations.
#[derive(Debug, Error)]
pub enum CocomergeError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse COCO JSON from {path}: {source}")]
    CocoJsonParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write COCO JSON to {path}: {source}")]
    CocoJsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write id map to {path}: {source}")]
    IdMapWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A source record was processed twice under the same key.
    #[error("Duplicate mapping: {kind} {old_id} from source '{source_key}' was already mapped")]
    DuplicateMapping {
        kind: EntityKind,
        source_key: String,
        old_id: u64,
    },

    /// A record references a dependency that was never mapped for its source.
    #[error("Unresolved reference: no {kind} {old_id} mapped for source '{source_key}'")]
    UnresolvedReference {
        kind: EntityKind,
        source_key: String,
        old_id: u64,
    },

    /// Two records share a dedup key but disagree on their other fields.
    #[error(
        "Conflicting {kind}: {old_id} from source '{source_key}' matches existing {kind} {existing_id} but differs in {detail}"
    )]
    ConflictingRecord {
        kind: EntityKind,
        source_key: String,
        old_id: u64,
        existing_id: u64,
        detail: String,
    },

    #[error("Invalid split ratios: {message}")]
    InvalidRatio { message: String },

    #[error("Duplicate source key '{0}': every merge source needs its own key")]
    DuplicateSourceKey(String),

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
