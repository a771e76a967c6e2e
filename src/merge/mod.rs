//! Merging several annotation collections into one.
//!
//! Sources are ingested strictly in the order given. Within each source all
//! licenses are processed first, then categories, then images, then
//! annotations, so every reference can be resolved through the registry at
//! the moment its record is appended. New ids therefore depend only on the
//! source order and the order of records inside each source.
//!
//! Any mapping error aborts the merge and no partial output is returned.

mod report;

pub use report::{MergeReport, RecordCounts, SourceSummary};

use std::collections::HashSet;

use log::info;

use crate::error::CocomergeError;
use crate::ir::{Dataset, DatasetInfo};
use crate::remap::{ConflictPolicy, MapperRegistry, RecordBuffer};

/// One input collection together with the key that distinguishes its ids.
#[derive(Clone, Debug)]
pub struct MergeSource {
    /// Unique label for this source, e.g. its file path.
    pub key: String,
    pub dataset: Dataset,
}

impl MergeSource {
    pub fn new(key: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            key: key.into(),
            dataset,
        }
    }
}

/// Merge options.
#[derive(Clone, Debug, Default)]
pub struct MergeOptions {
    /// How to treat categories that share a key but differ in schema.
    pub conflict_policy: ConflictPolicy,
    /// `info` block of the output. Defaults to the first source's.
    pub info: Option<DatasetInfo>,
}

/// Result of a merge.
#[derive(Clone, Debug)]
pub struct MergeOutput {
    pub dataset: Dataset,
    /// Provenance: which source record produced each new id.
    pub registry: MapperRegistry,
    pub report: MergeReport,
}

/// Merges `sources` into a single consistent collection.
///
/// # Errors
/// - [`CocomergeError::DuplicateSourceKey`] if two sources share a key
///   (checked before anything is processed).
/// - [`CocomergeError::UnresolvedReference`] if a record references an id
///   its source never defined.
/// - [`CocomergeError::DuplicateMapping`] if a source defines the same id
///   twice for one record kind.
/// - [`CocomergeError::ConflictingRecord`] on a category schema conflict
///   under [`ConflictPolicy::Reject`].
pub fn merge_datasets(
    sources: &[MergeSource],
    opts: &MergeOptions,
) -> Result<MergeOutput, CocomergeError> {
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.key.as_str()) {
            return Err(CocomergeError::DuplicateSourceKey(source.key.clone()));
        }
    }

    let mut buffer = RecordBuffer::new(opts.conflict_policy);
    let info = opts
        .info
        .clone()
        .or_else(|| sources.first().map(|s| s.dataset.info.clone()))
        .unwrap_or_default();
    buffer.set_info(info);

    let mut report = MergeReport::default();

    for source in sources {
        let input = RecordCounts::of(&source.dataset);
        info!("Merging '{}': {}", source.key, input);

        let before = buffer.reused();
        ingest(&mut buffer, source)?;
        let after = buffer.reused();

        report.sources.push(SourceSummary {
            key: source.key.clone(),
            input,
            reused_licenses: after.licenses - before.licenses,
            reused_categories: after.categories - before.categories,
        });
    }

    let (dataset, registry) = buffer.finish();
    report.output = RecordCounts::of(&dataset);
    info!("Merge complete: {}", report.output);

    Ok(MergeOutput {
        dataset,
        registry,
        report,
    })
}

fn ingest(buffer: &mut RecordBuffer, source: &MergeSource) -> Result<(), CocomergeError> {
    let key = source.key.as_str();
    let dataset = &source.dataset;

    for license in &dataset.licenses {
        buffer.process_license(license, key)?;
    }
    for category in &dataset.categories {
        buffer.process_category(category, key)?;
    }
    for image in &dataset.images {
        buffer.process_image(image, key)?;
    }
    for annotation in &dataset.annotations {
        buffer.process_annotation(annotation, key)?;
    }
    Ok(())
}
