//! Partitioning one collection into named subsets (train/val/test, ...).
//!
//! The partition is over **images**: an image and all of its annotations
//! always land in the same subset. Each subset is rebuilt through a fresh
//! [`RecordBuffer`] with the parent as its single source, so it comes out
//! renumbered from 0 and internally consistent. Licenses and categories are
//! not filtered: every subset carries the parent's full set, which keeps
//! category ids identical across subsets.

mod report;

pub use report::{SplitReport, SubsetSummary};

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path};

use log::info;
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, SeedableRng};

use crate::error::CocomergeError;
use crate::ir::{Dataset, EntityKind, ImageId, RecordId};
use crate::merge::RecordCounts;
use crate::remap::{ConflictPolicy, MapperRegistry, RecordBuffer};

/// A named subset and its relative weight.
#[derive(Clone, Debug, PartialEq)]
pub struct SubsetSpec {
    pub name: String,
    pub ratio: f64,
}

impl SubsetSpec {
    pub fn new(name: impl Into<String>, ratio: f64) -> Self {
        Self {
            name: name.into(),
            ratio,
        }
    }
}

/// Parses `name=ratio`, e.g. `train=0.8`.
pub fn parse_subset_spec(s: &str) -> Result<SubsetSpec, String> {
    let (name, ratio) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=RATIO, got '{s}'"))?;
    let ratio: f64 = ratio
        .trim()
        .parse()
        .map_err(|_| format!("ratio '{}' is not a number", ratio.trim()))?;
    let name = name.trim();
    check_subset_name(name)?;
    Ok(SubsetSpec::new(name, ratio))
}

/// Order in which images are dealt into subsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitOrder {
    /// Parent image order.
    AsGiven,
    /// Parent image order shuffled with a seeded RNG.
    Seeded(u64),
}

/// Split options.
#[derive(Clone, Debug)]
pub struct SplitOptions {
    /// Source key under which the parent's ids are mapped.
    pub parent_key: String,
    pub subsets: Vec<SubsetSpec>,
    pub order: SplitOrder,
    pub conflict_policy: ConflictPolicy,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            parent_key: "parent".to_string(),
            subsets: vec![
                SubsetSpec::new("train", 0.8),
                SubsetSpec::new("val", 0.1),
                SubsetSpec::new("test", 0.1),
            ],
            order: SplitOrder::Seeded(42),
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

/// One renumbered subset.
#[derive(Clone, Debug)]
pub struct Subset {
    pub name: String,
    pub dataset: Dataset,
    /// Parent id -> subset id for every record the subset contains.
    pub registry: MapperRegistry,
}

/// Result of a split.
#[derive(Clone, Debug)]
pub struct SplitOutput {
    /// Subsets in the order they were requested.
    pub subsets: Vec<Subset>,
    pub report: SplitReport,
}

impl SplitOutput {
    /// Looks up a subset by name.
    pub fn get(&self, name: &str) -> Option<&Subset> {
        self.subsets.iter().find(|s| s.name == name)
    }
}

/// Validate split options before running.
///
/// Subset names become file names, so each must be a single plain path
/// component (no separators, no `.` or `..`).
pub fn validate_split_options(opts: &SplitOptions) -> Result<(), CocomergeError> {
    let invalid = |message: String| Err(CocomergeError::InvalidRatio { message });

    if opts.subsets.is_empty() {
        return invalid("at least one subset is required".to_string());
    }

    let mut names = HashSet::new();
    for spec in &opts.subsets {
        check_subset_name(&spec.name).map_err(CocomergeError::InvalidArgument)?;
        if !names.insert(spec.name.as_str()) {
            return Err(CocomergeError::InvalidArgument(format!(
                "subset '{}' is listed twice",
                spec.name
            )));
        }
        if !spec.ratio.is_finite() || spec.ratio < 0.0 {
            return invalid(format!(
                "subset '{}' has ratio {}; ratios must be finite and non-negative",
                spec.name, spec.ratio
            ));
        }
    }

    let sum: f64 = opts.subsets.iter().map(|s| s.ratio).sum();
    if sum <= 0.0 {
        return invalid("ratios sum to zero".to_string());
    }
    if !sum.is_finite() {
        return invalid("ratios are too large to sum".to_string());
    }

    Ok(())
}

fn check_subset_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("subset names must not be empty".to_string());
    }
    let mut components = Path::new(name).components();
    let single_normal = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none();
    if !single_normal || name.contains(&['/', '\\'][..]) || name.contains("..") {
        return Err(format!(
            "subset name '{name}' must be a plain file name without path separators or '..'"
        ));
    }
    Ok(())
}

/// Number of images per subset.
///
/// Each subset gets `round(ratio / sum * total)` images. Whatever rounding
/// leaves over goes to the first subset with a non-zero ratio. If rounding
/// overshoots, the excess is taken from the last subsets first, so the
/// front of the list keeps its share: `partition_sizes(2, &[1.0; 4])` is
/// `[1, 1, 0, 0]`. Zero-ratio subsets always stay empty and the result
/// always sums to `total`.
///
/// Expects ratios that passed [`validate_split_options`].
pub fn partition_sizes(total: usize, ratios: &[f64]) -> Vec<usize> {
    let sum: f64 = ratios.iter().sum();
    let mut sizes: Vec<usize> = ratios
        .iter()
        .map(|r| (r / sum * total as f64).round() as usize)
        .collect();

    let assigned: usize = sizes.iter().sum();

    if assigned < total {
        let first = ratios.iter().position(|r| *r > 0.0).unwrap_or(0);
        if let Some(size) = sizes.get_mut(first) {
            *size += total - assigned;
        }
    } else {
        let mut excess = assigned - total;
        for size in sizes.iter_mut().rev() {
            if excess == 0 {
                break;
            }
            let take = excess.min(*size);
            *size -= take;
            excess -= take;
        }
    }

    sizes
}

/// Splits `parent` into the subsets named in `opts`.
///
/// # Errors
/// - [`CocomergeError::InvalidRatio`] for an invalid subset list, before any
///   processing.
/// - [`CocomergeError::InvalidArgument`] for a subset name that is empty,
///   repeated or not a plain file name.
/// - [`CocomergeError::DuplicateMapping`] if the parent repeats an image or
///   annotation id.
/// - [`CocomergeError::UnresolvedReference`] if a parent annotation points at
///   an image, category or license the parent does not define.
pub fn split_dataset(parent: &Dataset, opts: &SplitOptions) -> Result<SplitOutput, CocomergeError> {
    validate_split_options(opts)?;

    let image_ids = unique_parent_ids(parent.images.iter().map(|img| img.id), &opts.parent_key)?;
    unique_parent_ids(parent.annotations.iter().map(|ann| ann.id), &opts.parent_key)?;
    for ann in &parent.annotations {
        if !image_ids.contains(&ann.image_id) {
            return Err(CocomergeError::UnresolvedReference {
                kind: EntityKind::Image,
                source_key: opts.parent_key.clone(),
                old_id: ann.image_id.as_u64(),
            });
        }
    }

    let mut order: Vec<ImageId> = parent.images.iter().map(|img| img.id).collect();
    if let SplitOrder::Seeded(seed) = opts.order {
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);
    }

    let ratios: Vec<f64> = opts.subsets.iter().map(|s| s.ratio).collect();
    let sizes = partition_sizes(order.len(), &ratios);

    let mut assignment: HashMap<ImageId, usize> = HashMap::with_capacity(order.len());
    let mut ids = order.into_iter();
    for (subset_idx, size) in sizes.iter().enumerate() {
        for id in ids.by_ref().take(*size) {
            assignment.insert(id, subset_idx);
        }
    }

    let mut report = SplitReport {
        parent: RecordCounts::of(parent),
        subsets: Vec::with_capacity(opts.subsets.len()),
    };
    let mut subsets = Vec::with_capacity(opts.subsets.len());

    for (subset_idx, spec) in opts.subsets.iter().enumerate() {
        let (dataset, registry) = build_subset(parent, opts, &assignment, subset_idx)?;
        let counts = RecordCounts::of(&dataset);
        info!("Subset '{}': {}", spec.name, counts);

        report.subsets.push(SubsetSummary {
            name: spec.name.clone(),
            ratio: spec.ratio,
            counts,
        });
        subsets.push(Subset {
            name: spec.name.clone(),
            dataset,
            registry,
        });
    }

    Ok(SplitOutput { subsets, report })
}

/// Ids a subset may contain must be unique in the parent. Each subset has its
/// own registry, so a repeat would otherwise only fail when both copies land
/// in the same subset.
fn unique_parent_ids<I: RecordId>(
    ids: impl Iterator<Item = I>,
    parent_key: &str,
) -> Result<HashSet<I>, CocomergeError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CocomergeError::DuplicateMapping {
                kind: I::KIND,
                source_key: parent_key.to_string(),
                old_id: id.as_u64(),
            });
        }
    }
    Ok(seen)
}

fn build_subset(
    parent: &Dataset,
    opts: &SplitOptions,
    assignment: &HashMap<ImageId, usize>,
    subset_idx: usize,
) -> Result<(Dataset, MapperRegistry), CocomergeError> {
    let key = opts.parent_key.as_str();
    let in_subset = |id: &ImageId| assignment.get(id) == Some(&subset_idx);

    let mut buffer = RecordBuffer::new(opts.conflict_policy);
    buffer.set_info(parent.info.clone());

    for license in &parent.licenses {
        buffer.process_license(license, key)?;
    }
    for category in &parent.categories {
        buffer.process_category(category, key)?;
    }
    for image in parent.images.iter().filter(|img| in_subset(&img.id)) {
        buffer.process_image(image, key)?;
    }
    for ann in parent
        .annotations
        .iter()
        .filter(|ann| in_subset(&ann.image_id))
    {
        buffer.process_annotation(ann, key)?;
    }

    Ok(buffer.finish())
}
