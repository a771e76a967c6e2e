//! Dataset validation.
//!
//! Checks a collection for the properties merge and split rely on:
//! - unique ids per record kind (and, optionally, ids exactly `0..n`)
//! - every reference resolving inside the same collection
//! - dedup keys that would silently collapse records
//! - basic record sanity (dimensions, names, keypoint schemas, bboxes)

mod report;

pub use report::{IssueCode, IssueContext, Severity, ValidationIssue, ValidationReport};

use std::collections::{HashMap, HashSet};

use crate::ir::{CategoryId, Dataset, ImageId, LicenseId, RecordId};

/// Options for validation behavior.
#[derive(Clone, Debug, Default)]
pub struct ValidateOptions {
    /// If true, treat warnings as errors.
    pub strict: bool,
    /// If true, ids of every kind must be exactly `0..n`, as merge and split
    /// produce them.
    pub require_contiguous_ids: bool,
}

/// Validates a dataset and returns a report of all issues found.
pub fn validate_dataset(dataset: &Dataset, opts: &ValidateOptions) -> ValidationReport {
    let mut report = ValidationReport::new();

    let license_ids = validate_licenses(dataset, &mut report);
    let image_ids = validate_images(dataset, &license_ids, &mut report);
    let category_keypoints = validate_categories(dataset, &mut report);
    validate_annotations(dataset, &image_ids, &category_keypoints, &mut report);

    if opts.require_contiguous_ids {
        check_contiguous(dataset.licenses.iter().map(|l| l.id), &mut report);
        check_contiguous(dataset.images.iter().map(|i| i.id), &mut report);
        check_contiguous(dataset.categories.iter().map(|c| c.id), &mut report);
        check_contiguous(dataset.annotations.iter().map(|a| a.id), &mut report);
    }

    report
}

fn validate_licenses(dataset: &Dataset, report: &mut ValidationReport) -> HashSet<LicenseId> {
    let mut seen_ids: HashSet<LicenseId> = HashSet::new();
    let mut seen_keys: HashMap<(&str, &str), LicenseId> = HashMap::new();

    for license in &dataset.licenses {
        if !seen_ids.insert(license.id) {
            report.error(
                IssueCode::DuplicateLicenseId,
                IssueContext::record(license.id),
                format!("Duplicate license ID {}", license.id),
            );
        }

        if let Some(first) = seen_keys.get(&license.dedup_key()) {
            report.warning(
                IssueCode::DuplicateLicenseKey,
                IssueContext::record(license.id),
                format!(
                    "License '{}' ({}) has the same url and name as license {}",
                    license.name, license.url, first
                ),
            );
        } else {
            seen_keys.insert(license.dedup_key(), license.id);
        }
    }

    seen_ids
}

fn validate_images(
    dataset: &Dataset,
    license_ids: &HashSet<LicenseId>,
    report: &mut ValidationReport,
) -> HashSet<ImageId> {
    let mut seen_ids: HashMap<ImageId, usize> = HashMap::new();

    for (idx, image) in dataset.images.iter().enumerate() {
        if let Some(first_idx) = seen_ids.get(&image.id) {
            report.error(
                IssueCode::DuplicateImageId,
                IssueContext::record(image.id),
                format!(
                    "Duplicate image ID {} (first seen at index {})",
                    image.id, first_idx
                ),
            );
        } else {
            seen_ids.insert(image.id, idx);
        }

        if let Some(license_id) = image.license_id {
            if !license_ids.contains(&license_id) {
                report.error(
                    IssueCode::MissingLicenseRef,
                    IssueContext::record(image.id),
                    format!("References non-existent license {}", license_id),
                );
            }
        }

        if image.width == 0 || image.height == 0 {
            report.error(
                IssueCode::InvalidImageDimensions,
                IssueContext::record(image.id),
                format!(
                    "Invalid dimensions {}x{} (must be positive)",
                    image.width, image.height
                ),
            );
        }

        if image.file_name.is_empty() {
            report.warning(
                IssueCode::EmptyFileName,
                IssueContext::record(image.id),
                "Empty filename",
            );
        }
    }

    seen_ids.into_keys().collect()
}

/// Returns the keypoint count of every category.
fn validate_categories(dataset: &Dataset, report: &mut ValidationReport) -> HashMap<CategoryId, usize> {
    let mut keypoint_counts: HashMap<CategoryId, usize> = HashMap::new();
    let mut seen_keys: HashMap<(&str, &str), CategoryId> = HashMap::new();

    for category in &dataset.categories {
        if keypoint_counts
            .insert(category.id, category.keypoints.len())
            .is_some()
        {
            report.error(
                IssueCode::DuplicateCategoryId,
                IssueContext::record(category.id),
                format!("Duplicate category ID {}", category.id),
            );
        }

        if category.name.is_empty() {
            report.warning(
                IssueCode::EmptyCategoryName,
                IssueContext::record(category.id),
                "Empty category name",
            );
        } else if let Some(first) = seen_keys.get(&category.dedup_key()) {
            report.warning(
                IssueCode::DuplicateCategoryKey,
                IssueContext::record(category.id),
                format!(
                    "Category '{}/{}' is also defined as category {}",
                    category.supercategory, category.name, first
                ),
            );
        } else {
            seen_keys.insert(category.dedup_key(), category.id);
        }

        let n_keypoints = category.keypoints.len() as u32;
        if let Some(edge) = category
            .skeleton
            .iter()
            .find(|[a, b]| *a == 0 || *b == 0 || *a > n_keypoints || *b > n_keypoints)
        {
            report.warning(
                IssueCode::SkeletonIndexOutOfRange,
                IssueContext::record(category.id),
                format!(
                    "Skeleton edge [{}, {}] is outside 1..={}",
                    edge[0], edge[1], n_keypoints
                ),
            );
        }
    }

    keypoint_counts
}

fn validate_annotations(
    dataset: &Dataset,
    image_ids: &HashSet<ImageId>,
    category_keypoints: &HashMap<CategoryId, usize>,
    report: &mut ValidationReport,
) {
    let mut seen_ids = HashSet::new();

    for annotation in &dataset.annotations {
        if !seen_ids.insert(annotation.id) {
            report.error(
                IssueCode::DuplicateAnnotationId,
                IssueContext::record(annotation.id),
                format!("Duplicate annotation ID {}", annotation.id),
            );
        }

        if !image_ids.contains(&annotation.image_id) {
            report.error(
                IssueCode::MissingImageRef,
                IssueContext::record(annotation.id),
                format!("References non-existent image {}", annotation.image_id),
            );
        }

        match category_keypoints.get(&annotation.category_id) {
            None => {
                report.error(
                    IssueCode::MissingCategoryRef,
                    IssueContext::record(annotation.id),
                    format!(
                        "References non-existent category {}",
                        annotation.category_id
                    ),
                );
            }
            Some(&expected) => {
                if let Some(keypoints) = &annotation.keypoints {
                    if keypoints.len() != expected * 3 {
                        report.warning(
                            IssueCode::KeypointCountMismatch,
                            IssueContext::record(annotation.id),
                            format!(
                                "{} keypoint values, category {} expects {} ({} points)",
                                keypoints.len(),
                                annotation.category_id,
                                expected * 3,
                                expected
                            ),
                        );
                    }
                }
            }
        }

        let [x, y, w, h] = annotation.bbox;
        if ![x, y, w, h].iter().all(|v| v.is_finite()) {
            report.error(
                IssueCode::BBoxNotFinite,
                IssueContext::record(annotation.id),
                format!("Non-finite bbox [{}, {}, {}, {}]", x, y, w, h),
            );
        } else if w < 0.0 || h < 0.0 {
            report.warning(
                IssueCode::NegativeBBoxSize,
                IssueContext::record(annotation.id),
                format!("Negative bbox size {}x{}", w, h),
            );
        }
    }
}

fn check_contiguous<I: RecordId>(ids: impl Iterator<Item = I>, report: &mut ValidationReport) {
    let mut ids: Vec<u64> = ids.map(|id| id.as_u64()).collect();
    ids.sort_unstable();
    ids.dedup();

    let n = ids.len() as u64;
    if ids.iter().copied().ne(0..n) {
        let first_gap = ids
            .iter()
            .zip(0u64..)
            .find(|(id, expected)| **id != *expected)
            .map(|(_, expected)| expected)
            .unwrap_or(n);
        report.error(
            IssueCode::NonContiguousIds,
            IssueContext::all(I::KIND),
            format!(
                "{} ids are not contiguous from 0 (first missing id is {})",
                I::KIND,
                first_gap
            ),
        );
    }
}
