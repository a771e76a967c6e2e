#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap};

use cocomerge::ir::{
    Annotation, AnnotationId, Category, CategoryId, Dataset, DatasetInfo, Image, ImageId, License,
    LicenseId,
};
use cocomerge::remap::MapperRegistry;
use proptest::prelude::*;
use proptest::strategy::BoxedStrategy;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

/// Licenses are drawn from this pool so that independent datasets share some.
pub const LICENSE_POOL: [(&str, &str); 3] = [
    ("CC BY 4.0", "https://creativecommons.org/licenses/by/4.0/"),
    ("CC0", "https://creativecommons.org/publicdomain/zero/1.0/"),
    ("Proprietary", "https://example.com/license"),
];

/// `(name, supercategory)` pairs, shared across datasets the same way.
pub const CATEGORY_POOL: [(&str, &str); 5] = [
    ("person", "human"),
    ("dog", "animal"),
    ("cat", "animal"),
    ("car", "vehicle"),
    ("dog", "toy"),
];

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// `n` distinct, sparse ids in arbitrary order.
pub fn distinct_ids(n: usize) -> BoxedStrategy<Vec<u64>> {
    proptest::collection::btree_set(0u64..100_000, n..=n)
        .prop_map(|ids| ids.into_iter().collect::<Vec<_>>())
        .prop_shuffle()
        .boxed()
}

/// A referentially consistent dataset with sparse, unordered ids.
///
/// Every image has positive dimensions, every annotation points at an
/// existing image and category, and images reference an existing license or
/// none at all.
pub fn arb_dataset(max_images: usize, max_anns: usize) -> BoxedStrategy<Dataset> {
    assert!(max_images > 0, "max_images must be > 0");

    (
        proptest::sample::subsequence(LICENSE_POOL.to_vec(), 0..=LICENSE_POOL.len()),
        proptest::sample::subsequence(CATEGORY_POOL.to_vec(), 1..=CATEGORY_POOL.len()),
        1usize..=max_images,
        0usize..=max_anns,
    )
        .prop_flat_map(|(licenses, categories, image_count, ann_count)| {
            (
                Just(licenses.clone()),
                Just(categories.clone()),
                distinct_ids(licenses.len()),
                distinct_ids(categories.len()),
                distinct_ids(image_count),
                distinct_ids(ann_count),
                proptest::collection::vec(
                    (any::<u32>(), 2u32..=4096, 2u32..=4096),
                    image_count..=image_count,
                ),
                proptest::collection::vec(
                    (any::<u32>(), any::<u32>(), any::<u32>()),
                    ann_count..=ann_count,
                ),
            )
                .prop_map(build_dataset)
        })
        .boxed()
}

/// One to `max_sources` datasets to merge.
pub fn arb_sources(
    max_sources: usize,
    max_images: usize,
    max_anns: usize,
) -> BoxedStrategy<Vec<Dataset>> {
    proptest::collection::vec(arb_dataset(max_images, max_anns), 1..=max_sources).boxed()
}

type DatasetParts = (
    Vec<(&'static str, &'static str)>,
    Vec<(&'static str, &'static str)>,
    Vec<u64>,
    Vec<u64>,
    Vec<u64>,
    Vec<u64>,
    Vec<(u32, u32, u32)>,
    Vec<(u32, u32, u32)>,
);

fn build_dataset(parts: DatasetParts) -> Dataset {
    let (
        license_pool,
        category_pool,
        license_ids,
        category_ids,
        image_ids,
        ann_ids,
        image_seeds,
        ann_seeds,
    ) = parts;

    let licenses: Vec<License> = license_pool
        .iter()
        .zip(&license_ids)
        .map(|((name, url), id)| License::new(*id, *name, *url))
        .collect();

    let categories: Vec<Category> = category_pool
        .iter()
        .zip(&category_ids)
        .map(|((name, supercategory), id)| Category::new(*id, *name, *supercategory))
        .collect();

    let images: Vec<Image> = image_ids
        .iter()
        .zip(image_seeds)
        .enumerate()
        .map(|(idx, (id, (license_seed, width, height)))| {
            let image = Image::new(*id, format!("img_{idx:03}_{id}.jpg"), width, height);
            let choice = license_seed as usize % (licenses.len() + 1);
            match licenses.get(choice) {
                Some(license) => image.with_license(license.id),
                None => image,
            }
        })
        .collect();

    let annotations: Vec<Annotation> = ann_ids
        .iter()
        .zip(ann_seeds)
        .map(|(id, (image_seed, category_seed, box_seed))| {
            let image = &images[image_seed as usize % images.len()];
            let category = &categories[category_seed as usize % categories.len()];
            let x = (box_seed % image.width) as f64;
            let y = (box_seed.rotate_left(7) % image.height) as f64;
            let w = 1.0 + (box_seed.rotate_left(13) % 64) as f64;
            let h = 1.0 + (box_seed.rotate_left(19) % 64) as f64;
            Annotation::new(*id, image.id, category.id, [x, y, w, h])
        })
        .collect();

    Dataset {
        info: DatasetInfo::default(),
        licenses,
        images,
        categories,
        annotations,
    }
}

/// Checks that ids are `0..n` in list order and every reference resolves.
pub fn assert_renumbered(dataset: &Dataset) -> Result<(), String> {
    for (idx, license) in dataset.licenses.iter().enumerate() {
        if license.id != LicenseId::new(idx as u64) {
            return Err(format!("license at index {idx} has id {}", license.id));
        }
    }
    for (idx, image) in dataset.images.iter().enumerate() {
        if image.id != ImageId::new(idx as u64) {
            return Err(format!("image at index {idx} has id {}", image.id));
        }
        if let Some(license_id) = image.license_id {
            if license_id.as_u64() as usize >= dataset.licenses.len() {
                return Err(format!(
                    "image {} references missing license {}",
                    image.id, license_id
                ));
            }
        }
    }
    for (idx, category) in dataset.categories.iter().enumerate() {
        if category.id != CategoryId::new(idx as u64) {
            return Err(format!("category at index {idx} has id {}", category.id));
        }
    }
    for (idx, ann) in dataset.annotations.iter().enumerate() {
        if ann.id != AnnotationId::new(idx as u64) {
            return Err(format!("annotation at index {idx} has id {}", ann.id));
        }
        if ann.image_id.as_u64() as usize >= dataset.images.len() {
            return Err(format!(
                "annotation {} references missing image {}",
                ann.id, ann.image_id
            ));
        }
        if ann.category_id.as_u64() as usize >= dataset.categories.len() {
            return Err(format!(
                "annotation {} references missing category {}",
                ann.id, ann.category_id
            ));
        }
    }
    Ok(())
}

/// What an annotation means independent of ids: its image's file name, its
/// category's key and its bbox.
#[derive(Clone, Debug, PartialEq)]
pub struct AnnSem {
    pub image_file: String,
    pub category: (String, String),
    pub bbox: [f64; 4],
}

pub fn ann_semantics(dataset: &Dataset, ann: &Annotation) -> Result<AnnSem, String> {
    let image = dataset
        .images
        .iter()
        .find(|img| img.id == ann.image_id)
        .ok_or_else(|| format!("annotation {} references missing image", ann.id))?;
    let category = dataset
        .categories
        .iter()
        .find(|cat| cat.id == ann.category_id)
        .ok_or_else(|| format!("annotation {} references missing category", ann.id))?;
    Ok(AnnSem {
        image_file: image.file_name.clone(),
        category: (category.supercategory.clone(), category.name.clone()),
        bbox: ann.bbox,
    })
}

/// Checks that every output annotation means the same as the source
/// annotation the registry says it came from.
pub fn assert_provenance(
    output: &Dataset,
    registry: &MapperRegistry,
    sources: &HashMap<String, &Dataset>,
) -> Result<(), String> {
    for ann in &output.annotations {
        let origins = registry.annotations.origins(ann.id);
        let [(source_key, old_id)] = origins.as_slice() else {
            return Err(format!(
                "annotation {} has {} origins, expected exactly one",
                ann.id,
                origins.len()
            ));
        };
        let source = sources
            .get(*source_key)
            .ok_or_else(|| format!("unknown source key '{source_key}'"))?;
        let original = source
            .annotations
            .iter()
            .find(|a| a.id == *old_id)
            .ok_or_else(|| format!("source '{source_key}' has no annotation {old_id}"))?;

        let want = ann_semantics(source, original)?;
        let got = ann_semantics(output, ann)?;
        if want != got {
            return Err(format!("annotation {} changed meaning: {want:?} -> {got:?}", ann.id));
        }
    }
    Ok(())
}

pub fn distinct_license_keys<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> usize {
    datasets
        .into_iter()
        .flat_map(|d| d.licenses.iter().map(|l| (l.url.clone(), l.name.clone())))
        .collect::<BTreeSet<_>>()
        .len()
}

pub fn distinct_category_keys<'a>(datasets: impl IntoIterator<Item = &'a Dataset>) -> usize {
    datasets
        .into_iter()
        .flat_map(|d| {
            d.categories
                .iter()
                .map(|c| (c.supercategory.clone(), c.name.clone()))
        })
        .collect::<BTreeSet<_>>()
        .len()
}
