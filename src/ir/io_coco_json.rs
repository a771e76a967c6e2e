//! COCO JSON format reader and writer.
//!
//! This module converts between COCO JSON documents and the typed records in
//! [`crate::ir`]. Field names follow the public COCO schema exactly so the
//! output stays usable by existing COCO tooling.
//!
//! # Required keys
//!
//! Parsing fails up front when a required key is missing, rather than at the
//! first access later in a merge:
//! - licenses: `id`, `name`, `url`
//! - images: `id`, `file_name`, `width`, `height`
//! - categories: `id`, `name`
//! - annotations: `id`, `image_id`, `category_id`, `bbox`
//!
//! `keypoints_3d` and `camera_params` are tolerated as extension keys on
//! annotations and written back only when present.
//!
//! # Deterministic Output
//!
//! The writer sorts all lists by ID so that output is reproducible.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::model::{Annotation, Category, Dataset, DatasetInfo, Image, License, Segmentation};
use super::{AnnotationId, CategoryId, ImageId, LicenseId};
use crate::error::CocomergeError;

// ============================================================================
// COCO Schema Types (internal to this module)
// ============================================================================

/// Top-level COCO dataset structure.
#[derive(Debug, Serialize, Deserialize)]
struct CocoDataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    info: Option<DatasetInfo>,

    #[serde(default)]
    licenses: Vec<CocoLicense>,

    images: Vec<CocoImage>,

    annotations: Vec<CocoAnnotation>,

    categories: Vec<CocoCategory>,
}

/// COCO license entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoLicense {
    id: u64,
    name: String,
    url: String,
}

/// COCO image entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoImage {
    id: u64,
    width: u32,
    height: u32,
    file_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    license: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_captured: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    coco_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    flickr_url: Option<String>,
}

/// COCO category entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoCategory {
    id: u64,
    name: String,

    #[serde(default)]
    supercategory: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    keypoints: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    skeleton: Vec<[u32; 2]>,
}

/// COCO annotation entry.
#[derive(Debug, Serialize, Deserialize)]
struct CocoAnnotation {
    id: u64,
    image_id: u64,
    category_id: u64,

    /// COCO bbox format: [x, y, width, height] with (x,y) as top-left corner
    bbox: [f64; 4],

    #[serde(default, skip_serializing_if = "Option::is_none")]
    area: Option<f64>,

    #[serde(default, deserialize_with = "deserialize_iscrowd")]
    iscrowd: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    segmentation: Option<Segmentation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    keypoints: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_keypoints: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    keypoints_3d: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    camera_params: Option<serde_json::Value>,
}

/// Accepts `iscrowd` as either `0/1` or `true/false`.
fn deserialize_iscrowd<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IsCrowd {
        Bool(bool),
        Int(u8),
    }
    match IsCrowd::deserialize(deserializer)? {
        IsCrowd::Bool(b) => Ok(u8::from(b)),
        IsCrowd::Int(i) => Ok(u8::from(i != 0)),
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Reads a dataset from a COCO JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid JSON, or is
/// missing a required key.
///
/// # Example
/// ```no_run
/// use std::path::Path;
/// use cocomerge::ir::io_coco_json::read_coco_json;
///
/// let dataset = read_coco_json(Path::new("annotations.json"))?;
/// # Ok::<(), cocomerge::CocomergeError>(())
/// ```
pub fn read_coco_json(path: &Path) -> Result<Dataset, CocomergeError> {
    let file = File::open(path).map_err(|source| CocomergeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let coco: CocoDataset =
        serde_json::from_reader(reader).map_err(|source| CocomergeError::CocoJsonParse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(coco_to_ir(coco))
}

/// Writes a dataset to a COCO JSON file.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_coco_json(path: &Path, dataset: &Dataset) -> Result<(), CocomergeError> {
    let file = File::create(path).map_err(|source| CocomergeError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    let writer = BufWriter::new(file);

    let coco = ir_to_coco(dataset);

    serde_json::to_writer_pretty(writer, &coco).map_err(|source| CocomergeError::CocoJsonWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads a dataset from a COCO JSON string.
pub fn from_coco_str(json: &str) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDataset = serde_json::from_str(json)?;
    Ok(coco_to_ir(coco))
}

/// Reads a dataset from a COCO JSON byte slice.
pub fn from_coco_slice(bytes: &[u8]) -> Result<Dataset, serde_json::Error> {
    let coco: CocoDataset = serde_json::from_slice(bytes)?;
    Ok(coco_to_ir(coco))
}

/// Writes a dataset to a pretty-printed COCO JSON string.
pub fn to_coco_string(dataset: &Dataset) -> Result<String, serde_json::Error> {
    let coco = ir_to_coco(dataset);
    serde_json::to_string_pretty(&coco)
}

// ============================================================================
// Conversion: COCO -> IR
// ============================================================================

fn coco_to_ir(coco: CocoDataset) -> Dataset {
    let licenses = coco
        .licenses
        .into_iter()
        .map(|l| License {
            id: LicenseId::new(l.id),
            name: l.name,
            url: l.url,
        })
        .collect();

    let images = coco
        .images
        .into_iter()
        .map(|img| Image {
            id: ImageId::new(img.id),
            file_name: img.file_name,
            width: img.width,
            height: img.height,
            license_id: img.license.map(LicenseId::new),
            date_captured: img.date_captured,
            coco_url: img.coco_url,
            flickr_url: img.flickr_url,
        })
        .collect();

    let categories = coco
        .categories
        .into_iter()
        .map(|cat| Category {
            id: CategoryId::new(cat.id),
            name: cat.name,
            supercategory: cat.supercategory,
            keypoints: cat.keypoints,
            skeleton: cat.skeleton,
        })
        .collect();

    let annotations = coco
        .annotations
        .into_iter()
        .map(|ann| {
            let [_, _, w, h] = ann.bbox;
            Annotation {
                id: AnnotationId::new(ann.id),
                image_id: ImageId::new(ann.image_id),
                category_id: CategoryId::new(ann.category_id),
                bbox: ann.bbox,
                area: ann.area.unwrap_or(w * h),
                is_crowd: ann.iscrowd != 0,
                segmentation: ann.segmentation,
                keypoints: ann.keypoints,
                num_keypoints: ann.num_keypoints,
                keypoints_3d: ann.keypoints_3d,
                camera_params: ann.camera_params,
            }
        })
        .collect();

    Dataset {
        info: coco.info.unwrap_or_default(),
        licenses,
        images,
        categories,
        annotations,
    }
}

// ============================================================================
// Conversion: IR -> COCO
// ============================================================================

fn ir_to_coco(dataset: &Dataset) -> CocoDataset {
    let info = if dataset.info.is_empty() {
        None
    } else {
        Some(dataset.info.clone())
    };

    let mut licenses: Vec<CocoLicense> = dataset
        .licenses
        .iter()
        .map(|l| CocoLicense {
            id: l.id.as_u64(),
            name: l.name.clone(),
            url: l.url.clone(),
        })
        .collect();
    licenses.sort_by_key(|l| l.id);

    let mut images: Vec<CocoImage> = dataset
        .images
        .iter()
        .map(|img| CocoImage {
            id: img.id.as_u64(),
            width: img.width,
            height: img.height,
            file_name: img.file_name.clone(),
            license: img.license_id.map(|l| l.as_u64()),
            date_captured: img.date_captured.clone(),
            coco_url: img.coco_url.clone(),
            flickr_url: img.flickr_url.clone(),
        })
        .collect();
    images.sort_by_key(|i| i.id);

    let mut categories: Vec<CocoCategory> = dataset
        .categories
        .iter()
        .map(|cat| CocoCategory {
            id: cat.id.as_u64(),
            name: cat.name.clone(),
            supercategory: cat.supercategory.clone(),
            keypoints: cat.keypoints.clone(),
            skeleton: cat.skeleton.clone(),
        })
        .collect();
    categories.sort_by_key(|c| c.id);

    let mut annotations: Vec<CocoAnnotation> = dataset
        .annotations
        .iter()
        .map(|ann| CocoAnnotation {
            id: ann.id.as_u64(),
            image_id: ann.image_id.as_u64(),
            category_id: ann.category_id.as_u64(),
            bbox: ann.bbox,
            area: Some(ann.area),
            iscrowd: u8::from(ann.is_crowd),
            segmentation: ann.segmentation.clone(),
            keypoints: ann.keypoints.clone(),
            num_keypoints: ann.num_keypoints,
            keypoints_3d: ann.keypoints_3d.clone(),
            camera_params: ann.camera_params.clone(),
        })
        .collect();
    annotations.sort_by_key(|a| a.id);

    CocoDataset {
        info,
        licenses,
        images,
        annotations,
        categories,
    }
}

// ============================================================================
// Tests
// ============================================================================
