//! Typed annotation records.
//!
//! These are the records the merge and split engines operate on. The COCO
//! reader parses into them and the writer renders them back out; every
//! optionally-present COCO key is an explicit `Option` here.

use serde::{Deserialize, Serialize};

use super::ids::{AnnotationId, CategoryId, ImageId, LicenseId};

/// A complete annotation collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    /// Metadata carried from the COCO `info` block.
    pub info: DatasetInfo,

    /// License definitions referenced by images.
    pub licenses: Vec<License>,

    /// All images in the dataset.
    pub images: Vec<Image>,

    /// All category definitions.
    pub categories: Vec<Category>,

    /// All annotations.
    pub annotations: Vec<Annotation>,
}

/// Metadata about the dataset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

impl DatasetInfo {
    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        *self == DatasetInfo::default()
    }
}

/// A license that images can point at.
///
/// Two licenses are the same license when both `url` and `name` match.
#[derive(Clone, Debug, PartialEq)]
pub struct License {
    pub id: LicenseId,
    pub name: String,
    pub url: String,
}

impl License {
    /// Creates a new license.
    pub fn new(id: impl Into<LicenseId>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
        }
    }

    /// The `(url, name)` pair used for deduplication.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.url, &self.name)
    }
}

/// An image. Images are never deduplicated.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    pub id: ImageId,

    /// Filename or relative path of the image.
    pub file_name: String,

    pub width: u32,
    pub height: u32,

    /// License this image is published under, if any.
    pub license_id: Option<LicenseId>,

    /// Capture timestamp, kept verbatim.
    pub date_captured: Option<String>,

    pub coco_url: Option<String>,
    pub flickr_url: Option<String>,
}

impl Image {
    /// Creates a new image with the required fields.
    pub fn new(
        id: impl Into<ImageId>,
        file_name: impl Into<String>,
        width: u32,
        height: u32,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            width,
            height,
            license_id: None,
            date_captured: None,
            coco_url: None,
            flickr_url: None,
        }
    }

    /// Sets the license ID for this image.
    pub fn with_license(mut self, license_id: impl Into<LicenseId>) -> Self {
        self.license_id = Some(license_id.into());
        self
    }

    /// Sets the date captured for this image.
    pub fn with_date_captured(mut self, date: impl Into<String>) -> Self {
        self.date_captured = Some(date.into());
        self
    }

    /// Sets the image URI (written as `coco_url`).
    pub fn with_coco_url(mut self, url: impl Into<String>) -> Self {
        self.coco_url = Some(url.into());
        self
    }
}

/// A category, optionally carrying a keypoint schema.
///
/// Two categories are the same category when both `supercategory` and
/// `name` match.
#[derive(Clone, Debug, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub supercategory: String,

    /// Ordered keypoint labels.
    pub keypoints: Vec<String>,

    /// Pairs of (1-based) keypoint indices connected by a limb.
    pub skeleton: Vec<[u32; 2]>,
}

impl Category {
    /// Creates a new category without a keypoint schema.
    pub fn new(
        id: impl Into<CategoryId>,
        name: impl Into<String>,
        supercategory: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supercategory: supercategory.into(),
            keypoints: Vec::new(),
            skeleton: Vec::new(),
        }
    }

    /// Attaches a keypoint schema.
    pub fn with_keypoints<S: Into<String>>(
        mut self,
        labels: impl IntoIterator<Item = S>,
        skeleton: Vec<[u32; 2]>,
    ) -> Self {
        self.keypoints = labels.into_iter().map(Into::into).collect();
        self.skeleton = skeleton;
        self
    }

    /// The `(supercategory, name)` pair used for deduplication.
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.supercategory, &self.name)
    }

    /// True if both categories describe the same keypoint schema.
    pub fn same_schema(&self, other: &Category) -> bool {
        self.keypoints == other.keypoints && self.skeleton == other.skeleton
    }
}

/// Segmentation payload, carried without interpretation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// List of polygons, each a flat `[x, y, x, y, ...]` list.
    Polygon(Vec<Vec<f64>>),
    /// Compressed RLE as stored in COCO JSON.
    CompressedRle { size: [u32; 2], counts: String },
    /// Uncompressed RLE.
    UncompressedRle { size: [u32; 2], counts: Vec<u32> },
}

/// An annotation. Annotations are never deduplicated.
#[derive(Clone, Debug, PartialEq)]
pub struct Annotation {
    pub id: AnnotationId,
    pub image_id: ImageId,
    pub category_id: CategoryId,

    /// COCO `[x, y, width, height]`.
    pub bbox: [f64; 4],

    pub area: f64,
    pub is_crowd: bool,
    pub segmentation: Option<Segmentation>,

    /// Flat `[x, y, v, x, y, v, ...]` list.
    pub keypoints: Option<Vec<f64>>,
    pub num_keypoints: Option<u32>,

    /// Project extension: flat `[x, y, z, ...]` list.
    pub keypoints_3d: Option<Vec<f64>>,

    /// Project extension: camera parameters, carried verbatim.
    pub camera_params: Option<serde_json::Value>,
}

impl Annotation {
    /// Creates a new annotation with the minimum required fields.
    ///
    /// `area` is initialised from the bbox.
    pub fn new(
        id: impl Into<AnnotationId>,
        image_id: impl Into<ImageId>,
        category_id: impl Into<CategoryId>,
        bbox: [f64; 4],
    ) -> Self {
        Self {
            id: id.into(),
            image_id: image_id.into(),
            category_id: category_id.into(),
            bbox,
            area: bbox[2] * bbox[3],
            is_crowd: false,
            segmentation: None,
            keypoints: None,
            num_keypoints: None,
            keypoints_3d: None,
            camera_params: None,
        }
    }

    /// Attaches keypoints and derives `num_keypoints` from the visibility flags.
    pub fn with_keypoints(mut self, keypoints: Vec<f64>) -> Self {
        let visible = keypoints
            .chunks(3)
            .filter(|kp| kp.len() == 3 && kp[2] > 0.0)
            .count();
        self.num_keypoints = Some(visible as u32);
        self.keypoints = Some(keypoints);
        self
    }

    /// Attaches a segmentation.
    pub fn with_segmentation(mut self, segmentation: Segmentation) -> Self {
        self.segmentation = Some(segmentation);
        self
    }
}
