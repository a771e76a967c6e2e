//! Typed records for COCO-style annotation collections.
//!
//! Every record kind (license, image, annotation, category) has its own
//! newtype id, so that an image id can never be resolved through the
//! category mapper by mistake. Geometry (bounding boxes, segmentations,
//! keypoints) is carried as opaque values: merge and split never look
//! inside it.
//!
//! # Example
//!
//! ```
//! use cocomerge::ir::{Annotation, Category, Dataset, Image, License};
//!
//! let dataset = Dataset {
//!     licenses: vec![License::new(1u64, "CC BY 4.0", "https://example.org/by")],
//!     images: vec![Image::new(1u64, "image.jpg", 640, 480).with_license(1u64)],
//!     categories: vec![Category::new(1u64, "person", "human")],
//!     annotations: vec![Annotation::new(1u64, 1u64, 1u64, [10.0, 20.0, 90.0, 180.0])],
//!     ..Default::default()
//! };
//! assert_eq!(dataset.annotations[0].area, 90.0 * 180.0);
//! ```

mod ids;
pub mod io_coco_json;
mod model;

// Re-export core types for convenient access
pub use ids::{AnnotationId, CategoryId, EntityKind, ImageId, LicenseId, RecordId};
pub use model::{
    Annotation, Category, Dataset, DatasetInfo, Image, License, Segmentation,
};
