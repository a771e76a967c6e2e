//! The accumulating target collection.

use std::collections::HashMap;

use log::{debug, warn};

use super::mapper::MapperRegistry;
use crate::error::CocomergeError;
use crate::ir::{
    Annotation, AnnotationId, Category, CategoryId, Dataset, DatasetInfo, EntityKind, Image,
    ImageId, License, LicenseId,
};

/// What to do when two categories share `(supercategory, name)` but carry
/// different keypoint schemas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Fail with [`CocomergeError::ConflictingRecord`].
    #[default]
    Reject,
    /// Keep the first-seen category and log a warning.
    FirstWins,
}

/// How many incoming records were folded into an existing one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DedupCounts {
    pub licenses: usize,
    pub categories: usize,
}

/// Target collection plus the id bookkeeping that produced it.
///
/// New ids are assigned as the current length of the target list, so every
/// kind stays contiguous from 0. Each `process_*` call either succeeds
/// completely (one mapping entry, at most one appended record) or fails
/// without touching the buffer.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    dataset: Dataset,
    registry: MapperRegistry,
    license_index: HashMap<(String, String), LicenseId>,
    category_index: HashMap<(String, String), CategoryId>,
    conflict_policy: ConflictPolicy,
    reused: DedupCounts,
}

impl RecordBuffer {
    /// Creates an empty buffer with a fresh registry.
    pub fn new(conflict_policy: ConflictPolicy) -> Self {
        Self {
            conflict_policy,
            ..Default::default()
        }
    }

    /// Sets the `info` block of the target collection.
    pub fn set_info(&mut self, info: DatasetInfo) {
        self.dataset.info = info;
    }

    /// The collection built so far.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The mappings recorded so far.
    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    /// How many licenses and categories were deduplicated.
    pub fn reused(&self) -> DedupCounts {
        self.reused
    }

    /// Adds a license, reusing an existing one with the same `(url, name)`.
    pub fn process_license(
        &mut self,
        license: &License,
        source_key: &str,
    ) -> Result<LicenseId, CocomergeError> {
        let key = (license.url.clone(), license.name.clone());

        if let Some(&existing) = self.license_index.get(&key) {
            self.registry
                .licenses
                .add(source_key, license.id, existing)?;
            self.reused.licenses += 1;
            debug!(
                "license {} from '{}' reuses license {}",
                license.id, source_key, existing
            );
            return Ok(existing);
        }

        let new_id = LicenseId::new(self.dataset.licenses.len() as u64);
        self.registry.licenses.add(source_key, license.id, new_id)?;
        self.license_index.insert(key, new_id);
        self.dataset.licenses.push(License {
            id: new_id,
            ..license.clone()
        });
        Ok(new_id)
    }

    /// Adds a category, reusing an existing one with the same
    /// `(supercategory, name)`.
    ///
    /// A match whose keypoint schema differs is handled by the buffer's
    /// [`ConflictPolicy`].
    pub fn process_category(
        &mut self,
        category: &Category,
        source_key: &str,
    ) -> Result<CategoryId, CocomergeError> {
        let key = (category.supercategory.clone(), category.name.clone());

        if let Some(&existing) = self.category_index.get(&key) {
            let kept = &self.dataset.categories[existing.as_u64() as usize];
            if !kept.same_schema(category) {
                let detail = schema_difference(kept, category);
                match self.conflict_policy {
                    ConflictPolicy::Reject => {
                        return Err(CocomergeError::ConflictingRecord {
                            kind: EntityKind::Category,
                            source_key: source_key.to_string(),
                            old_id: category.id.as_u64(),
                            existing_id: existing.as_u64(),
                            detail,
                        });
                    }
                    ConflictPolicy::FirstWins => {
                        warn!(
                            "category '{}' ({}) from '{}' differs in {} from category {}; keeping the first",
                            category.name, category.id, source_key, detail, existing
                        );
                    }
                }
            }

            self.registry
                .categories
                .add(source_key, category.id, existing)?;
            self.reused.categories += 1;
            debug!(
                "category {} from '{}' reuses category {}",
                category.id, source_key, existing
            );
            return Ok(existing);
        }

        let new_id = CategoryId::new(self.dataset.categories.len() as u64);
        self.registry
            .categories
            .add(source_key, category.id, new_id)?;
        self.category_index.insert(key, new_id);
        self.dataset.categories.push(Category {
            id: new_id,
            ..category.clone()
        });
        Ok(new_id)
    }

    /// Adds an image under a new id, rewriting its license reference.
    ///
    /// The image's license must already have been processed for `source_key`.
    pub fn process_image(
        &mut self,
        image: &Image,
        source_key: &str,
    ) -> Result<ImageId, CocomergeError> {
        let license_id = image
            .license_id
            .map(|old| self.registry.licenses.resolve(source_key, old))
            .transpose()?;

        let new_id = ImageId::new(self.dataset.images.len() as u64);
        self.registry.images.add(source_key, image.id, new_id)?;
        self.dataset.images.push(Image {
            id: new_id,
            license_id,
            ..image.clone()
        });
        Ok(new_id)
    }

    /// Adds an annotation under a new id, rewriting its image and category
    /// references.
    ///
    /// The annotation's image and category must already have been processed
    /// for `source_key`.
    pub fn process_annotation(
        &mut self,
        annotation: &Annotation,
        source_key: &str,
    ) -> Result<AnnotationId, CocomergeError> {
        let image_id = self
            .registry
            .images
            .resolve(source_key, annotation.image_id)?;
        let category_id = self
            .registry
            .categories
            .resolve(source_key, annotation.category_id)?;

        let new_id = AnnotationId::new(self.dataset.annotations.len() as u64);
        self.registry
            .annotations
            .add(source_key, annotation.id, new_id)?;
        self.dataset.annotations.push(Annotation {
            id: new_id,
            image_id,
            category_id,
            ..annotation.clone()
        });
        Ok(new_id)
    }

    /// Hands off the finished collection and its mappings.
    pub fn finish(self) -> (Dataset, MapperRegistry) {
        (self.dataset, self.registry)
    }
}

fn schema_difference(kept: &Category, incoming: &Category) -> String {
    match (
        kept.keypoints != incoming.keypoints,
        kept.skeleton != incoming.skeleton,
    ) {
        (true, true) => "keypoints and skeleton".to_string(),
        (true, false) => "keypoints".to_string(),
        _ => "skeleton".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "a.json";

    #[test]
    fn licenses_dedup_on_url_and_name() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);

        let first = buffer
            .process_license(&License::new(5u64, "CC", "u"), SRC)
            .unwrap();
        let again = buffer
            .process_license(&License::new(9u64, "CC", "u"), "b.json")
            .unwrap();
        // same name, different url: a distinct license
        let other = buffer
            .process_license(&License::new(6u64, "CC", "v"), SRC)
            .unwrap();

        assert_eq!(first, LicenseId(0));
        assert_eq!(again, LicenseId(0));
        assert_eq!(other, LicenseId(1));
        assert_eq!(buffer.dataset().licenses.len(), 2);
        assert_eq!(buffer.reused().licenses, 1);
    }

    #[test]
    fn category_conflict_is_rejected_without_mutation() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);
        let person = Category::new(1u64, "person", "human").with_keypoints(["nose"], vec![]);
        buffer.process_category(&person, SRC).unwrap();

        let other = Category::new(4u64, "person", "human").with_keypoints(["nose", "eye"], vec![]);
        let err = buffer.process_category(&other, "b.json").unwrap_err();

        assert!(matches!(
            err,
            CocomergeError::ConflictingRecord {
                kind: EntityKind::Category,
                old_id: 4,
                existing_id: 0,
                ..
            }
        ));
        assert!(!buffer
            .registry()
            .categories
            .contains("b.json", CategoryId(4)));
        assert_eq!(buffer.dataset().categories.len(), 1);
    }

    #[test]
    fn category_conflict_first_wins_keeps_first_schema() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::FirstWins);
        let person = Category::new(1u64, "person", "human").with_keypoints(["nose"], vec![]);
        buffer.process_category(&person, SRC).unwrap();

        let other = Category::new(4u64, "person", "human").with_keypoints(["nose", "eye"], vec![]);
        let id = buffer.process_category(&other, "b.json").unwrap();

        assert_eq!(id, CategoryId(0));
        assert_eq!(buffer.dataset().categories[0].keypoints, vec!["nose"]);
    }

    #[test]
    fn image_before_license_is_unresolved() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);
        let image = Image::new(0u64, "a.jpg", 10, 10).with_license(5u64);

        let err = buffer.process_image(&image, SRC).unwrap_err();
        assert!(matches!(
            err,
            CocomergeError::UnresolvedReference {
                kind: EntityKind::License,
                old_id: 5,
                ..
            }
        ));
        assert!(buffer.dataset().images.is_empty());
        assert!(buffer.registry().images.is_empty());
    }

    #[test]
    fn image_without_license_needs_no_lookup() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);
        let id = buffer
            .process_image(&Image::new(42u64, "a.jpg", 10, 10), SRC)
            .unwrap();
        assert_eq!(id, ImageId(0));
        assert_eq!(buffer.dataset().images[0].license_id, None);
    }

    #[test]
    fn license_processed_twice_is_a_duplicate_mapping() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);
        let license = License::new(1u64, "CC", "u");
        buffer.process_license(&license, SRC).unwrap();

        let err = buffer.process_license(&license, SRC).unwrap_err();
        assert!(matches!(
            err,
            CocomergeError::DuplicateMapping {
                kind: EntityKind::License,
                old_id: 1,
                ..
            }
        ));
        assert_eq!(buffer.reused().licenses, 0);
    }

    #[test]
    fn annotation_references_are_rewritten() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);
        buffer
            .process_category(&Category::new(1u64, "cat", "animal"), "x")
            .unwrap();
        buffer
            .process_category(&Category::new(7u64, "dog", "animal"), SRC)
            .unwrap();
        buffer
            .process_image(&Image::new(3u64, "a.jpg", 10, 10), "x")
            .unwrap();
        buffer
            .process_image(&Image::new(3u64, "b.jpg", 10, 10), SRC)
            .unwrap();

        let ann = Annotation::new(11u64, 3u64, 7u64, [1.0, 1.0, 2.0, 2.0]);
        let id = buffer.process_annotation(&ann, SRC).unwrap();

        let stored = &buffer.dataset().annotations[0];
        assert_eq!(id, AnnotationId(0));
        assert_eq!(stored.image_id, ImageId(1));
        assert_eq!(stored.category_id, CategoryId(1));
        assert_eq!(stored.bbox, ann.bbox);
    }

    #[test]
    fn annotation_with_unknown_category_leaves_buffer_unchanged() {
        let mut buffer = RecordBuffer::new(ConflictPolicy::Reject);
        buffer
            .process_image(&Image::new(1u64, "a.jpg", 10, 10), SRC)
            .unwrap();

        let ann = Annotation::new(1u64, 1u64, 99u64, [0.0, 0.0, 1.0, 1.0]);
        let err = buffer.process_annotation(&ann, SRC).unwrap_err();

        assert!(matches!(
            err,
            CocomergeError::UnresolvedReference {
                kind: EntityKind::Category,
                old_id: 99,
                ..
            }
        ));
        assert!(buffer.dataset().annotations.is_empty());
        assert!(buffer.registry().annotations.is_empty());
    }
}
