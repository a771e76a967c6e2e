//! Old-id to new-id tables.

use std::collections::HashMap;
use std::marker::PhantomData;

use serde::Serialize;

use crate::error::CocomergeError;
use crate::ir::{AnnotationId, CategoryId, EntityKind, ImageId, LicenseId, RecordId};

/// One recorded fact: `old_id` from `source_key` became `new_id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IdMapEntry {
    pub source_key: String,
    pub old_id: u64,
    pub new_id: u64,
}

/// Write-once table of `(source_key, old_id) -> new_id` for one record kind.
///
/// Lookups go through a per-source hash index, so resolution stays O(1)
/// regardless of how many sources have been merged. There is no fallback:
/// resolving a pair that was never added is an error.
#[derive(Clone, Debug, Serialize)]
#[serde(bound = "")]
pub struct IdMapper<I: RecordId> {
    entries: Vec<IdMapEntry>,
    #[serde(skip)]
    index: HashMap<String, HashMap<u64, I>>,
    #[serde(skip)]
    _kind: PhantomData<I>,
}

impl<I: RecordId> Default for IdMapper<I> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            _kind: PhantomData,
        }
    }
}

impl<I: RecordId> IdMapper<I> {
    /// Creates an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// The kind of record this mapper tracks.
    pub fn kind(&self) -> EntityKind {
        I::KIND
    }

    /// Records that `old` from `source_key` maps to `new`.
    ///
    /// # Errors
    /// [`CocomergeError::DuplicateMapping`] if `(source_key, old)` is already
    /// mapped. The mapper is left unchanged in that case.
    pub fn add(&mut self, source_key: &str, old: I, new: I) -> Result<(), CocomergeError> {
        if self.contains(source_key, old) {
            return Err(CocomergeError::DuplicateMapping {
                kind: self.kind(),
                source_key: source_key.to_string(),
                old_id: old.as_u64(),
            });
        }

        self.index
            .entry(source_key.to_string())
            .or_default()
            .insert(old.as_u64(), new);
        self.entries.push(IdMapEntry {
            source_key: source_key.to_string(),
            old_id: old.as_u64(),
            new_id: new.as_u64(),
        });
        Ok(())
    }

    /// Looks up the new id for `old` from `source_key`.
    ///
    /// # Errors
    /// [`CocomergeError::UnresolvedReference`] if no such entry exists.
    pub fn resolve(&self, source_key: &str, old: I) -> Result<I, CocomergeError> {
        self.index
            .get(source_key)
            .and_then(|by_old| by_old.get(&old.as_u64()))
            .copied()
            .ok_or_else(|| CocomergeError::UnresolvedReference {
                kind: self.kind(),
                source_key: source_key.to_string(),
                old_id: old.as_u64(),
            })
    }

    /// Returns true if `(source_key, old)` has been mapped.
    pub fn contains(&self, source_key: &str, old: I) -> bool {
        self.index
            .get(source_key)
            .is_some_and(|by_old| by_old.contains_key(&old.as_u64()))
    }

    /// Every `(source_key, old_id)` that was mapped onto `new`, in insertion order.
    ///
    /// Deduplicated kinds (licenses, categories) can have several origins;
    /// images and annotations have exactly one.
    pub fn origins(&self, new: I) -> Vec<(&str, I)> {
        self.entries
            .iter()
            .filter(|entry| entry.new_id == new.as_u64())
            .map(|entry| (entry.source_key.as_str(), I::new(entry.old_id)))
            .collect()
    }

    /// All entries in the order they were recorded.
    pub fn entries(&self) -> &[IdMapEntry] {
        &self.entries
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One [`IdMapper`] per record kind, owned by a single merge or split run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MapperRegistry {
    pub licenses: IdMapper<LicenseId>,
    pub images: IdMapper<ImageId>,
    pub annotations: IdMapper<AnnotationId>,
    pub categories: IdMapper<CategoryId>,
}

impl MapperRegistry {
    /// Creates a registry with four empty mappers.
    pub fn new() -> Self {
        Self::default()
    }
}
