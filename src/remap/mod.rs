//! Referential-integrity-preserving id remapping.
//!
//! Every source collection numbers its licenses, images, annotations and
//! categories independently. Merging or splitting therefore has to renumber
//! records while keeping annotation -> image, annotation -> category and
//! image -> license links intact.
//!
//! - [`IdMapper`] records `(source_key, old_id) -> new_id` for one record kind.
//! - [`MapperRegistry`] groups one mapper per kind.
//! - [`RecordBuffer`] owns the growing target collection and its registry,
//!   deduplicating licenses and categories and resolving references as
//!   records are appended.
//!
//! Within one source, licenses and categories must be processed before the
//! images that use them, and images before their annotations. Out-of-order
//! processing fails with [`crate::CocomergeError::UnresolvedReference`].

mod buffer;
mod mapper;

pub use buffer::{ConflictPolicy, DedupCounts, RecordBuffer};
pub use mapper::{IdMapEntry, IdMapper, MapperRegistry};
