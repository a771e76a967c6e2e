//! Newtype IDs for type-safe identification of dataset records.
//!
//! Using newtypes prevents accidentally mixing up different kinds of IDs
//! (e.g., resolving an image ID through the category mapper).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// The four kinds of record that carry their own id namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    License,
    Image,
    Annotation,
    Category,
}

impl EntityKind {
    /// Every kind, in the order records are processed for one source.
    pub const ALL: [EntityKind; 4] = [
        EntityKind::License,
        EntityKind::Category,
        EntityKind::Image,
        EntityKind::Annotation,
    ];

    /// Plural form, e.g. `"categories"`.
    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::License => "licenses",
            EntityKind::Image => "images",
            EntityKind::Annotation => "annotations",
            EntityKind::Category => "categories",
        }
    }

    /// Lowercase name used in messages and reports.
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::License => "license",
            EntityKind::Image => "image",
            EntityKind::Annotation => "annotation",
            EntityKind::Category => "category",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Behaviour shared by every record id, so the id mappers can be generic.
pub trait RecordId: Copy + Eq + Hash + Ord + fmt::Debug + fmt::Display {
    /// The kind of record this id names.
    const KIND: EntityKind;

    /// Wraps a raw value.
    fn new(id: u64) -> Self;

    /// Returns the underlying u64 value.
    fn as_u64(&self) -> u64;
}

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Creates a new id.
            #[inline]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value.
            #[inline]
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl RecordId for $name {
            const KIND: EntityKind = $kind;

            #[inline]
            fn new(id: u64) -> Self {
                Self(id)
            }

            #[inline]
            fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

record_id!(
    /// Identifier of a license record.
    LicenseId,
    EntityKind::License
);

record_id!(
    /// Identifier of an image record.
    ImageId,
    EntityKind::Image
);

record_id!(
    /// Identifier of an annotation record.
    AnnotationId,
    EntityKind::Annotation
);

record_id!(
    /// Identifier of a category record.
    CategoryId,
    EntityKind::Category
);
