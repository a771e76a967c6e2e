//! Merge report types and text formatting.

use serde::Serialize;
use std::fmt;

use crate::ir::Dataset;

/// Record counts of one collection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub licenses: usize,
    pub images: usize,
    pub categories: usize,
    pub annotations: usize,
}

impl RecordCounts {
    /// Counts the records of a dataset.
    pub fn of(dataset: &Dataset) -> Self {
        Self {
            licenses: dataset.licenses.len(),
            images: dataset.images.len(),
            categories: dataset.categories.len(),
            annotations: dataset.annotations.len(),
        }
    }
}

impl fmt::Display for RecordCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} licenses, {} images, {} categories, {} annotations",
            self.licenses, self.images, self.categories, self.annotations
        )
    }
}

/// Per-source line of a merge report.
#[derive(Clone, Debug, Serialize)]
pub struct SourceSummary {
    pub key: String,
    pub input: RecordCounts,
    /// Licenses folded into a license from an earlier source.
    pub reused_licenses: usize,
    /// Categories folded into a category from an earlier source.
    pub reused_categories: usize,
}

/// Summary of a finished merge.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MergeReport {
    pub sources: Vec<SourceSummary>,
    pub output: RecordCounts,
}

impl MergeReport {
    /// Total licenses deduplicated across all sources.
    pub fn reused_licenses(&self) -> usize {
        self.sources.iter().map(|s| s.reused_licenses).sum()
    }

    /// Total categories deduplicated across all sources.
    pub fn reused_categories(&self) -> usize {
        self.sources.iter().map(|s| s.reused_categories).sum()
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Merged {} source(s):", self.sources.len())?;
        for source in &self.sources {
            writeln!(f, "  {}: {}", source.key, source.input)?;
            if source.reused_licenses > 0 || source.reused_categories > 0 {
                writeln!(
                    f,
                    "    reused {} license(s), {} category(ies)",
                    source.reused_licenses, source.reused_categories
                )?;
            }
        }
        writeln!(f)?;
        writeln!(f, "Output: {}", self.output)
    }
}
