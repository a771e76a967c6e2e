//! Split report types and text formatting.

use serde::Serialize;
use std::fmt;

use crate::merge::RecordCounts;

/// One subset line of a split report.
#[derive(Clone, Debug, Serialize)]
pub struct SubsetSummary {
    pub name: String,
    pub ratio: f64,
    pub counts: RecordCounts,
}

/// Summary of a finished split.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SplitReport {
    pub parent: RecordCounts,
    pub subsets: Vec<SubsetSummary>,
}

impl fmt::Display for SplitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Parent: {}", self.parent)?;
        writeln!(f)?;

        let name_width = self
            .subsets
            .iter()
            .map(|s| s.name.len())
            .max()
            .unwrap_or(0);

        for subset in &self.subsets {
            let share = if self.parent.images == 0 {
                0.0
            } else {
                subset.counts.images as f64 / self.parent.images as f64 * 100.0
            };
            writeln!(
                f,
                "  {:<width$}  {:>6} images ({:>5.1}%), {:>7} annotations",
                subset.name,
                subset.counts.images,
                share,
                subset.counts.annotations,
                width = name_width
            )?;
        }
        Ok(())
    }
}
