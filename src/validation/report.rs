//! Validation findings, grouped by the kind of record they concern.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::ir::{EntityKind, RecordId};

/// How bad a finding is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious, but merge and split still work.
    Warning,
    /// Merge or split would fail on this input.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Stable code for each kind of finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    DuplicateLicenseId,
    DuplicateImageId,
    DuplicateAnnotationId,
    DuplicateCategoryId,
    /// Ids of one kind are not exactly `0..n`.
    NonContiguousIds,

    MissingImageRef,
    MissingCategoryRef,
    MissingLicenseRef,

    /// Two licenses share `(url, name)` and would be merged.
    DuplicateLicenseKey,
    /// Two categories share `(supercategory, name)` and would be merged.
    DuplicateCategoryKey,

    InvalidImageDimensions,
    EmptyFileName,
    EmptyCategoryName,
    /// A skeleton edge points past the keypoint list.
    SkeletonIndexOutOfRange,
    /// An annotation's keypoint list does not match its category's schema.
    KeypointCountMismatch,
    BBoxNotFinite,
    NegativeBBoxSize,
}

/// Where a finding applies: one record, or every record of a kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct IssueContext {
    pub kind: EntityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl IssueContext {
    /// A single record, identified by its typed id.
    pub fn record<I: RecordId>(id: I) -> Self {
        Self {
            kind: I::KIND,
            id: Some(id.as_u64()),
        }
    }

    /// All records of `kind`, e.g. for id numbering.
    pub fn all(kind: EntityKind) -> Self {
        Self { kind, id: None }
    }
}

impl fmt::Display for IssueContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{} {}", self.kind, id),
            None => write!(f, "all {}", self.kind.plural()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: IssueCode,
    pub context: IssueContext,
    pub message: String,
}

/// Everything `validate_dataset` found, in discovery order.
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, code: IssueCode, context: IssueContext, message: impl Into<String>) {
        self.push(Severity::Error, code, context, message.into());
    }

    pub fn warning(&mut self, code: IssueCode, context: IssueContext, message: impl Into<String>) {
        self.push(Severity::Warning, code, context, message.into());
    }

    fn push(&mut self, severity: Severity, code: IssueCode, context: IssueContext, message: String) {
        self.issues.push(ValidationIssue {
            severity,
            code,
            context,
            message,
        });
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// No errors. Warnings are allowed.
    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }

    /// True if the input should be rejected. In strict mode warnings count.
    pub fn fails(&self, strict: bool) -> bool {
        !self.is_ok() || (strict && !self.is_clean())
    }

    /// Findings about records of `kind`, including kind-wide ones.
    pub fn for_kind(&self, kind: EntityKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.context.kind == kind)
    }
}

impl Serialize for ValidationReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Json<'a> {
            error_count: usize,
            warning_count: usize,
            issues: &'a [ValidationIssue],
        }

        Json {
            error_count: self.error_count(),
            warning_count: self.warning_count(),
            issues: &self.issues,
        }
        .serialize(serializer)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return writeln!(f, "Validation passed: no issues found");
        }

        writeln!(
            f,
            "Validation found {} error(s) and {} warning(s)",
            self.error_count(),
            self.warning_count()
        )?;

        for kind in EntityKind::ALL {
            let issues: Vec<_> = self.for_kind(kind).collect();
            if issues.is_empty() {
                continue;
            }
            writeln!(f)?;
            writeln!(f, "{} ({}):", kind.plural(), issues.len())?;
            for issue in issues {
                writeln!(
                    f,
                    "  {:<7}  {}: {} [{:?}]",
                    issue.severity, issue.context, issue.message, issue.code
                )?;
            }
        }
        Ok(())
    }
}
