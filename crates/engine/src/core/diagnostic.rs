use crate::core::Severity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub end_column: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn with_end(mut self, end_line: usize, end_column: usize) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }
}

/// Suggested-fix descriptor. The engine only describes edits; applying them
/// is the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixKind {
    SetPackage,
    SetClassName,
    InsertAnnotation,
    ReplaceText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedFix {
    pub kind: FixKind,
    pub name: String,
    pub target: Location,
    pub replacement: String,
}

impl SuggestedFix {
    pub fn new(
        kind: FixKind,
        name: impl Into<String>,
        target: Location,
        replacement: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            target,
            replacement: replacement.into(),
        }
    }
}

/// A single finding. Plain data record: rendering belongs to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub rule: String,
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fixes: Vec<SuggestedFix>,
}

impl Diagnostic {
    pub fn new(
        rule: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            rule: rule.into(),
            severity,
            message: message.into(),
            location,
            fixes: Vec::new(),
        }
    }

    pub fn with_fix(mut self, fix: SuggestedFix) -> Self {
        self.fixes.push(fix);
        self
    }

    pub fn with_fixes(mut self, fixes: Vec<SuggestedFix>) -> Self {
        self.fixes = fixes;
        self
    }

    /// Two diagnostics with the same key collapse to one in the sink.
    pub fn dedup_key(&self) -> (String, String, usize, usize, String) {
        (
            self.rule.clone(),
            self.location.file.clone(),
            self.location.line,
            self.location.column,
            self.message.clone(),
        )
    }

    /// Report order: by location within a file, then rule, then message.
    pub fn report_ordering(&self, other: &Self) -> Ordering {
        self.location
            .file
            .cmp(&other.location.file)
            .then(self.location.line.cmp(&other.location.line))
            .then(self.location.column.cmp(&other.location.column))
            .then(self.rule.cmp(&other.rule))
            .then(self.message.cmp(&other.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_ordering_is_by_location_first() {
        let a = Diagnostic::new(
            "Range",
            Severity::Error,
            "b",
            Location::new("A.java", 3, 1),
        );
        let b = Diagnostic::new(
            "Range",
            Severity::Error,
            "a",
            Location::new("A.java", 2, 9),
        );
        assert_eq!(a.report_ordering(&b), Ordering::Greater);
    }

    #[test]
    fn dedup_key_ignores_fixes() {
        let loc = Location::new("A.java", 1, 1);
        let plain = Diagnostic::new("X", Severity::Warning, "m", loc.clone());
        let with_fix = plain.clone().with_fix(SuggestedFix::new(
            FixKind::SetPackage,
            "Set package name",
            loc,
            ".setPackage(packageName)",
        ));
        assert_eq!(plain.dedup_key(), with_fix.dedup_key());
    }
}
