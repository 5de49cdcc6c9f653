//! Diagnostic accumulation across concurrent file analyses.
//!
//! Per-file diagnostics have no defined relative order until the final
//! merge, so the sink just appends under a lock and does ordering plus
//! de-duplication once, in `finish`.

use crate::core::Diagnostic;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    detector_errors: AtomicUsize,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    pub fn emit_all(&self, diagnostics: Vec<Diagnostic>) {
        if diagnostics.is_empty() {
            return;
        }
        self.diagnostics.lock().extend(diagnostics);
    }

    /// Records a swallowed detector-internal error. Fail-open: the error
    /// produces no finding, but the count is surfaced on the report.
    pub fn record_detector_error(&self) {
        self.detector_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn detector_errors(&self) -> usize {
        self.detector_errors.load(Ordering::Relaxed)
    }

    /// Final serial merge: stable order, duplicates collapsed unless
    /// deduplication was turned off.
    pub fn finish(self, dedup: bool) -> (Vec<Diagnostic>, DedupStats) {
        let mut diagnostics = self.diagnostics.into_inner();
        let original_count = diagnostics.len();

        diagnostics.sort_by(|a, b| a.report_ordering(b));

        if dedup {
            let mut seen = HashSet::new();
            diagnostics.retain(|d| seen.insert(d.dedup_key()));
        }

        let deduped_count = diagnostics.len();
        let stats = DedupStats {
            original_count,
            deduped_count,
            removed_count: original_count - deduped_count,
        };
        (diagnostics, stats)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DedupStats {
    pub original_count: usize,
    pub deduped_count: usize,
    pub removed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Severity};

    fn diag(file: &str, line: usize, message: &str) -> Diagnostic {
        Diagnostic::new(
            "MissingPermission",
            Severity::Error,
            message,
            Location::new(file, line, 5),
        )
    }

    #[test]
    fn finish_orders_by_location() {
        let sink = DiagnosticSink::new();
        sink.emit(diag("b.java", 1, "x"));
        sink.emit(diag("a.java", 9, "x"));
        sink.emit(diag("a.java", 2, "x"));

        let (out, _) = sink.finish(true);
        let lines: Vec<_> = out
            .iter()
            .map(|d| (d.location.file.as_str(), d.location.line))
            .collect();
        assert_eq!(lines, vec![("a.java", 2), ("a.java", 9), ("b.java", 1)]);
    }

    #[test]
    fn detector_errors_are_counted_without_blocking_findings() {
        let sink = DiagnosticSink::new();
        sink.emit(diag("a.java", 3, "survives"));
        sink.record_detector_error();
        sink.record_detector_error();

        assert_eq!(sink.detector_errors(), 2);
        let (out, stats) = sink.finish(true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "survives");
        assert_eq!(stats.removed_count, 0);
    }

    #[test]
    fn finish_collapses_exact_duplicates() {
        let sink = DiagnosticSink::new();
        sink.emit(diag("a.java", 3, "same"));
        sink.emit(diag("a.java", 3, "same"));
        sink.emit(diag("a.java", 3, "different"));

        let (out, stats) = sink.finish(true);
        assert_eq!(out.len(), 2);
        assert_eq!(stats.removed_count, 1);
    }
}
