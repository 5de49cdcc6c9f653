//! Analysis orchestration.
//!
//! Builds per-module snapshots (rule table, manifest, registered
//! receivers), fans file analyses out over a rayon pool, and merges the
//! results through the diagnostic sink. Detector-internal errors never
//! abort a run: the failing detector/file pair is logged and counted, and
//! every other result stands.

mod dispatch;

pub use dispatch::DetectorKind;

use crate::analysis::intent_flow::{collect_registered_receivers, RegisteredReceivers};
use crate::core::{DedupStats, Diagnostic, DiagnosticSink, EngineConfig, Severity};
use crate::detectors::{self, FileContext};
use crate::model::rules::RuleTable;
use crate::model::semantic::{ModuleModel, ProjectModel, SourceFile};
use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;

pub struct AnalysisEngine {
    config: EngineConfig,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl AnalysisEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, project: &ProjectModel) -> Result<AnalysisReport> {
        let detectors = self.config.detectors();
        let rules = RuleTable::for_project(project);
        let sink = DiagnosticSink::new();

        for module in &project.modules {
            let registered = collect_registered_receivers(&module.files);

            if detectors.contains(&DetectorKind::MissingPermission) {
                sink.emit_all(detectors::permission::check_manifest(module));
            }

            let analyze = |file: &SourceFile| {
                self.analyze_file(project, module, file, &rules, &registered, &detectors, &sink)
            };
            if self.config.parallel_execution {
                module.files.par_iter().for_each(analyze);
            } else {
                module.files.iter().for_each(analyze);
            }
        }

        let detector_errors = sink.detector_errors();
        let (diagnostics, dedup_stats) = sink.finish(self.config.deduplication_enabled);
        Ok(AnalysisReport {
            diagnostics,
            detector_errors,
            dedup_stats: self.config.deduplication_enabled.then_some(dedup_stats),
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn analyze_file(
        &self,
        project: &ProjectModel,
        module: &ModuleModel,
        file: &SourceFile,
        rules: &RuleTable,
        registered: &RegisteredReceivers,
        detectors: &[DetectorKind],
        sink: &DiagnosticSink,
    ) {
        let ctx = FileContext {
            project,
            module,
            file,
            rules,
            registered,
        };
        for kind in detectors {
            match kind.run(&ctx) {
                Ok(diagnostics) => sink.emit_all(diagnostics),
                Err(error) => {
                    tracing::warn!(
                        detector = kind.id(),
                        file = %file.path,
                        %error,
                        "detector failed; continuing without its findings"
                    );
                    sink.record_detector_error();
                }
            }
        }
    }
}

/// Final result of a run: ordered, deduplicated diagnostics plus the
/// fail-open counters.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub diagnostics: Vec<Diagnostic>,
    pub detector_errors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dedup_stats: Option<DedupStats>,
}

impl AnalysisReport {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::model::manifest::ManifestModel;
    use crate::model::semantic::SourceFile;

    fn sample_project() -> ProjectModel {
        let body = vec![expr_stmt(call(
            "android.location.LocationManager",
            "getLastKnownLocation",
            vec![lit_s("gps")],
        ))];
        ProjectModel::single(ModuleModel {
            name: "app".into(),
            is_library: false,
            depends_on: Vec::new(),
            manifest: ManifestModel {
                package: "test.pkg".into(),
                min_sdk: 21,
                target_sdk: 34,
                ..Default::default()
            },
            files: vec![SourceFile {
                path: "src/Caller.java".into(),
                methods: vec![method("test.pkg.Caller", "locate", vec![], body)],
                fields: Vec::new(),
            }],
            binary_annotations: Vec::new(),
        })
    }

    #[test]
    fn parallel_and_sequential_runs_agree() {
        let project = sample_project();
        let parallel = AnalysisEngine::default().run(&project).unwrap();
        let sequential = AnalysisEngine::new(EngineConfig::default().sequential())
            .run(&project)
            .unwrap();
        assert_eq!(parallel.diagnostics, sequential.diagnostics);
        assert_eq!(parallel.diagnostics.len(), 1);
    }

    #[test]
    fn detector_selection_limits_the_run() {
        let project = sample_project();
        let config = EngineConfig::default().with_detectors(vec![DetectorKind::Range]);
        let report = AnalysisEngine::new(config).run(&project).unwrap();
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn detector_failures_surface_on_the_report_without_dropping_findings() {
        use crate::core::Location;

        // Same merge the runner performs after a handler error was swallowed.
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::new(
            "Range",
            Severity::Warning,
            "kept finding",
            Location::new("src/A.java", 4, 9),
        ));
        sink.record_detector_error();

        let detector_errors = sink.detector_errors();
        let (diagnostics, dedup_stats) = sink.finish(true);
        let report = AnalysisReport {
            diagnostics,
            detector_errors,
            dedup_stats: Some(dedup_stats),
        };

        assert_eq!(report.detector_errors, 1);
        assert_eq!(report.diagnostics.len(), 1);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"detector_errors\": 1"), "json: {json}");
    }

    #[test]
    fn runs_are_idempotent() {
        let project = sample_project();
        let engine = AnalysisEngine::default();
        let first = engine.run(&project).unwrap();
        let second = engine.run(&project).unwrap();
        assert_eq!(first.diagnostics, second.diagnostics);
    }
}
