//! droidlint engine - Android static-analysis core
//!
//! Analyzes a pre-resolved semantic model of an Android project (sources,
//! manifest, annotation metadata) for permission, API-level, value-range
//! and implicit-intent problems. The host front end does the parsing; this
//! crate does the reasoning.

pub mod analysis;
pub mod core;
pub mod detectors;
pub mod model;
pub mod runner;

pub use crate::core::{
    DedupStats, Diagnostic, DiagnosticSink, EngineConfig, EngineError, FixKind, Location,
    Severity, SuggestedFix,
};

pub use model::manifest::{ComponentKind, IntentUseKind, ManifestModel, ProtectionLevel};
pub use model::semantic::{ModuleModel, ProjectModel, SourceFile};

pub use runner::{AnalysisEngine, AnalysisReport, DetectorKind};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
