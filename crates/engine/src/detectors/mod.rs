//! Detector handlers.
//!
//! Each detector is a pure function from a [`FileContext`] to diagnostics:
//! independent, idempotent and re-entrant, so the runner can invoke them
//! from worker threads without coordination. A handler returning `Err`
//! produces no findings for that file; the runner logs and counts it.

pub mod api_level;
pub mod implicit_intent;
pub mod permission;
pub mod range;

use crate::analysis::intent_flow::RegisteredReceivers;
use crate::core::Location;
use crate::model::rules::RuleTable;
use crate::model::semantic::{ModuleModel, ProjectModel, SourceFile, Span};

/// Everything a detector may consult while analyzing one source file. All
/// references are shared read-only snapshots built once per module.
pub struct FileContext<'a> {
    pub project: &'a ProjectModel,
    pub module: &'a ModuleModel,
    pub file: &'a SourceFile,
    pub rules: &'a RuleTable,
    pub registered: &'a RegisteredReceivers,
}

pub(crate) fn span_location(path: &str, span: Option<Span>) -> Location {
    match span {
        Some(s) => s.to_location(path),
        None => Location::new(path, 1, 1),
    }
}
