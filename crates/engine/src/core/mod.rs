pub mod config;
pub mod diagnostic;
pub mod error;
pub mod severity;
pub mod sink;

pub use config::EngineConfig;
pub use diagnostic::{Diagnostic, FixKind, Location, SuggestedFix};
pub use error::EngineError;
pub use severity::Severity;
pub use sink::{DedupStats, DiagnosticSink};
