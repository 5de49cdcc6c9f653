//! Closed detector dispatch table.
//!
//! The detector set is a fixed enum rather than an open registry: adding a
//! detector means adding a variant, and every match below is checked by the
//! compiler. Handlers stay plain functions in `detectors/`.

use crate::core::{Diagnostic, EngineError};
use crate::detectors::{self, FileContext};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectorKind {
    MissingPermission,
    Range,
    NewApi,
    UnsafeImplicitIntentLaunch,
}

impl DetectorKind {
    pub const fn all() -> [DetectorKind; 4] {
        [
            Self::MissingPermission,
            Self::Range,
            Self::NewApi,
            Self::UnsafeImplicitIntentLaunch,
        ]
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::MissingPermission => detectors::permission::RULE,
            Self::Range => detectors::range::RULE,
            Self::NewApi => detectors::api_level::RULE,
            Self::UnsafeImplicitIntentLaunch => detectors::implicit_intent::RULE,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::MissingPermission => {
                "Calls requiring permissions the manifest does not declare or handle"
            }
            Self::Range => "Arguments provably violating @IntRange/@FloatRange/@Size contracts",
            Self::NewApi => "Calls into APIs newer than the module's minSdkVersion",
            Self::UnsafeImplicitIntentLaunch => {
                "Implicit intents matching only non-exported components"
            }
        }
    }

    pub fn from_id(id: &str) -> Result<Self, EngineError> {
        Self::all()
            .into_iter()
            .find(|k| k.id() == id)
            .ok_or_else(|| EngineError::UnknownDetector(id.to_string()))
    }

    pub fn run(self, ctx: &FileContext<'_>) -> Result<Vec<Diagnostic>> {
        match self {
            Self::MissingPermission => detectors::permission::run(ctx),
            Self::Range => detectors::range::run(ctx),
            Self::NewApi => detectors::api_level::run(ctx),
            Self::UnsafeImplicitIntentLaunch => detectors::implicit_intent::run(ctx),
        }
    }
}

impl std::fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for kind in DetectorKind::all() {
            assert_eq!(DetectorKind::from_id(kind.id()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_id_is_an_error() {
        assert!(DetectorKind::from_id("NoSuchDetector").is_err());
    }
}
