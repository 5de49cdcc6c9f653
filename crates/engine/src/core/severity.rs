use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Informational,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
            Self::Informational => write!(f, "Informational"),
        }
    }
}

impl Severity {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Error => "red",
            Self::Warning => "yellow",
            Self::Informational => "blue",
        }
    }
}
