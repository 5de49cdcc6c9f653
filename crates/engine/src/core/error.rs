use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to parse manifest: {0}")]
    ManifestParse(String),

    #[error("failed to load program model: {0}")]
    ModelLoad(String),

    #[error("unknown detector id: {0}")]
    UnknownDetector(String),
}
