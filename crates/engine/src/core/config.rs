use crate::runner::DetectorKind;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub parallel_execution: bool,
    pub deduplication_enabled: bool,
    /// Detectors to run. Empty means the full built-in set.
    pub enabled_detectors: Vec<DetectorKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_execution: true,
            deduplication_enabled: true,
            enabled_detectors: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn detectors(&self) -> Vec<DetectorKind> {
        if self.enabled_detectors.is_empty() {
            DetectorKind::all().to_vec()
        } else {
            self.enabled_detectors.clone()
        }
    }

    pub fn with_detectors(mut self, detectors: Vec<DetectorKind>) -> Self {
        self.enabled_detectors = detectors;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel_execution = false;
        self
    }
}
