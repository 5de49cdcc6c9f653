pub mod detectors;
pub mod scan;
