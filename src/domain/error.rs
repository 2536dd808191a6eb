// Error taxonomy for the annotation engine
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnotationError {
    /// Network failure, unusable upstream payload, or no data for a location
    #[error("series data unavailable: {0}")]
    DataUnavailable(String),

    #[error("invalid polygon geometry: {0}")]
    InvalidGeometry(String),

    #[error("region {0} not found")]
    RegionNotFound(String),

    #[error("color rule index {0} out of range")]
    RuleNotFound(usize),
}
