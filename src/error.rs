//! Error types for retry configuration.
//!
//! Source errors are never wrapped: the stream yields the source's own `E`. The only errors this
//! crate defines are the ones raised while validating configuration.

/// Invalid retry configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Scaling factor must be finite and greater than zero.
    #[error("scaling factor must be finite and > 0 (got {0})")]
    InvalidScalingFactor(f64),
}
