//! Error types for the modeling library.

use thiserror::Error;

/// Errors surfaced to callers of the modeling library.
///
/// Ordinary numeric edge cases (a source with no overlap, a derivative that
/// cannot be rendered) are not errors; they come back as `None`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("Mixture arrays disagree on component count: amp={amp}, mean={mean}, var={var}")]
    ShapeMismatch { amp: usize, mean: usize, var: usize },

    #[error("Mixture component {component} has a non-positive-definite covariance (det={det})")]
    NonPositiveDefinite { component: usize, det: f64 },

    #[error("Image plane '{plane}' is {actual:?}, expected {expected:?}")]
    PlaneSizeMismatch {
        plane: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("PSF kernel must have odd, non-zero dimensions, got {width}x{height}")]
    InvalidPsfKernel { width: usize, height: usize },

    #[error("PSF kernel sums to {sum}, cannot normalize")]
    DegeneratePsfKernel { sum: f64 },

    #[error("WCS CD matrix is singular (det={det})")]
    SingularWcs { det: f64 },

    #[error("Invalid Sersic calibration range {range}: {reason}")]
    InvalidCalibration { range: usize, reason: String },

    #[error("No thawed parameters to optimize")]
    NoParameters,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::ShapeMismatch {
            amp: 3,
            mean: 2,
            var: 3,
        };
        assert_eq!(
            err.to_string(),
            "Mixture arrays disagree on component count: amp=3, mean=2, var=3"
        );
    }

    #[test]
    fn test_plane_mismatch_message() {
        let err = Error::PlaneSizeMismatch {
            plane: "invvar",
            expected: (10, 5),
            actual: (5, 10),
        };
        assert_eq!(
            err.to_string(),
            "Image plane 'invvar' is (5, 10), expected (10, 5)"
        );
    }
}
