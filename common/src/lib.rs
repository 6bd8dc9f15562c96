//! Shared building blocks for the tractor workspace: the row-major pixel
//! buffer used for images and patches, and process-level logging setup.

pub mod buffer2;
pub mod log_setup;

pub use buffer2::Buffer2;

/// Absolute tolerance used when comparing pixel values for equality.
pub const EPSILON: f64 = 1e-12;
