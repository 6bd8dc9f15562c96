//! Numeric helpers: 2x2 matrix utilities, interpolation and FFTs.

pub mod fft;
pub mod mat2;
pub mod spline;

pub use fft::Fft2d;
pub use mat2::{largest_singular_value, symmetrized};
pub use spline::MonotoneSpline;
