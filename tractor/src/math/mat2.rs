//! 2x2 matrix helpers on top of `glam::DMat2`.
//!
//! `DMat2` is column-major: `m.x_axis` is the first column, so element
//! `(row i, col j)` is `m.col(j)[i]`.

use glam::DMat2;

/// Average the off-diagonal terms so the matrix is exactly symmetric.
#[inline]
pub fn symmetrized(m: DMat2) -> DMat2 {
    let off = 0.5 * (m.x_axis.y + m.y_axis.x);
    DMat2::from_cols_array(&[m.x_axis.x, off, off, m.y_axis.y])
}

/// Largest singular value of `m` (the spectral norm).
///
/// Used to bound how far a unit circle reaches after mapping through `m`.
pub fn largest_singular_value(m: DMat2) -> f64 {
    // Eigenvalues of M^T M in closed form.
    let mtm = m.transpose() * m;
    let a = mtm.x_axis.x;
    let b = mtm.y_axis.x;
    let d = mtm.y_axis.y;
    let half_trace = 0.5 * (a + d);
    let disc = (0.25 * (a - d) * (a - d) + b * b).sqrt();
    (half_trace + disc).max(0.0).sqrt()
}
