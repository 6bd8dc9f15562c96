//! Mixtures of 2D elliptical Gaussians.
//!
//! A light profile is approximated as `sum_k amp[k] * N(mean[k], var[k])`.
//! Gaussian sums are closed under affine maps and under convolution, which is
//! what makes it possible to carry a galaxy profile through the shape
//! transform, the local WCS Jacobian and the PSF without touching pixels.
//! Rasterization lives in [`grid`]; the analytic Fourier transform used with
//! pixelized PSFs lives in [`fourier`].

mod fourier;
mod grid;

#[cfg(test)]
mod tests;

use std::fmt;

use glam::{DMat2, DVec2};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::symmetrized;

pub use grid::GridWithDerivs;

/// Quadratic-form value `d^T V^-1 d` beyond which a component contributes
/// nothing: `exp(-350)` is far below any pixel value of interest.
pub const MAX_MAHALANOBIS_SQ: f64 = 700.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureOfGaussians {
    amp: Vec<f64>,
    mean: Vec<DVec2>,
    var: Vec<DMat2>,
}

impl MixtureOfGaussians {
    /// Build a mixture from per-component amplitudes, means and covariances.
    ///
    /// Covariances are symmetrized on the way in.
    ///
    /// # Panics
    /// If the three vectors disagree on the component count.
    pub fn new(amp: Vec<f64>, mean: Vec<DVec2>, var: Vec<DMat2>) -> Self {
        assert!(
            amp.len() == mean.len() && amp.len() == var.len(),
            "component count mismatch: amp={}, mean={}, var={}",
            amp.len(),
            mean.len(),
            var.len()
        );
        let mut mixture = Self { amp, mean, var };
        mixture.symmetrize();
        mixture
    }

    /// Checked constructor from raw row-major arrays.
    pub fn try_from_arrays(
        amp: &[f64],
        mean: &[[f64; 2]],
        var: &[[[f64; 2]; 2]],
    ) -> Result<Self> {
        if amp.len() != mean.len() || amp.len() != var.len() {
            return Err(Error::ShapeMismatch {
                amp: amp.len(),
                mean: mean.len(),
                var: var.len(),
            });
        }
        let mean = mean.iter().map(|m| DVec2::from_array(*m)).collect();
        // Row-major [[xx, xy], [yx, yy]] into column-major DMat2.
        let var = var
            .iter()
            .map(|v| DMat2::from_cols_array(&[v[0][0], v[1][0], v[0][1], v[1][1]]))
            .collect();
        Ok(Self::new(amp.to_vec(), mean, var))
    }

    /// Zero-mean, circular components with covariance `variances[k] * I`.
    pub fn from_isotropic(amp: &[f64], variances: &[f64]) -> Self {
        assert_eq!(
            amp.len(),
            variances.len(),
            "component count mismatch: amp={}, var={}",
            amp.len(),
            variances.len()
        );
        Self::new(
            amp.to_vec(),
            vec![DVec2::ZERO; amp.len()],
            variances
                .iter()
                .map(|&v| DMat2::from_diagonal(DVec2::splat(v)))
                .collect(),
        )
    }

    /// A single unit-amplitude component of zero extent at the origin.
    ///
    /// Convolving with it is the identity; this is how point sources pass
    /// through the same machinery as galaxies.
    pub fn delta() -> Self {
        Self::new(vec![1.0], vec![DVec2::ZERO], vec![DMat2::ZERO])
    }

    /// Number of components.
    #[inline]
    pub fn k(&self) -> usize {
        self.amp.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.amp.is_empty()
    }

    #[inline]
    pub fn amp(&self) -> &[f64] {
        &self.amp
    }

    #[inline]
    pub fn mean(&self) -> &[DVec2] {
        &self.mean
    }

    #[inline]
    pub fn var(&self) -> &[DMat2] {
        &self.var
    }

    pub fn total_amplitude(&self) -> f64 {
        self.amp.iter().sum()
    }

    /// Rescale amplitudes to sum to one. A zero-sum mixture is left alone.
    pub fn normalize(&mut self) {
        let total = self.total_amplitude();
        if total != 0.0 {
            self.scale_amplitudes(1.0 / total);
        }
    }

    pub fn scale_amplitudes(&mut self, factor: f64) {
        for a in &mut self.amp {
            *a *= factor;
        }
    }

    /// Force every covariance to be exactly symmetric.
    pub fn symmetrize(&mut self) {
        for v in &mut self.var {
            *v = symmetrized(*v);
        }
    }

    /// Translate every component by `shift`.
    pub fn shifted(&self, shift: DVec2) -> Self {
        Self {
            amp: self.amp.clone(),
            mean: self.mean.iter().map(|m| *m + shift).collect(),
            var: self.var.clone(),
        }
    }

    /// Append `other`'s components without renormalizing.
    pub fn extend(&mut self, other: &Self) {
        self.amp.extend_from_slice(&other.amp);
        self.mean.extend_from_slice(&other.mean);
        self.var.extend_from_slice(&other.var);
    }

    /// Union of both component sets, renormalized to unit total amplitude.
    pub fn sum(&self, other: &Self) -> Self {
        let mut out = self.clone();
        out.extend(other);
        out.normalize();
        out
    }

    /// `mean' = mean + shift`, `var' = scale^T * var * scale`.
    ///
    /// To map the profile through a linear transform `x' = M x`, pass
    /// `scale = M^T`.
    pub fn apply_affine(&self, shift: DVec2, scale: DMat2) -> Self {
        let scale_t = scale.transpose();
        Self::new(
            self.amp.clone(),
            self.mean.iter().map(|m| *m + shift).collect(),
            self.var.iter().map(|v| scale_t * *v * scale).collect(),
        )
    }

    /// Exact convolution with another mixture.
    ///
    /// Every pair of components yields one output component with multiplied
    /// amplitudes and summed means and covariances, so the result has
    /// `self.k() * other.k()` components. Blocks are ordered by `other`'s
    /// component, each block holding all of `self`'s components.
    pub fn convolve(&self, other: &Self) -> Self {
        let k = self.k() * other.k();
        let mut amp = Vec::with_capacity(k);
        let mut mean = Vec::with_capacity(k);
        let mut var = Vec::with_capacity(k);
        for ((oa, om), ov) in other.amp.iter().zip(&other.mean).zip(&other.var) {
            for ((sa, sm), sv) in self.amp.iter().zip(&self.mean).zip(&self.var) {
                amp.push(sa * oa);
                mean.push(*sm + *om);
                var.push(*sv + *ov);
            }
        }
        Self::new(amp, mean, var)
    }

    /// Check every covariance is finite and positive definite.
    pub fn validate(&self) -> Result<()> {
        for (component, v) in self.var.iter().enumerate() {
            let det = v.determinant();
            if !(det.is_finite() && det > 0.0 && v.x_axis.x > 0.0) {
                return Err(Error::NonPositiveDefinite { component, det });
            }
        }
        Ok(())
    }

    /// Evaluate the mixture density at arbitrary positions.
    pub fn evaluate(&self, points: &[DVec2]) -> Vec<f64> {
        let components = grid::prepare(self, DVec2::ZERO);
        points
            .iter()
            .map(|&p| components.iter().map(|c| c.value_at(p).0).sum())
            .collect()
    }
}

impl std::ops::Add for &MixtureOfGaussians {
    type Output = MixtureOfGaussians;

    fn add(self, other: &MixtureOfGaussians) -> MixtureOfGaussians {
        self.sum(other)
    }
}

impl fmt::Display for MixtureOfGaussians {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "MixtureOfGaussians with {} components:", self.k())?;
        for ((a, m), v) in self.amp.iter().zip(&self.mean).zip(&self.var) {
            writeln!(
                f,
                "  amp={a:.6e} mean=({:.4}, {:.4}) var=[[{:.6e}, {:.6e}], [{:.6e}, {:.6e}]]",
                m.x, m.y, v.x_axis.x, v.y_axis.x, v.x_axis.y, v.y_axis.y
            )?;
        }
        Ok(())
    }
}
