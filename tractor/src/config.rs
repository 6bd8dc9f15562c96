//! Configuration types for rendering and optimization.
//!
//! Both structs are flat, serde-friendly and grouped by comments into logical
//! sections. Call `validate()` before handing a hand-built config to the
//! engine; the defaults are always valid.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ============================================================================
// Enums
// ============================================================================

/// Finite-difference scheme for parameters without analytic derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FiniteDifference {
    /// `(f(p + h) - f(p)) / h`: one extra render per parameter.
    #[default]
    Forward,
    /// `(f(p + h) - f(p - h)) / 2h`: two extra renders, second-order accurate.
    Central,
}

// ============================================================================
// Rendering
// ============================================================================

/// Controls how sources are rasterized into model patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Per-pixel tolerance for approximate rasterization of unit-flux
    /// profiles. Zero selects exact evaluation over the whole footprint.
    pub minval: f64,
    /// Footprint half-size in units of the galaxy's half-light radius.
    pub half_light_radii: f64,
    /// Extra footprint margin, in PSF standard deviations.
    pub psf_footprint_sigmas: f64,

    // ------------------------------------------------------------------------
    // Derivatives
    // ------------------------------------------------------------------------
    /// Forward-difference step for shape and bulge-fraction parameters.
    /// The Sersic index carries its own step, see [`crate::SersicIndex`].
    pub shape_step: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            minval: 1e-9,
            half_light_radii: 8.0,
            psf_footprint_sigmas: 5.0,
            shape_step: 1e-3,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.minval.is_finite() && self.minval >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "minval must be finite and >= 0, got {}",
                self.minval
            )));
        }
        if !(self.half_light_radii.is_finite() && self.half_light_radii > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "half_light_radii must be positive, got {}",
                self.half_light_radii
            )));
        }
        if !(self.psf_footprint_sigmas.is_finite() && self.psf_footprint_sigmas >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "psf_footprint_sigmas must be >= 0, got {}",
                self.psf_footprint_sigmas
            )));
        }
        if !(self.shape_step.is_finite() && self.shape_step > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "shape_step must be positive, got {}",
                self.shape_step
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Optimization
// ============================================================================

/// Levenberg-Marquardt settings for [`crate::Tractor::optimize_loop`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Iteration budget; running out is reported as "did not converge".
    pub max_iterations: usize,
    /// Line-search multipliers applied to the proposed step, tried in
    /// increasing order.
    pub step_fractions: Vec<f64>,
    /// Stop once an accepted step improves the log-likelihood by less than this.
    pub dlnp_threshold: f64,

    // ------------------------------------------------------------------------
    // Damping
    // ------------------------------------------------------------------------
    /// Initial damping added to the diagonal of the normal equations
    /// (relative to the diagonal).
    pub damping: f64,
    /// Factor applied to the damping after a rejected step.
    pub lambda_up: f64,
    /// Factor applied to the damping after an accepted step.
    pub lambda_down: f64,
    /// Give up once the damping exceeds this value.
    pub max_damping: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            step_fractions: vec![0.1, 0.3, 1.0],
            dlnp_threshold: 1e-3,
            damping: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_damping: 1e10,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.step_fractions.is_empty() {
            return Err(Error::InvalidConfig(
                "step_fractions must not be empty".to_string(),
            ));
        }
        if self
            .step_fractions
            .iter()
            .any(|a| !(a.is_finite() && *a > 0.0))
        {
            return Err(Error::InvalidConfig(format!(
                "step_fractions must all be positive, got {:?}",
                self.step_fractions
            )));
        }
        if self.step_fractions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidConfig(format!(
                "step_fractions must be strictly increasing, got {:?}",
                self.step_fractions
            )));
        }
        if !(self.dlnp_threshold.is_finite() && self.dlnp_threshold >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "dlnp_threshold must be >= 0, got {}",
                self.dlnp_threshold
            )));
        }
        if !(self.damping >= 0.0 && self.lambda_up > 1.0 && self.lambda_down > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "invalid damping schedule: damping={}, up={}, down={}",
                self.damping, self.lambda_up, self.lambda_down
            )));
        }
        Ok(())
    }
}
