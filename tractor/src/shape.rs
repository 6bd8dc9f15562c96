//! Elliptical galaxy shapes.
//!
//! A shape is the linear map taking a circular unit-radius profile to the
//! galaxy's ellipse in sky units: `G = R(theta) * diag(re, re * ab)`, with
//! `theta` the position angle of the major axis, measured counterclockwise
//! from +x.

use glam::{DMat2, DVec2};
use serde::{Deserialize, Serialize};

/// Largest ellipticity magnitude a shape is kept at. `|e| = 1` is a line.
pub const MAX_ELLIPTICITY: f64 = 0.999;

/// Half-light radius and ellipticity components.
///
/// `e = (1 - ab) / (1 + ab)`, `e1 = e cos(2 theta)`, `e2 = e sin(2 theta)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseE {
    pub re: f64,
    pub e1: f64,
    pub e2: f64,
}

impl EllipseE {
    pub fn new(re: f64, e1: f64, e2: f64) -> Self {
        Self { re, e1, e2 }
    }

    /// Circular shape of radius `re`.
    pub fn circular(re: f64) -> Self {
        Self::new(re, 0.0, 0.0)
    }

    /// From half-light radius, axis ratio `ab` in `(0, 1]` and position
    /// angle in degrees.
    pub fn from_axes(re: f64, ab: f64, phi_deg: f64) -> Self {
        let e = (1.0 - ab) / (1.0 + ab);
        let two_theta = 2.0 * phi_deg.to_radians();
        Self::new(re, e * two_theta.cos(), e * two_theta.sin())
    }

    #[inline]
    pub fn e(&self) -> f64 {
        self.e1.hypot(self.e2)
    }

    /// Minor-to-major axis ratio.
    pub fn axis_ratio(&self) -> f64 {
        let e = self.e().min(MAX_ELLIPTICITY);
        (1.0 - e) / (1.0 + e)
    }

    /// Position angle of the major axis in radians.
    pub fn theta(&self) -> f64 {
        0.5 * self.e2.atan2(self.e1)
    }

    /// Unit circle to ellipse, in sky units.
    pub fn to_affine(&self) -> DMat2 {
        DMat2::from_angle(self.theta())
            * DMat2::from_diagonal(DVec2::new(self.re, self.re * self.axis_ratio()))
    }

    /// Pull the shape back to a positive radius and `|e| <= MAX_ELLIPTICITY`.
    pub fn constrained(&self) -> Self {
        let e = self.e();
        let (e1, e2) = if e > MAX_ELLIPTICITY {
            let s = MAX_ELLIPTICITY / e;
            (self.e1 * s, self.e2 * s)
        } else {
            (self.e1, self.e2)
        };
        Self::new(self.re.abs(), e1, e2)
    }
}

/// Unconstrained parameterization of [`EllipseE`] for optimization.
///
/// `re = exp(log_re)` and `|e| = tanh(|ee|)`, so every real parameter vector
/// is a valid ellipse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EllipseESoft {
    pub log_re: f64,
    pub ee1: f64,
    pub ee2: f64,
}

impl EllipseESoft {
    pub fn new(log_re: f64, ee1: f64, ee2: f64) -> Self {
        Self { log_re, ee1, ee2 }
    }

    pub fn from_ellipse(e: &EllipseE) -> Self {
        let mag = e.e().min(MAX_ELLIPTICITY);
        let scale = if mag > 0.0 { mag.atanh() / e.e() } else { 0.0 };
        Self::new(e.re.ln(), e.e1 * scale, e.e2 * scale)
    }

    pub fn to_ellipse(&self) -> EllipseE {
        let ee = self.ee1.hypot(self.ee2);
        let scale = if ee > 0.0 { ee.tanh() / ee } else { 0.0 };
        EllipseE::new(self.log_re.exp(), self.ee1 * scale, self.ee2 * scale)
    }
}

/// A galaxy shape in either parameterization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    E(EllipseE),
    ESoft(EllipseESoft),
}

impl Shape {
    pub fn ellipse(&self) -> EllipseE {
        match self {
            Shape::E(e) => *e,
            Shape::ESoft(s) => s.to_ellipse(),
        }
    }

    pub fn to_affine(&self) -> DMat2 {
        self.ellipse().to_affine()
    }

    /// Half-light radius in sky units.
    pub fn re(&self) -> f64 {
        self.ellipse().re
    }

    pub fn param_names(&self) -> [&'static str; 3] {
        match self {
            Shape::E(_) => ["re", "e1", "e2"],
            Shape::ESoft(_) => ["logre", "ee1", "ee2"],
        }
    }

    pub fn values(&self) -> [f64; 3] {
        match self {
            Shape::E(e) => [e.re, e.e1, e.e2],
            Shape::ESoft(s) => [s.log_re, s.ee1, s.ee2],
        }
    }

    /// # Panics
    /// If `i >= 3`.
    pub fn set_value(&mut self, i: usize, value: f64) {
        let slot = match self {
            Shape::E(e) => [&mut e.re, &mut e.e1, &mut e.e2],
            Shape::ESoft(s) => [&mut s.log_re, &mut s.ee1, &mut s.ee2],
        };
        let [a, b, c] = slot;
        match i {
            0 => *a = value,
            1 => *b = value,
            2 => *c = value,
            _ => panic!("shape parameter index {i} out of range"),
        }
    }

    /// Keep an `EllipseE` inside its valid domain; soft shapes need nothing.
    pub fn constrain(&mut self) {
        if let Shape::E(e) = self {
            *e = e.constrained();
        }
    }
}

impl From<EllipseE> for Shape {
    fn from(e: EllipseE) -> Self {
        Shape::E(e)
    }
}

impl From<EllipseESoft> for Shape {
    fn from(s: EllipseESoft) -> Self {
        Shape::ESoft(s)
    }
}
