//! Source brightness and its conversion to image counts.

use std::f64::consts::LN_10;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A source's brightness: a single fittable scalar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Brightness {
    /// Linear flux.
    Flux(f64),
    /// Astronomical magnitude; brighter is smaller.
    Mag(f64),
}

impl Brightness {
    pub fn value(&self) -> f64 {
        match self {
            Brightness::Flux(v) | Brightness::Mag(v) => *v,
        }
    }

    pub fn set_value(&mut self, value: f64) {
        match self {
            Brightness::Flux(v) | Brightness::Mag(v) => *v = value,
        }
    }

    /// Flux relative to magnitude zero, `10^(-m / 2.5)` for magnitudes.
    fn relative_flux(&self) -> f64 {
        match self {
            Brightness::Flux(f) => *f,
            Brightness::Mag(m) => 10f64.powf(-m / 2.5),
        }
    }

    /// `d(relative_flux) / d(value)`.
    fn relative_flux_derivative(&self) -> f64 {
        match self {
            Brightness::Flux(_) => 1.0,
            Brightness::Mag(_) => -self.relative_flux() * LN_10 / 2.5,
        }
    }
}

/// Photometric calibration of one image.
pub trait PhotoCal: Debug + Send + Sync {
    /// Expected total counts in the image from a source of this brightness.
    fn brightness_to_counts(&self, brightness: &Brightness) -> f64;

    /// Derivative of [`brightness_to_counts`](Self::brightness_to_counts)
    /// with respect to the brightness value.
    fn counts_derivative(&self, brightness: &Brightness) -> f64;
}

/// `counts = scale * flux`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearPhotoCal {
    pub scale: f64,
}

impl Default for LinearPhotoCal {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl PhotoCal for LinearPhotoCal {
    fn brightness_to_counts(&self, brightness: &Brightness) -> f64 {
        self.scale * brightness.relative_flux()
    }

    fn counts_derivative(&self, brightness: &Brightness) -> f64 {
        self.scale * brightness.relative_flux_derivative()
    }
}

/// `counts = 10^((zeropoint - mag) / 2.5)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagsPhotoCal {
    pub zeropoint: f64,
}

impl MagsPhotoCal {
    fn zeropoint_scale(&self) -> f64 {
        10f64.powf(self.zeropoint / 2.5)
    }
}

impl PhotoCal for MagsPhotoCal {
    fn brightness_to_counts(&self, brightness: &Brightness) -> f64 {
        self.zeropoint_scale() * brightness.relative_flux()
    }

    fn counts_derivative(&self, brightness: &Brightness) -> f64 {
        self.zeropoint_scale() * brightness.relative_flux_derivative()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mags_zeropoint_gives_unit_counts() {
        let cal = MagsPhotoCal { zeropoint: 22.5 };
        assert!((cal.brightness_to_counts(&Brightness::Mag(22.5)) - 1.0).abs() < 1e-12);
        assert!((cal.brightness_to_counts(&Brightness::Mag(20.0)) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_counts_derivative_matches_finite_difference() {
        let cal = MagsPhotoCal { zeropoint: 25.0 };
        let b = Brightness::Mag(19.3);
        let h = 1e-6;
        let fd = (cal.brightness_to_counts(&Brightness::Mag(19.3 + h))
            - cal.brightness_to_counts(&b))
            / h;
        let analytic = cal.counts_derivative(&b);
        assert!((fd - analytic).abs() < 1e-4 * analytic.abs());
    }

    #[test]
    fn test_linear_flux() {
        let cal = LinearPhotoCal { scale: 2.0 };
        let mut b = Brightness::Flux(10.0);
        assert_eq!(cal.brightness_to_counts(&b), 20.0);
        assert_eq!(cal.counts_derivative(&b), 2.0);
        b.set_value(3.0);
        assert_eq!(b.value(), 3.0);
    }
}
