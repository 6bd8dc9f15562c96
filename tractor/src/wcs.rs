//! Sky-to-pixel coordinate mappings.

use std::fmt::Debug;

use glam::{DMat2, DVec2};

use crate::error::{Error, Result};

/// Maps source positions to image pixels.
pub trait Wcs: Debug + Send + Sync {
    fn position_to_pixel(&self, pos: DVec2) -> DVec2;

    fn pixel_to_position(&self, pixel: DVec2) -> DVec2;

    /// Local Jacobian `d(pixel) / d(position)` near `pixel`.
    fn cd_inverse_at(&self, pixel: DVec2) -> DMat2;
}

/// Positions are pixel coordinates times `pixscale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullWcs {
    pub pixscale: f64,
}

impl Default for NullWcs {
    fn default() -> Self {
        Self { pixscale: 1.0 }
    }
}

impl NullWcs {
    pub fn new(pixscale: f64) -> Self {
        Self { pixscale }
    }
}

impl Wcs for NullWcs {
    fn position_to_pixel(&self, pos: DVec2) -> DVec2 {
        pos / self.pixscale
    }

    fn pixel_to_position(&self, pixel: DVec2) -> DVec2 {
        pixel * self.pixscale
    }

    fn cd_inverse_at(&self, _pixel: DVec2) -> DMat2 {
        DMat2::from_diagonal(DVec2::splat(1.0 / self.pixscale))
    }
}

/// Tangent-plane-style linear WCS: `pos = crval + cd * (pixel - crpix)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearWcs {
    crpix: DVec2,
    crval: DVec2,
    cd: DMat2,
    cd_inv: DMat2,
}

impl LinearWcs {
    pub fn new(crpix: DVec2, crval: DVec2, cd: DMat2) -> Result<Self> {
        let det = cd.determinant();
        if !(det.is_finite() && det != 0.0) {
            return Err(Error::SingularWcs { det });
        }
        Ok(Self {
            crpix,
            crval,
            cd,
            cd_inv: cd.inverse(),
        })
    }

    pub fn cd(&self) -> DMat2 {
        self.cd
    }
}

impl Wcs for LinearWcs {
    fn position_to_pixel(&self, pos: DVec2) -> DVec2 {
        self.crpix + self.cd_inv * (pos - self.crval)
    }

    fn pixel_to_position(&self, pixel: DVec2) -> DVec2 {
        self.crval + self.cd * (pixel - self.crpix)
    }

    fn cd_inverse_at(&self, _pixel: DVec2) -> DMat2 {
        self.cd_inv
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_wcs_scales_by_pixscale() {
        let wcs = NullWcs::new(0.25);
        assert_eq!(wcs.position_to_pixel(DVec2::new(1.0, 2.0)), DVec2::new(4.0, 8.0));
        assert_eq!(wcs.cd_inverse_at(DVec2::ZERO).x_axis.x, 4.0);
    }

    #[test]
    fn test_linear_wcs_round_trip() {
        let cd = DMat2::from_cols(DVec2::new(0.0, 0.5), DVec2::new(-0.5, 0.0));
        let wcs = LinearWcs::new(DVec2::new(10.0, 20.0), DVec2::new(100.0, -5.0), cd).unwrap();
        let pixel = DVec2::new(13.0, 17.5);
        let back = wcs.position_to_pixel(wcs.pixel_to_position(pixel));
        assert!((back - pixel).length() < 1e-12);
        let j = wcs.cd_inverse_at(pixel) * wcs.cd();
        assert!(j.abs_diff_eq(DMat2::IDENTITY, 1e-12));
    }

    #[test]
    fn test_singular_cd_rejected() {
        let err = LinearWcs::new(DVec2::ZERO, DVec2::ZERO, DMat2::ZERO).unwrap_err();
        assert!(matches!(err, Error::SingularWcs { .. }));
    }
}
