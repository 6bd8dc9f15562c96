use std::sync::Arc;

use common::Buffer2;

use crate::error::{Error, Result};
use crate::params::{ParamSlots, Params};
use crate::patch::Extent;
use crate::photocal::PhotoCal;
use crate::psf::Psf;
use crate::sky::ConstantSky;
use crate::wcs::Wcs;

/// One calibrated exposure: pixels, per-pixel inverse variance and the
/// models needed to predict them.
///
/// The sky level is the image's only fittable parameter and starts frozen.
#[derive(Debug, Clone)]
pub struct Image {
    name: String,
    data: Buffer2<f64>,
    invvar: Buffer2<f64>,
    psf: Psf,
    wcs: Arc<dyn Wcs>,
    photocal: Arc<dyn PhotoCal>,
    sky: ConstantSky,
    slots: ParamSlots,
}

impl Image {
    pub fn new(
        data: Buffer2<f64>,
        invvar: Buffer2<f64>,
        psf: Psf,
        wcs: Arc<dyn Wcs>,
        photocal: Arc<dyn PhotoCal>,
        sky: ConstantSky,
    ) -> Result<Self> {
        if !data.same_dims(&invvar) {
            return Err(Error::PlaneSizeMismatch {
                plane: "invvar",
                expected: (data.width(), data.height()),
                actual: (invvar.width(), invvar.height()),
            });
        }
        let mut slots = ParamSlots::new(["sky"]);
        slots.freeze_all();
        Ok(Self {
            name: String::from("image"),
            data,
            invvar,
            psf,
            wcs,
            photocal,
            sky,
            slots,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.height()
    }

    pub fn extent(&self) -> Extent {
        Extent::image(self.width(), self.height())
    }

    pub fn data(&self) -> &Buffer2<f64> {
        &self.data
    }

    /// Replace the pixel data, keeping everything else.
    pub fn set_data(&mut self, data: Buffer2<f64>) -> Result<()> {
        if !data.same_dims(&self.data) {
            return Err(Error::PlaneSizeMismatch {
                plane: "data",
                expected: (self.width(), self.height()),
                actual: (data.width(), data.height()),
            });
        }
        self.data = data;
        Ok(())
    }

    pub fn invvar(&self) -> &Buffer2<f64> {
        &self.invvar
    }

    pub fn psf(&self) -> &Psf {
        &self.psf
    }

    pub fn wcs(&self) -> &dyn Wcs {
        self.wcs.as_ref()
    }

    pub fn photocal(&self) -> &dyn PhotoCal {
        self.photocal.as_ref()
    }

    pub fn sky(&self) -> &ConstantSky {
        &self.sky
    }
}

impl Params for Image {
    fn slots(&self) -> &ParamSlots {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut ParamSlots {
        &mut self.slots
    }

    fn value(&self, slot: usize) -> f64 {
        assert_eq!(slot, 0, "image has a single parameter");
        self.sky.value
    }

    fn set_value(&mut self, slot: usize, value: f64) {
        assert_eq!(slot, 0, "image has a single parameter");
        self.sky.value = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photocal::LinearPhotoCal;
    use crate::wcs::NullWcs;

    fn blank(w: usize, h: usize) -> Buffer2<f64> {
        Buffer2::new_default(w, h)
    }

    #[test]
    fn test_mismatched_invvar_rejected() {
        let err = Image::new(
            blank(10, 5),
            blank(5, 10),
            Psf::gaussian(1.0),
            Arc::new(NullWcs::default()),
            Arc::new(LinearPhotoCal::default()),
            ConstantSky::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::PlaneSizeMismatch {
                plane: "invvar",
                expected: (10, 5),
                actual: (5, 10)
            }
        );
    }

    #[test]
    fn test_sky_starts_frozen() {
        let mut image = Image::new(
            blank(4, 4),
            blank(4, 4),
            Psf::gaussian(1.0),
            Arc::new(NullWcs::default()),
            Arc::new(LinearPhotoCal::default()),
            ConstantSky::new(3.0),
        )
        .unwrap();
        assert_eq!(image.num_params(), 0);
        image.thaw("sky");
        assert_eq!(image.get_params(), vec![3.0]);
        image.set_params(&[4.5]);
        assert_eq!(image.sky().value, 4.5);
        assert!(image.set_data(blank(3, 4)).is_err());
    }
}
