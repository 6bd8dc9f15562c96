use glam::DVec2;

use super::{base_value, set_base_value, BASE_SLOTS};
use crate::mixture::MixtureOfGaussians;
use crate::params::{ParamSlots, Params};
use crate::photocal::Brightness;
use crate::render::PixelProfile;

/// An unresolved source: the PSF itself, scaled and placed.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSource {
    pos: DVec2,
    brightness: Brightness,
    slots: ParamSlots,
}

impl PointSource {
    pub fn new(pos: DVec2, brightness: Brightness) -> Self {
        Self {
            pos,
            brightness,
            slots: ParamSlots::new(BASE_SLOTS),
        }
    }

    pub fn position(&self) -> DVec2 {
        self.pos
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub(crate) fn pixel_profile(&self) -> PixelProfile {
        PixelProfile {
            mixture: MixtureOfGaussians::delta(),
            radius: 0.0,
        }
    }
}

impl Params for PointSource {
    fn slots(&self) -> &ParamSlots {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut ParamSlots {
        &mut self.slots
    }

    fn value(&self, slot: usize) -> f64 {
        base_value(self.pos, &self.brightness, slot)
    }

    fn set_value(&mut self, slot: usize, value: f64) {
        set_base_value(&mut self.pos, &mut self.brightness, slot, value);
    }
}
