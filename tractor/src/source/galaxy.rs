use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::{base_value, set_base_value, Linearization, BASE_SLOTS};
use crate::config::FiniteDifference;
use crate::math::largest_singular_value;
use crate::mixture::MixtureOfGaussians;
use crate::params::{ParamSlots, Params};
use crate::patch::ModelPatch;
use crate::photocal::Brightness;
use crate::profiles::{
    dev_mixture, exp_mixture, SersicProfileTable, SERSIC_INDEX_MAX, SERSIC_INDEX_MIN,
};
use crate::render::{PixelProfile, RenderContext};
use crate::shape::Shape;

const SHAPE: usize = 3;
/// First slot after the shape: Sersic index or bulge fraction.
const EXTRA: usize = 6;
const SHAPE_DEV: usize = 7;
const END: usize = 10;

/// Sersic index together with how to differentiate through it.
///
/// The profile table has no closed-form index derivative, so the index is
/// always differenced numerically; `step` and `scheme` control how.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SersicIndex {
    pub value: f64,
    pub step: f64,
    pub scheme: FiniteDifference,
}

impl SersicIndex {
    pub const DEFAULT_STEP: f64 = 0.01;

    pub fn new(value: f64) -> Self {
        Self {
            value,
            step: Self::DEFAULT_STEP,
            scheme: FiniteDifference::Forward,
        }
    }

    pub fn with_step(mut self, step: f64, scheme: FiniteDifference) -> Self {
        self.step = step;
        self.scheme = scheme;
        self
    }
}

/// Radial light profile of a galaxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GalaxyProfile {
    /// Exponential disk (Sersic index 1).
    Exp,
    /// de Vaucouleurs (Sersic index 4).
    Dev,
    Sersic(SersicIndex),
    /// Exp disk plus dev bulge, each with its own shape. The galaxy's main
    /// shape belongs to the disk.
    Composite { frac_dev: f64, shape_dev: Shape },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Galaxy {
    pos: DVec2,
    brightness: Brightness,
    shape: Shape,
    profile: GalaxyProfile,
    slots: ParamSlots,
}

impl Galaxy {
    pub fn new(pos: DVec2, brightness: Brightness, shape: Shape, profile: GalaxyProfile) -> Self {
        let mut names: Vec<String> = BASE_SLOTS.iter().map(|s| s.to_string()).collect();
        names.extend(shape.param_names().iter().map(|n| format!("shape.{n}")));
        match &profile {
            GalaxyProfile::Exp | GalaxyProfile::Dev => {}
            GalaxyProfile::Sersic(_) => names.push("sersicindex".to_string()),
            GalaxyProfile::Composite { shape_dev, .. } => {
                names.push("frac_dev".to_string());
                names.extend(
                    shape_dev
                        .param_names()
                        .iter()
                        .map(|n| format!("shape_dev.{n}")),
                );
            }
        }
        Self {
            pos,
            brightness,
            shape,
            profile,
            slots: ParamSlots::new(names),
        }
    }

    pub fn exp(pos: DVec2, brightness: Brightness, shape: impl Into<Shape>) -> Self {
        Self::new(pos, brightness, shape.into(), GalaxyProfile::Exp)
    }

    pub fn dev(pos: DVec2, brightness: Brightness, shape: impl Into<Shape>) -> Self {
        Self::new(pos, brightness, shape.into(), GalaxyProfile::Dev)
    }

    pub fn sersic(
        pos: DVec2,
        brightness: Brightness,
        shape: impl Into<Shape>,
        index: SersicIndex,
    ) -> Self {
        Self::new(pos, brightness, shape.into(), GalaxyProfile::Sersic(index))
    }

    pub fn composite(
        pos: DVec2,
        brightness: Brightness,
        shape_exp: impl Into<Shape>,
        frac_dev: f64,
        shape_dev: impl Into<Shape>,
    ) -> Self {
        let profile = GalaxyProfile::Composite {
            frac_dev,
            shape_dev: shape_dev.into(),
        };
        Self::new(pos, brightness, shape_exp.into(), profile)
    }

    pub fn kind(&self) -> &'static str {
        match self.profile {
            GalaxyProfile::Exp => "ExpGalaxy",
            GalaxyProfile::Dev => "DevGalaxy",
            GalaxyProfile::Sersic(_) => "SersicGalaxy",
            GalaxyProfile::Composite { .. } => "CompositeGalaxy",
        }
    }

    pub fn position(&self) -> DVec2 {
        self.pos
    }

    pub fn brightness(&self) -> Brightness {
        self.brightness
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn profile(&self) -> &GalaxyProfile {
        &self.profile
    }

    /// Unit-flux profile in pixel units for an image whose local WCS is
    /// evaluated at `center`.
    pub(crate) fn pixel_profile(&self, ctx: &RenderContext<'_>, center: DVec2) -> PixelProfile {
        let cd_inverse = ctx.image().wcs().cd_inverse_at(center);
        let radii = ctx.config().half_light_radii;
        let place = |unit: MixtureOfGaussians, shape: &Shape| {
            let t = cd_inverse * shape.to_affine();
            PixelProfile {
                mixture: unit.apply_affine(DVec2::ZERO, t.transpose()),
                radius: radii * largest_singular_value(t),
            }
        };

        match &self.profile {
            GalaxyProfile::Exp => place(exp_mixture(), &self.shape),
            GalaxyProfile::Dev => place(dev_mixture(), &self.shape),
            GalaxyProfile::Sersic(index) => place(ctx.profiles().profile(index.value), &self.shape),
            GalaxyProfile::Composite {
                frac_dev,
                shape_dev,
            } => {
                let f = frac_dev.clamp(0.0, 1.0);
                let mut disk = place(exp_mixture(), &self.shape);
                let mut bulge = place(dev_mixture(), shape_dev);
                disk.mixture.scale_amplitudes(1.0 - f);
                bulge.mixture.scale_amplitudes(f);
                disk.mixture.extend(&bulge.mixture);
                PixelProfile {
                    mixture: disk.mixture,
                    radius: disk.radius.max(bulge.radius),
                }
            }
        }
    }

    /// Finite-difference derivative for a slot past the base three.
    pub(crate) fn numeric_derivative(
        &self,
        slot: usize,
        ctx: &RenderContext<'_>,
        base: &Linearization,
    ) -> ModelPatch {
        let value = self.value(slot);
        let stepped = |v: f64| {
            let mut g = self.clone();
            g.set_value(slot, v);
            g.pixel_profile(ctx, base.center)
        };

        let (step, scheme, lower, upper) = match (&self.profile, slot) {
            (GalaxyProfile::Sersic(index), EXTRA) => (
                index.step,
                index.scheme,
                ctx.profiles().lowest(),
                ctx.profiles().highest(),
            ),
            (GalaxyProfile::Composite { .. }, EXTRA) => {
                (ctx.config().shape_step, FiniteDifference::Forward, 0.0, 1.0)
            }
            _ => (
                ctx.config().shape_step,
                FiniteDifference::Forward,
                f64::NEG_INFINITY,
                f64::INFINITY,
            ),
        };
        let inside = |h: f64| (lower..=upper).contains(&(value + h));

        // Near a domain edge the stepped profile would be clamped, so fall
        // back to a one-sided difference that stays inside.
        match scheme {
            FiniteDifference::Central if inside(step) && inside(-step) => base.difference_quotient(
                ctx,
                &stepped(value + step),
                Some(&stepped(value - step)),
                step,
            ),
            _ => {
                let h = if inside(step) { step } else { -step };
                base.difference_quotient(ctx, &stepped(value + h), None, h)
            }
        }
    }

    /// Clamp the Sersic index into the domain `profiles` covers.
    pub(crate) fn clamp_to_table(&mut self, profiles: &SersicProfileTable) {
        if let GalaxyProfile::Sersic(index) = &mut self.profile {
            index.value = index.value.clamp(profiles.lowest(), profiles.highest());
        }
    }
}

impl Params for Galaxy {
    fn slots(&self) -> &ParamSlots {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut ParamSlots {
        &mut self.slots
    }

    fn value(&self, slot: usize) -> f64 {
        match (slot, &self.profile) {
            (0..SHAPE, _) => base_value(self.pos, &self.brightness, slot),
            (SHAPE..EXTRA, _) => self.shape.values()[slot - SHAPE],
            (EXTRA, GalaxyProfile::Sersic(index)) => index.value,
            (EXTRA, GalaxyProfile::Composite { frac_dev, .. }) => *frac_dev,
            (SHAPE_DEV..END, GalaxyProfile::Composite { shape_dev, .. }) => {
                shape_dev.values()[slot - SHAPE_DEV]
            }
            _ => panic!("{} has no parameter slot {slot}", self.kind()),
        }
    }

    fn set_value(&mut self, slot: usize, value: f64) {
        let kind = self.kind();
        match (slot, &mut self.profile) {
            (0..SHAPE, _) => set_base_value(&mut self.pos, &mut self.brightness, slot, value),
            (SHAPE..EXTRA, _) => self.shape.set_value(slot - SHAPE, value),
            (EXTRA, GalaxyProfile::Sersic(index)) => index.value = value,
            (EXTRA, GalaxyProfile::Composite { frac_dev, .. }) => *frac_dev = value,
            (SHAPE_DEV..END, GalaxyProfile::Composite { shape_dev, .. }) => {
                shape_dev.set_value(slot - SHAPE_DEV, value)
            }
            _ => panic!("{kind} has no parameter slot {slot}"),
        }
    }

    /// Keeps the Sersic index within the built-in table's domain. Fits
    /// against another table narrow it further with
    /// `Source::clamp_to_table`.
    fn constrain(&mut self) {
        self.shape.constrain();
        match &mut self.profile {
            GalaxyProfile::Exp | GalaxyProfile::Dev => {}
            GalaxyProfile::Sersic(index) => {
                index.value = index.value.clamp(SERSIC_INDEX_MIN, SERSIC_INDEX_MAX);
            }
            GalaxyProfile::Composite {
                frac_dev,
                shape_dev,
            } => {
                *frac_dev = frac_dev.clamp(0.0, 1.0);
                shape_dev.constrain();
            }
        }
    }
}
