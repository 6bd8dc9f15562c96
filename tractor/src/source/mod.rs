//! Catalog sources and their per-image rendering.
//!
//! Every source leads its parameter list with `pos.x`, `pos.y` and
//! `brightness`. Those three get analytic derivatives from a single exact
//! render with position gradients; anything after them (shape, Sersic index,
//! bulge fraction) is differentiated numerically by the source type.

mod galaxy;
mod point;


use glam::{DMat2, DVec2};

use crate::params::{ParamSlots, Params};
use crate::patch::{Extent, ModelPatch};
use crate::photocal::Brightness;
use crate::profiles::SersicProfileTable;
use crate::render::{PixelProfile, Precision, RenderContext, UnitFluxGradient};

pub use galaxy::{Galaxy, GalaxyProfile, SersicIndex};
pub use point::PointSource;

const POS_X: usize = 0;
const POS_Y: usize = 1;
const BRIGHTNESS: usize = 2;

/// Slot names shared by all source types, in parameter order.
const BASE_SLOTS: [&str; 3] = ["pos.x", "pos.y", "brightness"];

#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Point(PointSource),
    Galaxy(Galaxy),
}

impl Source {
    /// Short type name used in logs and derivative names.
    pub fn kind(&self) -> &'static str {
        match self {
            Source::Point(_) => "PointSource",
            Source::Galaxy(g) => g.kind(),
        }
    }

    pub fn position(&self) -> DVec2 {
        match self {
            Source::Point(p) => p.position(),
            Source::Galaxy(g) => g.position(),
        }
    }

    pub fn brightness(&self) -> Brightness {
        match self {
            Source::Point(p) => p.brightness(),
            Source::Galaxy(g) => g.brightness(),
        }
    }

    /// Pixel-space profile for the image behind `ctx`.
    pub fn pixel_profile(&self, ctx: &RenderContext<'_>) -> PixelProfile {
        match self {
            Source::Point(p) => p.pixel_profile(),
            Source::Galaxy(g) => g.pixel_profile(ctx, ctx.pixel_of(g.position())),
        }
    }

    /// Unit-flux rendering, `None` when the footprint misses the image.
    pub fn unit_flux_patch(&self, ctx: &RenderContext<'_>) -> Option<ModelPatch> {
        let center = ctx.pixel_of(self.position());
        let profile = self.pixel_profile(ctx);
        let extent = ctx.footprint(center, profile.radius)?;
        Some(ctx.render(&profile.mixture, center, extent, Precision::Approximate))
    }

    /// The source's contribution to the image in counts.
    pub fn model_patch(&self, ctx: &RenderContext<'_>) -> Option<ModelPatch> {
        let counts = ctx
            .image()
            .photocal()
            .brightness_to_counts(&self.brightness());
        self.unit_flux_patch(ctx).map(|p| p.scaled(counts))
    }

    /// Clamp a Sersic index into the domain of `profiles`. Other sources
    /// are unaffected.
    pub fn clamp_to_table(&mut self, profiles: &SersicProfileTable) {
        if let Source::Galaxy(g) = self {
            g.clamp_to_table(profiles);
        }
    }

    /// One entry per thawed parameter, in [`Params::param_names`] order.
    /// `None` marks a derivative with no information for this image.
    pub fn param_derivatives(&self, ctx: &RenderContext<'_>) -> Vec<Option<ModelPatch>> {
        let kind = self.kind();
        let thawed: Vec<usize> = self.slots().thawed().collect();
        let profile = self.pixel_profile(ctx);
        let Some(base) = Linearization::new(ctx, self.position(), self.brightness(), &profile)
        else {
            tracing::debug!(source = kind, image = ctx.image().name(), "no overlap, derivatives skipped");
            return vec![None; thawed.len()];
        };

        thawed
            .into_iter()
            .map(|slot| {
                let patch = match slot {
                    POS_X | POS_Y => {
                        base.gradient
                            .position_derivative(base.cd_inverse, slot, base.counts)
                    }
                    BRIGHTNESS => base.gradient.patch.clone().scaled(base.dcounts),
                    _ => match self {
                        Source::Galaxy(g) => g.numeric_derivative(slot, ctx, &base),
                        Source::Point(_) => unreachable!("point sources have only base slots"),
                    },
                };
                Some(patch.named(format!("d({kind})/d({})", self.slots().names()[slot])))
            })
            .collect()
    }
}

impl From<PointSource> for Source {
    fn from(p: PointSource) -> Self {
        Source::Point(p)
    }
}

impl From<Galaxy> for Source {
    fn from(g: Galaxy) -> Self {
        Source::Galaxy(g)
    }
}

impl Params for Source {
    fn slots(&self) -> &ParamSlots {
        match self {
            Source::Point(p) => p.slots(),
            Source::Galaxy(g) => g.slots(),
        }
    }

    fn slots_mut(&mut self) -> &mut ParamSlots {
        match self {
            Source::Point(p) => p.slots_mut(),
            Source::Galaxy(g) => g.slots_mut(),
        }
    }

    fn value(&self, slot: usize) -> f64 {
        match self {
            Source::Point(p) => p.value(slot),
            Source::Galaxy(g) => g.value(slot),
        }
    }

    fn set_value(&mut self, slot: usize, value: f64) {
        match self {
            Source::Point(p) => p.set_value(slot, value),
            Source::Galaxy(g) => g.set_value(slot, value),
        }
    }

    fn constrain(&mut self) {
        match self {
            Source::Point(p) => p.constrain(),
            Source::Galaxy(g) => g.constrain(),
        }
    }
}

/// Value of one of the shared leading slots.
fn base_value(pos: DVec2, brightness: &Brightness, slot: usize) -> f64 {
    match slot {
        POS_X => pos.x,
        POS_Y => pos.y,
        BRIGHTNESS => brightness.value(),
        _ => unreachable!("slot {slot} is not a base slot"),
    }
}

fn set_base_value(pos: &mut DVec2, brightness: &mut Brightness, slot: usize, value: f64) {
    match slot {
        POS_X => pos.x = value,
        POS_Y => pos.y = value,
        BRIGHTNESS => brightness.set_value(value),
        _ => unreachable!("slot {slot} is not a base slot"),
    }
}

/// Exact render of a source at its current parameters, with what the
/// derivatives need to scale it into counts.
pub(crate) struct Linearization {
    pub center: DVec2,
    pub cd_inverse: DMat2,
    pub counts: f64,
    pub dcounts: f64,
    pub gradient: UnitFluxGradient,
}

impl Linearization {
    fn new(
        ctx: &RenderContext<'_>,
        pos: DVec2,
        brightness: Brightness,
        profile: &PixelProfile,
    ) -> Option<Self> {
        let center = ctx.pixel_of(pos);
        let extent = ctx.footprint(center, profile.radius)?;
        let image = ctx.image();
        Some(Self {
            center,
            cd_inverse: image.wcs().cd_inverse_at(center),
            counts: image.photocal().brightness_to_counts(&brightness),
            dcounts: image.photocal().counts_derivative(&brightness),
            gradient: ctx.render_gradient(&profile.mixture, center, extent),
        })
    }

    pub fn extent(&self) -> Extent {
        self.gradient.patch.extent()
    }

    /// Difference quotient of the counts-scaled model. With `minus` this is
    /// the central difference `(f(p+h) - f(p-h)) / 2h`; without, the
    /// one-sided `(f(p+h) - f(p)) / h`, where `h` may be negative.
    pub fn difference_quotient(
        &self,
        ctx: &RenderContext<'_>,
        plus: &PixelProfile,
        minus: Option<&PixelProfile>,
        step: f64,
    ) -> ModelPatch {
        let extent = self.extent();
        let render = |p: &PixelProfile| ctx.render(&p.mixture, self.center, extent, Precision::Exact);
        let upper = render(plus);
        let (lower, span) = match minus {
            Some(m) => (render(m), 2.0 * step),
            None => (self.gradient.patch.clone(), step),
        };
        upper.difference(&lower).scaled(self.counts / span)
    }
}
