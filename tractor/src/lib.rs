//! Tractor - forward modeling of astronomical images.
//!
//! Sources (point sources and parametric galaxies) are rendered as mixtures
//! of Gaussians, carried analytically through their shape, the local WCS and
//! the PSF, rasterized into model patches and fit to calibrated images by
//! damped least squares.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tractor::prelude::*;
//!
//! let image = Image::new(data, invvar, Psf::gaussian(2.0), wcs, photocal, ConstantSky::default())?;
//! let mut catalog = Catalog::new();
//! catalog.push(Galaxy::sersic(pos, Brightness::Flux(1000.0), EllipseE::circular(3.0), SersicIndex::new(2.0)));
//!
//! let mut tractor = Tractor::new(vec![image], catalog);
//! let fit = tractor.optimize_loop(&OptimizerConfig::default())?;
//! println!("converged: {}", fit.converged);
//! ```

mod catalog;
mod config;
mod engine;
mod error;
mod image;
pub(crate) mod math;
mod mixture;
mod params;
mod patch;
mod photocal;
pub mod profiles;
mod psf;
mod render;
mod shape;
mod sky;
mod source;
mod wcs;

pub mod prelude;

// ============================================================================
// Errors and configuration
// ============================================================================

pub use config::{FiniteDifference, OptimizerConfig, RenderConfig};
pub use error::{Error, Result};

// ============================================================================
// Gaussian mixtures and profiles
// ============================================================================

pub use mixture::{GridWithDerivs, MixtureOfGaussians, MAX_MAHALANOBIS_SQ};
pub use profiles::{SersicKnot, SersicProfileTable, SersicRange};

// ============================================================================
// Image model
// ============================================================================

pub use image::Image;
pub use patch::{Extent, ModelPatch};
pub use photocal::{Brightness, LinearPhotoCal, MagsPhotoCal, PhotoCal};
pub use psf::{PixelizedPsf, Psf, PsfStrategy};
pub use sky::ConstantSky;
pub use wcs::{LinearWcs, NullWcs, Wcs};

// ============================================================================
// Sources
// ============================================================================

pub use catalog::Catalog;
pub use params::{ParamSlots, Params};
pub use shape::{EllipseE, EllipseESoft, Shape, MAX_ELLIPTICITY};
pub use source::{Galaxy, GalaxyProfile, PointSource, SersicIndex, Source};

// ============================================================================
// Rendering and fitting
// ============================================================================

pub use engine::{Derivatives, FitResult, StepResult, Tractor};
pub use render::{PixelProfile, Precision, RenderContext, UnitFluxGradient};
