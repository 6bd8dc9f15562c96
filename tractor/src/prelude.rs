//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use tractor::prelude::*;
//! ```

// Image model
pub use crate::{
    Brightness, ConstantSky, Image, LinearPhotoCal, LinearWcs, MagsPhotoCal, NullWcs, Psf,
};

// Sources
pub use crate::{Catalog, EllipseE, EllipseESoft, Galaxy, Params, PointSource, SersicIndex, Source};

// Fitting
pub use crate::{OptimizerConfig, RenderConfig, Tractor};
