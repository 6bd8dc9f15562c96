//! Unit-flux radial profiles expressed as Gaussian mixtures.
//!
//! All profiles are circular, centered at the origin and scaled to a
//! half-light radius of one; the galaxy shape stretches them afterwards.

mod sersic;
mod table;


use crate::mixture::MixtureOfGaussians;

pub use sersic::{SersicKnot, SersicProfileTable, SersicRange};

/// Sersic index range covered by the built-in calibration.
pub const SERSIC_INDEX_MIN: f64 = 0.3;
pub const SERSIC_INDEX_MAX: f64 = 6.3;

const EXP_AMP: [f64; 6] = [
    2.34853813e-03,
    3.07995260e-02,
    2.23364214e-01,
    1.17949102e+00,
    4.33873750e+00,
    5.99820770e+00,
];
const EXP_VAR: [f64; 6] = [
    1.20078965e-03,
    8.84526493e-03,
    3.91463084e-02,
    1.39976817e-01,
    4.60962500e-01,
    1.50159566e+00,
];

const DEV_AMP: [f64; 8] = [
    4.26347652e-02,
    2.40127183e-01,
    6.85907632e-01,
    1.51937350e+00,
    2.83627243e+00,
    4.46467501e+00,
    5.72440830e+00,
    5.60989349e+00,
];
const DEV_VAR: [f64; 8] = [
    2.23759216e-04,
    1.00220099e-03,
    4.18731126e-03,
    1.69432589e-02,
    6.84850479e-02,
    2.87207080e-01,
    1.33320254e+00,
    8.40215071e+00,
];

/// Six-component exponential disk profile.
pub fn exp_mixture() -> MixtureOfGaussians {
    let mut mixture = MixtureOfGaussians::from_isotropic(&EXP_AMP, &EXP_VAR);
    mixture.normalize();
    mixture
}

/// Eight-component de Vaucouleurs profile.
pub fn dev_mixture() -> MixtureOfGaussians {
    let mut mixture = MixtureOfGaussians::from_isotropic(&DEV_AMP, &DEV_VAR);
    mixture.normalize();
    mixture
}
