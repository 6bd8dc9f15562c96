//! Print the Gaussian-mixture approximation of Sersic profiles.
//!
//! Usage: `sersic_profiles [INDEX...]`. Without arguments a grid across the
//! calibrated range is printed.

use anyhow::{Context, Result};
use common::log_setup::setup_logging;
use tractor::profiles::{SERSIC_INDEX_MAX, SERSIC_INDEX_MIN};
use tractor::SersicProfileTable;

const GRID_STEP: f64 = 0.25;

fn main() -> Result<()> {
    setup_logging("info");

    let indices: Vec<f64> = std::env::args()
        .skip(1)
        .map(|arg| {
            arg.parse::<f64>()
                .with_context(|| format!("invalid Sersic index '{arg}'"))
        })
        .collect::<Result<_>>()?;
    let indices = if indices.is_empty() {
        let steps = ((SERSIC_INDEX_MAX - SERSIC_INDEX_MIN) / GRID_STEP).floor() as usize;
        (0..=steps)
            .map(|i| SERSIC_INDEX_MIN + i as f64 * GRID_STEP)
            .collect()
    } else {
        indices
    };

    let table = SersicProfileTable::shared();
    for index in indices {
        let mixture = table.profile(index);
        match table.blend_fraction(index) {
            Some(frac) => tracing::info!(
                index,
                components = mixture.k(),
                blend = frac,
                "blended profile"
            ),
            None => tracing::info!(index, components = mixture.k(), "profile"),
        }
        for (k, (amp, var)) in mixture.amp().iter().zip(mixture.var()).enumerate() {
            tracing::info!("  {k:>2}: amp {amp:.6e}  var {:.6e}", var.x_axis.x);
        }
    }
    Ok(())
}
