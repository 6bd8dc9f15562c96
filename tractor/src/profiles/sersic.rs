use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::table::RANGES;
use crate::error::{Error, Result};
use crate::math::MonotoneSpline;
use crate::mixture::MixtureOfGaussians;

/// One calibration fit: the mixture that best matches a Sersic profile of
/// the given index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SersicKnot {
    pub index: f64,
    pub amp: Vec<f64>,
    pub var: Vec<f64>,
}

/// Fits sharing a component count, valid for `lo <= index < hi`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SersicRange {
    pub lo: f64,
    pub hi: f64,
    pub knots: Vec<SersicKnot>,
}

impl SersicRange {
    /// The built-in calibration, ordered by index.
    pub fn builtin() -> Vec<SersicRange> {
        RANGES
            .iter()
            .map(|r| SersicRange {
                lo: r.lo,
                hi: r.hi,
                knots: r
                    .knots
                    .iter()
                    .map(|(index, amp, var)| SersicKnot {
                        index: *index,
                        amp: amp.to_vec(),
                        var: var.to_vec(),
                    })
                    .collect(),
            })
            .collect()
    }

    fn check(&self, range: usize) -> Result<()> {
        let fail = |reason: String| Err(Error::InvalidCalibration { range, reason });
        if !(self.lo < self.hi) {
            return fail(format!("empty window [{}, {})", self.lo, self.hi));
        }
        if self.knots.len() < 2 {
            return fail(format!("{} knots, need at least 2", self.knots.len()));
        }
        if self.knots.windows(2).any(|w| w[0].index >= w[1].index) {
            return fail("knot indices are not strictly increasing".to_string());
        }
        let k = self.knots[0].amp.len();
        if k == 0 {
            return fail("knots have no components".to_string());
        }
        for knot in &self.knots {
            if knot.amp.len() != k || knot.var.len() != k {
                return fail(format!(
                    "knot at {} has {} amplitudes and {} variances, expected {k}",
                    knot.index,
                    knot.amp.len(),
                    knot.var.len()
                ));
            }
            if knot.var.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
                return fail(format!("knot at {} has a non-positive variance", knot.index));
            }
        }
        Ok(())
    }
}

/// Per-component interpolants of amplitude and log-variance over one range.
#[derive(Debug)]
struct FittedRange {
    lo: f64,
    hi: f64,
    amp: Vec<MonotoneSpline>,
    log_var: Vec<MonotoneSpline>,
}

impl FittedRange {
    fn fit(range: &SersicRange) -> Self {
        let index: Vec<f64> = range.knots.iter().map(|k| k.index).collect();
        let k = range.knots[0].amp.len();
        let amp = (0..k)
            .map(|i| {
                let values = range.knots.iter().map(|knot| knot.amp[i]).collect();
                MonotoneSpline::new(index.clone(), values)
            })
            .collect();
        let log_var = (0..k)
            .map(|i| {
                let values = range.knots.iter().map(|knot| knot.var[i].ln()).collect();
                MonotoneSpline::new(index.clone(), values)
            })
            .collect();
        Self {
            lo: range.lo,
            hi: range.hi,
            amp,
            log_var,
        }
    }

    #[inline]
    fn contains(&self, index: f64) -> bool {
        self.lo <= index && index < self.hi
    }

    /// Unit-amplitude mixture at `index`.
    fn mixture(&self, index: f64) -> MixtureOfGaussians {
        let amp: Vec<f64> = self.amp.iter().map(|s| s.evaluate(index)).collect();
        let var: Vec<f64> = self.log_var.iter().map(|s| s.evaluate(index).exp()).collect();
        let mut mixture = MixtureOfGaussians::from_isotropic(&amp, &var);
        mixture.normalize();
        mixture
    }
}

/// Sersic profiles of any index in `[0.3, 6.3]`, interpolated from
/// calibration fits.
///
/// The component count changes between index ranges. Neighbouring ranges
/// overlap slightly; inside an overlap both mixtures are returned together,
/// weighted by a linear ramp across the overlap, so rendered flux moves
/// continuously as the index crosses a range boundary. Indices outside the
/// calibrated domain are clamped.
///
/// Building the interpolants is not free. Use [`SersicProfileTable::shared`]
/// for the process-wide instance or build one explicitly and pass it around.
#[derive(Debug)]
pub struct SersicProfileTable {
    ranges: Vec<FittedRange>,
    lowest: f64,
    highest: f64,
}

static SHARED: OnceLock<Arc<SersicProfileTable>> = OnceLock::new();

impl Default for SersicProfileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SersicProfileTable {
    /// Table over the built-in calibration.
    pub fn new() -> Self {
        let ranges = SersicRange::builtin();
        debug_assert!(ranges.iter().enumerate().all(|(i, r)| r.check(i).is_ok()));
        Self::build(&ranges)
    }

    /// Table over caller-provided calibration ranges, ordered by `lo`.
    pub fn from_ranges(ranges: Vec<SersicRange>) -> Result<Self> {
        if ranges.is_empty() {
            return Err(Error::InvalidCalibration {
                range: 0,
                reason: "no ranges".to_string(),
            });
        }
        for (i, range) in ranges.iter().enumerate() {
            range.check(i)?;
        }
        if let Some(i) = ranges.windows(2).position(|w| w[0].lo > w[1].lo) {
            return Err(Error::InvalidCalibration {
                range: i + 1,
                reason: "ranges are not ordered by lower bound".to_string(),
            });
        }
        Ok(Self::build(&ranges))
    }

    /// Process-wide table over the built-in calibration, built on first use.
    pub fn shared() -> Arc<SersicProfileTable> {
        SHARED.get_or_init(|| Arc::new(Self::new())).clone()
    }

    fn build(ranges: &[SersicRange]) -> Self {
        let fitted: Vec<FittedRange> = ranges.iter().map(FittedRange::fit).collect();
        let lowest = fitted[0].lo;
        let highest = fitted[fitted.len() - 1].hi;
        tracing::debug!(
            ranges = fitted.len(),
            lowest,
            highest,
            "Built Sersic profile table"
        );
        Self {
            ranges: fitted,
            lowest,
            highest,
        }
    }

    /// Lowest index the table covers; smaller indices are clamped up to it.
    pub fn lowest(&self) -> f64 {
        self.lowest
    }

    /// Highest index the table covers; larger indices are clamped down to it.
    pub fn highest(&self) -> f64 {
        self.highest
    }

    /// Unit-flux profile of Sersic index `index`, half-light radius one.
    ///
    /// # Panics
    /// If the index falls in zero or more than two ranges, which only a
    /// malformed custom table can produce.
    pub fn profile(&self, index: f64) -> MixtureOfGaussians {
        let index = self.clamp(index);
        if index <= self.lowest {
            return self.ranges[0].mixture(self.lowest);
        }
        if index >= self.highest {
            return self.ranges[self.ranges.len() - 1].mixture(self.highest);
        }

        let (first, second) = self.matching(index);
        match second {
            None => first.mixture(index),
            Some(second) => {
                let frac = (index - second.lo) / (first.hi - second.lo);
                let mut blended = first.mixture(index);
                blended.scale_amplitudes(1.0 - frac);
                let mut upper = second.mixture(index);
                upper.scale_amplitudes(frac);
                blended.extend(&upper);
                blended
            }
        }
    }

    /// Weight of the upper range when `index` lies in an overlap window.
    pub fn blend_fraction(&self, index: f64) -> Option<f64> {
        let index = self.clamp(index);
        if index <= self.lowest || index >= self.highest {
            return None;
        }
        match self.matching(index) {
            (first, Some(second)) => Some((index - second.lo) / (first.hi - second.lo)),
            (_, None) => None,
        }
    }

    fn clamp(&self, index: f64) -> f64 {
        if index.is_nan() {
            tracing::warn!("NaN Sersic index, using the lowest tabulated index");
            return self.lowest;
        }
        index.clamp(self.lowest, self.highest)
    }

    fn matching(&self, index: f64) -> (&FittedRange, Option<&FittedRange>) {
        let mut hits = self.ranges.iter().filter(|r| r.contains(index));
        let first = hits.next();
        let second = hits.next();
        let extra = hits.count();
        match (first, second) {
            (Some(first), second) if extra == 0 => (first, second),
            _ => panic!(
                "Sersic index {index} matches {} calibration ranges, expected 1 or 2",
                first.is_some() as usize + second.is_some() as usize + extra
            ),
        }
    }
}
