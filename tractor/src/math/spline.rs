//! Shape-preserving interpolation through tabulated points.
//!
//! Uses the Fritsch-Carlson piecewise cubic Hermite construction (PCHIP):
//! knot slopes are chosen so the interpolant never overshoots the data, so a
//! monotone run of table values stays monotone between knots. Grids of three
//! or fewer points are interpolated linearly instead; a cubic through so few
//! points is poorly constrained.
//!
//! Outside the knot range the interpolant continues linearly with the
//! end-point slope.

/// Grids at or below this many points use linear interpolation.
const LINEAR_MAX_POINTS: usize = 3;

#[derive(Debug, Clone)]
pub struct MonotoneSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Slope at each knot.
    slopes: Vec<f64>,
    linear: bool,
}

impl MonotoneSpline {
    /// Build an interpolant through `(x[i], y[i])`.
    ///
    /// # Panics
    /// - If `x` and `y` differ in length
    /// - If fewer than 2 points are provided
    /// - If `x` is not strictly increasing
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Self {
        assert_eq!(x.len(), y.len(), "X and Y vectors must have same length");
        assert!(x.len() >= 2, "Need at least 2 points for interpolation");
        assert!(
            x.windows(2).all(|w| w[1] > w[0]),
            "X values must be sorted in strictly ascending order"
        );

        let linear = x.len() <= LINEAR_MAX_POINTS;
        let secants: Vec<f64> = x
            .windows(2)
            .zip(y.windows(2))
            .map(|(xs, ys)| (ys[1] - ys[0]) / (xs[1] - xs[0]))
            .collect();

        let slopes = if linear {
            linear_end_slopes(&secants)
        } else {
            pchip_slopes(&x, &secants)
        };

        Self {
            x,
            y,
            slopes,
            linear,
        }
    }

    pub fn evaluate(&self, at: f64) -> f64 {
        let n = self.x.len();
        if at <= self.x[0] {
            return self.y[0] + self.slopes[0] * (at - self.x[0]);
        }
        if at >= self.x[n - 1] {
            return self.y[n - 1] + self.slopes[n - 1] * (at - self.x[n - 1]);
        }

        // Interval i satisfies x[i] <= at < x[i + 1].
        let i = self.x.partition_point(|&xi| xi <= at) - 1;
        let h = self.x[i + 1] - self.x[i];
        let t = (at - self.x[i]) / h;

        if self.linear {
            return self.y[i] + t * (self.y[i + 1] - self.y[i]);
        }

        let t2 = t * t;
        let t3 = t2 * t;
        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;
        h00 * self.y[i] + h10 * h * self.slopes[i] + h01 * self.y[i + 1] + h11 * h * self.slopes[i + 1]
    }
}

/// For linear interpolation only the end slopes matter (extrapolation).
fn linear_end_slopes(secants: &[f64]) -> Vec<f64> {
    let n = secants.len() + 1;
    let mut slopes = vec![0.0; n];
    slopes[0] = secants[0];
    slopes[n - 1] = secants[secants.len() - 1];
    slopes
}

fn pchip_slopes(x: &[f64], secants: &[f64]) -> Vec<f64> {
    let n = x.len();
    let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    let mut slopes = vec![0.0; n];

    // Interior: weighted harmonic mean of neighbouring secants, zero at extrema.
    for k in 1..n - 1 {
        let (d0, d1) = (secants[k - 1], secants[k]);
        if d0 * d1 <= 0.0 {
            slopes[k] = 0.0;
        } else {
            let w1 = 2.0 * h[k] + h[k - 1];
            let w2 = h[k] + 2.0 * h[k - 1];
            slopes[k] = (w1 + w2) / (w1 / d0 + w2 / d1);
        }
    }

    slopes[0] = pchip_end_slope(h[0], h[1], secants[0], secants[1]);
    slopes[n - 1] = pchip_end_slope(h[n - 2], h[n - 3], secants[n - 2], secants[n - 3]);
    slopes
}

/// Non-centered three-point end slope, limited to keep the end monotone.
fn pchip_end_slope(h0: f64, h1: f64, d0: f64, d1: f64) -> f64 {
    let slope = ((2.0 * h0 + h1) * d0 - h0 * d1) / (h0 + h1);
    if slope.signum() != d0.signum() || d0 == 0.0 {
        0.0
    } else if d0.signum() != d1.signum() && slope.abs() > 3.0 * d0.abs() {
        3.0 * d0
    } else {
        slope
    }
}
