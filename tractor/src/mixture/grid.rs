//! Rasterization of a mixture onto integer pixel grids.

use common::Buffer2;
use glam::DVec2;
use rayon::prelude::*;

use super::{MixtureOfGaussians, MAX_MAHALANOBIS_SQ};

/// Grids smaller than this are evaluated on the calling thread.
const PARALLEL_MIN_PIXELS: usize = 16 * 1024;

/// Pixel values of a mixture plus their derivatives with respect to a shift
/// of every component mean.
#[derive(Debug, Clone)]
pub struct GridWithDerivs {
    pub value: Buffer2<f64>,
    /// d(value) / d(mean.x)
    pub d_dx: Buffer2<f64>,
    /// d(value) / d(mean.y)
    pub d_dy: Buffer2<f64>,
}

/// One component with its normalization and inverse covariance cached.
#[derive(Debug, Clone, Copy)]
pub(super) struct Prepared {
    /// `amp / (2 pi sqrt(det))`: the peak value.
    pub(super) peak: f64,
    pub(super) mean: DVec2,
    // Inverse covariance [[ixx, ixy], [ixy, iyy]].
    ixx: f64,
    ixy: f64,
    iyy: f64,
    // Covariance entries needed by the approximate scan.
    sxy: f64,
    syy: f64,
}

impl Prepared {
    /// Density at `p` and the Mahalanobis offset `V^-1 (p - mean)`.
    ///
    /// Points beyond the cutoff evaluate to zero.
    #[inline]
    pub(super) fn value_at(&self, p: DVec2) -> (f64, DVec2) {
        let d = p - self.mean;
        let g = DVec2::new(
            self.ixx * d.x + self.ixy * d.y,
            self.ixy * d.x + self.iyy * d.y,
        );
        let q = d.dot(g);
        if q > MAX_MAHALANOBIS_SQ {
            (0.0, g)
        } else {
            (self.peak * (-0.5 * q).exp(), g)
        }
    }
}

/// Cache per-component constants, with means offset by `shift`.
///
/// Components whose covariance is not finite and positive definite cannot be
/// rasterized; they are skipped with a warning. Zero-amplitude components are
/// dropped silently.
pub(super) fn prepare(mixture: &MixtureOfGaussians, shift: DVec2) -> Vec<Prepared> {
    let mut out = Vec::with_capacity(mixture.k());
    for (k, ((&amp, &mean), &var)) in mixture
        .amp
        .iter()
        .zip(&mixture.mean)
        .zip(&mixture.var)
        .enumerate()
    {
        if amp == 0.0 {
            continue;
        }
        let (sxx, sxy, syy) = (var.x_axis.x, var.y_axis.x, var.y_axis.y);
        let det = sxx * syy - sxy * sxy;
        if !(det.is_finite() && det > 0.0 && sxx > 0.0) {
            tracing::warn!(
                component = k,
                det,
                "skipping mixture component with non-positive-definite covariance"
            );
            continue;
        }
        out.push(Prepared {
            peak: amp / (std::f64::consts::TAU * det.sqrt()),
            mean: mean + shift,
            ixx: syy / det,
            ixy: -sxy / det,
            iyy: sxx / det,
            sxy,
            syy,
        });
    }
    out
}

/// Half-open pixel box `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy)]
struct PixelBox {
    x0: i32,
    y0: i32,
    width: usize,
    height: usize,
}

impl PixelBox {
    fn new(x0: i32, x1: i32, y0: i32, y1: i32) -> Self {
        assert!(x1 >= x0 && y1 >= y0, "empty or inverted pixel box");
        Self {
            x0,
            y0,
            width: (x1 - x0) as usize,
            height: (y1 - y0) as usize,
        }
    }

    #[inline]
    fn pixel(&self, col: usize, row: usize) -> DVec2 {
        DVec2::new(
            (self.x0 as i64 + col as i64) as f64,
            (self.y0 as i64 + row as i64) as f64,
        )
    }

    fn parallel(&self) -> bool {
        self.width * self.height >= PARALLEL_MIN_PIXELS
    }
}

impl MixtureOfGaussians {
    /// Exact values at integer pixel centers `x0..x1` by `y0..y1`.
    ///
    /// Returns a `(x1 - x0) x (y1 - y0)` buffer; rows are `y`.
    pub fn evaluate_grid(&self, x0: i32, x1: i32, y0: i32, y1: i32) -> Buffer2<f64> {
        self.evaluate_grid_shifted(x0, x1, y0, y1, 0.0, 0.0)
    }

    /// Exact values of the mixture translated by `(dx, dy)`.
    pub fn evaluate_grid_shifted(
        &self,
        x0: i32,
        x1: i32,
        y0: i32,
        y1: i32,
        dx: f64,
        dy: f64,
    ) -> Buffer2<f64> {
        let bx = PixelBox::new(x0, x1, y0, y1);
        let components = prepare(self, DVec2::new(dx, dy));
        let mut out = Buffer2::new_default(bx.width, bx.height);
        if bx.width == 0 {
            return out;
        }

        let fill_row = |(row, values): (usize, &mut [f64])| {
            for (col, v) in values.iter_mut().enumerate() {
                let p = bx.pixel(col, row);
                *v = components.iter().map(|c| c.value_at(p).0).sum();
            }
        };
        if bx.parallel() {
            out.pixels_mut()
                .par_chunks_mut(bx.width)
                .enumerate()
                .for_each(fill_row);
        } else {
            out.pixels_mut()
                .chunks_mut(bx.width)
                .enumerate()
                .for_each(fill_row);
        }
        out
    }

    /// Exact values plus derivatives with respect to the mixture position.
    ///
    /// For a component `N(p; m, V)` the derivative with respect to its mean is
    /// `N * V^-1 (p - m)`; all components move together.
    pub fn evaluate_grid_with_derivs(
        &self,
        x0: i32,
        x1: i32,
        y0: i32,
        y1: i32,
    ) -> GridWithDerivs {
        let bx = PixelBox::new(x0, x1, y0, y1);
        let components = prepare(self, DVec2::ZERO);
        let mut value = Buffer2::new_default(bx.width, bx.height);
        let mut d_dx = Buffer2::new_default(bx.width, bx.height);
        let mut d_dy = Buffer2::new_default(bx.width, bx.height);

        for row in 0..bx.height {
            for col in 0..bx.width {
                let p = bx.pixel(col, row);
                let (mut v, mut gx, mut gy) = (0.0, 0.0, 0.0);
                for c in &components {
                    let (n, g) = c.value_at(p);
                    v += n;
                    gx += n * g.x;
                    gy += n * g.y;
                }
                value[(col, row)] = v;
                d_dx[(col, row)] = gx;
                d_dy[(col, row)] = gy;
            }
        }
        GridWithDerivs { value, d_dx, d_dy }
    }

    /// Values of the mixture translated by `(dx, dy)`, skipping pixels whose
    /// contribution is provably small.
    ///
    /// Each of the `K` components is only evaluated where its own value is at
    /// least `minval / K`, so every output pixel differs from
    /// [`evaluate_grid_shifted`](Self::evaluate_grid_shifted) by less than
    /// `minval`. Components are scanned row by row outward from the mean,
    /// and within a row outward from the conditional mean of `x`; a row scan
    /// stops at the first pixel below threshold and the row loop stops at the
    /// first row whose maximum possible value is below threshold.
    /// `minval <= 0` evaluates exactly.
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate_grid_approx(
        &self,
        x0: i32,
        x1: i32,
        y0: i32,
        y1: i32,
        dx: f64,
        dy: f64,
        minval: f64,
    ) -> Buffer2<f64> {
        if !(minval > 0.0) {
            return self.evaluate_grid_shifted(x0, x1, y0, y1, dx, dy);
        }
        let bx = PixelBox::new(x0, x1, y0, y1);
        let mut out = Buffer2::new_default(bx.width, bx.height);
        if bx.width == 0 || bx.height == 0 {
            return out;
        }
        let components = prepare(self, DVec2::new(dx, dy));
        if components.is_empty() {
            return out;
        }
        let threshold = minval / components.len() as f64;
        for c in &components {
            accumulate_approx(c, &bx, threshold, &mut out);
        }
        out
    }
}

fn accumulate_approx(c: &Prepared, bx: &PixelBox, threshold: f64, out: &mut Buffer2<f64>) {
    let y_lo = bx.y0 as i64;
    let y_hi = y_lo + bx.height as i64;
    let x_lo = bx.x0 as i64;
    let x_hi = x_lo + bx.width as i64;
    let peak = c.peak.abs();

    let start_y = (c.mean.y.round() as i64).clamp(y_lo, y_hi - 1);

    // Returns false once this row and every row further out is negligible.
    let mut scan_row = |y: i64| -> bool {
        let ddy = y as f64 - c.mean.y;
        // Minimum over x of the quadratic form within this row.
        let q_row = ddy * ddy / c.syy;
        if q_row > MAX_MAHALANOBIS_SQ || peak * (-0.5 * q_row).exp() < threshold {
            return false;
        }
        let x_center = c.mean.x + c.sxy / c.syy * ddy;
        let start_x = (x_center.round() as i64).clamp(x_lo, x_hi - 1);
        let row = (y - y_lo) as usize;

        let mut visit = |x: i64| -> bool {
            let p = DVec2::new(x as f64, y as f64);
            let (v, _) = c.value_at(p);
            if v.abs() < threshold {
                return false;
            }
            out[((x - x_lo) as usize, row)] += v;
            true
        };
        for x in (x_lo..=start_x).rev() {
            if !visit(x) {
                break;
            }
        }
        for x in start_x + 1..x_hi {
            if !visit(x) {
                break;
            }
        }
        true
    };

    for y in (y_lo..=start_y).rev() {
        if !scan_row(y) {
            break;
        }
    }
    for y in start_y + 1..y_hi {
        if !scan_row(y) {
            break;
        }
    }
}
