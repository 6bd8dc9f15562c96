use std::f64::consts::PI;

use common::Buffer2;
use rustfft::num_complex::Complex;

use super::MixtureOfGaussians;

impl MixtureOfGaussians {
    /// Analytic Fourier transform on the frequency grid `v x w`.
    ///
    /// `F(v, w) = sum_k amp_k exp(-2 pi^2 nu^T V_k nu) exp(-2 pi i nu . mean_k)`
    /// with `nu = (v, w)` in cycles per pixel. The output is `v.len()` wide
    /// and `w.len()` tall. Degenerate covariances are fine here: a zero
    /// covariance transforms to a pure phase ramp.
    pub fn fourier_transform(&self, v: &[f64], w: &[f64]) -> Buffer2<Complex<f64>> {
        let mut out = Buffer2::new_filled(v.len(), w.len(), Complex::new(0.0, 0.0));
        let two_pi_sq = 2.0 * PI * PI;

        for ((&amp, mean), var) in self.amp.iter().zip(&self.mean).zip(&self.var) {
            let (sxx, sxy, syy) = (var.x_axis.x, var.y_axis.x, var.y_axis.y);
            for (row, &fy) in w.iter().enumerate() {
                let values = out.row_mut(row);
                for (value, &fx) in values.iter_mut().zip(v) {
                    let quad = fx * fx * sxx + 2.0 * fx * fy * sxy + fy * fy * syy;
                    let magnitude = amp * (-two_pi_sq * quad).exp();
                    let phase = -2.0 * PI * (fx * mean.x + fy * mean.y);
                    *value += Complex::from_polar(magnitude, phase);
                }
            }
        }
        out
    }
}
