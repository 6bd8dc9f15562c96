//! Square 2D FFTs by row-column decomposition.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Forward/inverse transforms for `n x n` row-major complex grids.
pub struct Fft2d {
    n: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl Fft2d {
    pub fn new(n: usize) -> Self {
        assert!(n > 0, "FFT size must be positive");
        let mut planner = FftPlanner::new();
        Self {
            n,
            forward: planner.plan_fft_forward(n),
            inverse: planner.plan_fft_inverse(n),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Unnormalized forward transform, in place.
    pub fn forward(&self, data: &mut [Complex<f64>]) {
        self.process(data, self.forward.as_ref());
    }

    /// Inverse transform normalized by `1 / n^2`, in place.
    pub fn inverse(&self, data: &mut [Complex<f64>]) {
        self.process(data, self.inverse.as_ref());
        let norm = 1.0 / (self.n * self.n) as f64;
        for c in data.iter_mut() {
            *c *= norm;
        }
    }

    /// Frequency in cycles per pixel of FFT bin `k` (numpy `fftfreq` order).
    #[inline]
    pub fn frequency(&self, k: usize) -> f64 {
        let n = self.n as isize;
        let k = k as isize;
        let signed = if k < (n + 1) / 2 { k } else { k - n };
        signed as f64 / self.n as f64
    }

    fn process(&self, data: &mut [Complex<f64>], fft: &dyn Fft<f64>) {
        let n = self.n;
        assert_eq!(data.len(), n * n, "FFT buffer must be n*n");

        for row in data.chunks_exact_mut(n) {
            fft.process(row);
        }
        transpose_inplace(data, n);
        for row in data.chunks_exact_mut(n) {
            fft.process(row);
        }
        transpose_inplace(data, n);
    }
}

fn transpose_inplace(data: &mut [Complex<f64>], n: usize) {
    for i in 0..n {
        for j in (i + 1)..n {
            data.swap(i * n + j, j * n + i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_inverse_restores_input() {
        let n = 8;
        let fft = Fft2d::new(n);
        let original: Vec<Complex<f64>> = (0..n * n)
            .map(|i| Complex::new((i as f64 * 0.37).sin(), 0.0))
            .collect();
        let mut data = original.clone();
        fft.forward(&mut data);
        fft.inverse(&mut data);
        for (a, b) in data.iter().zip(original.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_dc_bin_is_sum() {
        let n = 4;
        let fft = Fft2d::new(n);
        let mut data = vec![Complex::new(0.5, 0.0); n * n];
        fft.forward(&mut data);
        assert!((data[0].re - 8.0).abs() < 1e-12);
        assert!(data[1].norm() < 1e-12);
    }

    #[test]
    fn test_frequency_ordering() {
        let fft = Fft2d::new(4);
        let freqs: Vec<f64> = (0..4).map(|k| fft.frequency(k)).collect();
        assert_eq!(freqs, vec![0.0, 0.25, -0.5, -0.25]);
    }
}
