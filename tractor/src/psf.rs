//! Point-spread functions.
//!
//! A PSF is either an analytic Gaussian mixture, convolved with galaxy
//! mixtures in closed form, or a pixelized kernel, applied by multiplying
//! Fourier transforms. Which path a renderer takes is decided once per image
//! through [`Psf::strategy`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use common::Buffer2;
use parking_lot::Mutex;
use rustfft::num_complex::Complex;

use crate::error::{Error, Result};
use crate::math::{largest_singular_value, Fft2d};
use crate::mixture::MixtureOfGaussians;

#[derive(Debug, Clone, PartialEq)]
pub enum Psf {
    Mixture(MixtureOfGaussians),
    Pixelized(PixelizedPsf),
}

/// How a renderer should apply an image's PSF.
#[derive(Debug, Clone, Copy)]
pub enum PsfStrategy<'a> {
    /// Closed-form mixture convolution.
    Analytic(&'a MixtureOfGaussians),
    /// Product with the kernel spectrum in Fourier space.
    Fourier(&'a PixelizedPsf),
}

impl Psf {
    /// Single circular Gaussian of standard deviation `sigma` pixels.
    pub fn gaussian(sigma: f64) -> Self {
        Self::n_circular_gaussian(&[sigma], &[1.0])
    }

    /// Concentric circular Gaussians, weights normalized to unit sum.
    pub fn n_circular_gaussian(sigmas: &[f64], weights: &[f64]) -> Self {
        let variances: Vec<f64> = sigmas.iter().map(|s| s * s).collect();
        let mut mixture = MixtureOfGaussians::from_isotropic(weights, &variances);
        mixture.normalize();
        Psf::Mixture(mixture)
    }

    pub fn pixelized(kernel: Buffer2<f64>) -> Result<Self> {
        PixelizedPsf::new(kernel).map(Psf::Pixelized)
    }

    pub fn strategy(&self) -> PsfStrategy<'_> {
        match self {
            Psf::Mixture(m) => PsfStrategy::Analytic(m),
            Psf::Pixelized(p) => PsfStrategy::Fourier(p),
        }
    }

    /// Footprint margin in pixels: `sigmas` standard deviations of the
    /// widest component, or the kernel half-size.
    pub fn radius(&self, sigmas: f64) -> f64 {
        match self {
            Psf::Mixture(m) => m
                .mean()
                .iter()
                .zip(m.var())
                .map(|(mean, var)| mean.length() + sigmas * largest_singular_value(*var).sqrt())
                .fold(0.0, f64::max),
            Psf::Pixelized(p) => p.half_width().max(p.half_height()) as f64,
        }
    }
}

/// Odd-sized, unit-sum PSF image with its center at the middle pixel.
///
/// Transforms are planned and the kernel spectrum computed once per FFT
/// size; clones share them.
#[derive(Debug, Clone)]
pub struct PixelizedPsf {
    kernel: Buffer2<f64>,
    transforms: TransformCache,
}

impl PartialEq for PixelizedPsf {
    fn eq(&self, other: &Self) -> bool {
        self.kernel == other.kernel
    }
}

/// A planned `n x n` transform with its frequencies and the kernel spectrum.
pub(crate) struct KernelTransform {
    pub fft: Fft2d,
    pub freqs: Vec<f64>,
    pub spectrum: Vec<Complex<f64>>,
}

#[derive(Clone, Default)]
struct TransformCache(Arc<Mutex<HashMap<usize, Arc<KernelTransform>>>>);

impl TransformCache {
    fn sizes(&self) -> Vec<usize> {
        let mut sizes: Vec<usize> = self.0.lock().keys().copied().collect();
        sizes.sort_unstable();
        sizes
    }
}

impl fmt::Debug for TransformCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransformCache").field(&self.sizes()).finish()
    }
}

impl PixelizedPsf {
    pub fn new(mut kernel: Buffer2<f64>) -> Result<Self> {
        let (w, h) = (kernel.width(), kernel.height());
        if w % 2 == 0 || h % 2 == 0 {
            return Err(Error::InvalidPsfKernel {
                width: w,
                height: h,
            });
        }
        let sum = kernel.sum();
        if !(sum.is_finite() && sum.abs() > 0.0) {
            return Err(Error::DegeneratePsfKernel { sum });
        }
        kernel.scale(1.0 / sum);
        Ok(Self {
            kernel,
            transforms: TransformCache::default(),
        })
    }

    /// Rasterize an analytic PSF onto a `(2 * half_size + 1)^2` kernel.
    pub fn from_mixture(mixture: &MixtureOfGaussians, half_size: usize) -> Result<Self> {
        let h = half_size as i32;
        Self::new(mixture.evaluate_grid(-h, h + 1, -h, h + 1))
    }

    pub fn kernel(&self) -> &Buffer2<f64> {
        &self.kernel
    }

    #[inline]
    pub fn half_width(&self) -> usize {
        self.kernel.width() / 2
    }

    #[inline]
    pub fn half_height(&self) -> usize {
        self.kernel.height() / 2
    }

    /// Planned transform of size `n` and the kernel spectrum on it, built on
    /// first use.
    pub(crate) fn transform(&self, n: usize) -> Arc<KernelTransform> {
        let mut cache = self.transforms.0.lock();
        let entry = cache.entry(n).or_insert_with(|| {
            tracing::debug!(n, "planning PSF transform");
            let fft = Fft2d::new(n);
            let freqs = (0..n).map(|k| fft.frequency(k)).collect();
            let spectrum = self.spectrum(&fft);
            Arc::new(KernelTransform {
                fft,
                freqs,
                spectrum,
            })
        });
        Arc::clone(entry)
    }

    /// FFT sizes planned so far.
    pub fn planned_sizes(&self) -> Vec<usize> {
        self.transforms.sizes()
    }

    /// Kernel spectrum on an `n x n` grid, with the kernel center wrapped to
    /// pixel (0, 0) so the product leaves positions unshifted.
    ///
    /// # Panics
    /// If the kernel does not fit in the transform.
    pub fn spectrum(&self, fft: &Fft2d) -> Vec<Complex<f64>> {
        let n = fft.size();
        assert!(
            self.kernel.width() <= n && self.kernel.height() <= n,
            "kernel {}x{} exceeds FFT size {n}",
            self.kernel.width(),
            self.kernel.height()
        );
        let (cx, cy) = (self.half_width(), self.half_height());
        let mut data = vec![Complex::new(0.0, 0.0); n * n];
        for y in 0..self.kernel.height() {
            let wy = (y + n - cy) % n;
            for (x, &v) in self.kernel.row(y).iter().enumerate() {
                let wx = (x + n - cx) % n;
                data[wy * n + wx] = Complex::new(v, 0.0);
            }
        }
        fft.forward(&mut data);
        data
    }
}
