//! Rasterizing unit-flux mixtures through an image's PSF.
//!
//! A [`RenderContext`] binds one image to the render settings and the Sersic
//! table. Sources hand it a mixture in pixel units centered at the origin
//! (profile, shape and local WCS already applied); the context convolves
//! with the PSF and writes the result into a patch of the image.

use std::f64::consts::TAU;
use std::sync::Arc;

use common::Buffer2;
use glam::{DMat2, DVec2};
use rustfft::num_complex::Complex;

use crate::config::RenderConfig;
use crate::image::Image;
use crate::mixture::MixtureOfGaussians;
use crate::patch::{Extent, ModelPatch};
use crate::profiles::SersicProfileTable;
use crate::psf::{KernelTransform, PixelizedPsf, PsfStrategy};

/// Pixel-space profile of a source, before PSF convolution.
#[derive(Debug, Clone)]
pub struct PixelProfile {
    /// Unit-flux mixture centered at the origin, in pixel units.
    pub mixture: MixtureOfGaussians,
    /// Extent of the unconvolved profile worth rendering, in pixels.
    pub radius: f64,
}

/// Exact unit-flux patch plus its derivatives with respect to the pixel
/// position of the source center.
#[derive(Debug, Clone)]
pub struct UnitFluxGradient {
    pub patch: ModelPatch,
    pub d_dx: Buffer2<f64>,
    pub d_dy: Buffer2<f64>,
}

impl UnitFluxGradient {
    /// Derivative of the counts-scaled model with respect to sky position
    /// component `axis`, through the local Jacobian `cd_inverse`.
    pub fn position_derivative(&self, cd_inverse: DMat2, axis: usize, counts: f64) -> ModelPatch {
        let column = cd_inverse.col(axis);
        let mut pixels = self.d_dx.clone();
        pixels.scale(column.x * counts);
        pixels.add_scaled(&self.d_dy, column.y * counts);
        ModelPatch::new(self.patch.x0(), self.patch.y0(), pixels)
    }
}

/// Evaluation accuracy for a single render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Skip pixels below the configured `minval`.
    Approximate,
    Exact,
}

pub struct RenderContext<'a> {
    image: &'a Image,
    config: &'a RenderConfig,
    profiles: &'a SersicProfileTable,
    psf: PsfStrategy<'a>,
    psf_radius: f64,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        image: &'a Image,
        config: &'a RenderConfig,
        profiles: &'a SersicProfileTable,
    ) -> Self {
        Self {
            image,
            config,
            profiles,
            psf: image.psf().strategy(),
            psf_radius: image.psf().radius(config.psf_footprint_sigmas),
        }
    }

    pub fn image(&self) -> &'a Image {
        self.image
    }

    pub fn config(&self) -> &'a RenderConfig {
        self.config
    }

    pub fn profiles(&self) -> &'a SersicProfileTable {
        self.profiles
    }

    /// Sky position to pixel coordinates of this image.
    pub fn pixel_of(&self, pos: DVec2) -> DVec2 {
        self.image.wcs().position_to_pixel(pos)
    }

    /// Pixels worth rendering for a profile of `radius` at `center`, PSF
    /// margin included. `None` when the footprint misses the image.
    pub fn footprint(&self, center: DVec2, radius: f64) -> Option<Extent> {
        Extent::around(center, radius + self.psf_radius, &self.image.extent())
    }

    /// Unit-flux rendering of `profile` at pixel `center` over `extent`.
    pub fn render(
        &self,
        profile: &MixtureOfGaussians,
        center: DVec2,
        extent: Extent,
        precision: Precision,
    ) -> ModelPatch {
        let pixels = match self.psf {
            PsfStrategy::Analytic(psf) => {
                let (x0, x1, y0, y1) = grid_bounds(&extent);
                let convolved = profile.convolve(psf);
                match precision {
                    Precision::Approximate => convolved.evaluate_grid_approx(
                        x0,
                        x1,
                        y0,
                        y1,
                        center.x,
                        center.y,
                        self.config.minval,
                    ),
                    Precision::Exact => {
                        convolved.evaluate_grid_shifted(x0, x1, y0, y1, center.x, center.y)
                    }
                }
            }
            PsfStrategy::Fourier(psf) => FourierRender::new(profile, center, &extent, psf).value(),
        };
        ModelPatch::new(extent.x0, extent.y0, pixels)
    }

    /// Exact unit-flux rendering with position derivatives.
    pub fn render_gradient(
        &self,
        profile: &MixtureOfGaussians,
        center: DVec2,
        extent: Extent,
    ) -> UnitFluxGradient {
        let (value, d_dx, d_dy) = match self.psf {
            PsfStrategy::Analytic(psf) => {
                let (x0, x1, y0, y1) = grid_bounds(&extent);
                let grid = profile
                    .convolve(psf)
                    .shifted(center)
                    .evaluate_grid_with_derivs(x0, x1, y0, y1);
                (grid.value, grid.d_dx, grid.d_dy)
            }
            PsfStrategy::Fourier(psf) => {
                let render = FourierRender::new(profile, center, &extent, psf);
                let (d_dx, d_dy) = render.position_derivatives();
                (render.value(), d_dx, d_dy)
            }
        };
        UnitFluxGradient {
            patch: ModelPatch::new(extent.x0, extent.y0, value),
            d_dx,
            d_dy,
        }
    }
}

fn grid_bounds(extent: &Extent) -> (i32, i32, i32, i32) {
    (
        extent.x0 as i32,
        extent.x1 as i32,
        extent.y0 as i32,
        extent.y1 as i32,
    )
}

/// Product of the analytic mixture spectrum and the kernel spectrum on a
/// square power-of-two grid covering the patch plus the kernel.
struct FourierRender {
    transform: Arc<KernelTransform>,
    product: Vec<Complex<f64>>,
    width: usize,
    height: usize,
}

impl FourierRender {
    fn new(profile: &MixtureOfGaussians, center: DVec2, extent: &Extent, psf: &PixelizedPsf) -> Self {
        let (width, height) = (extent.width(), extent.height());
        let kernel = psf.kernel();
        let n = (width.max(height) + kernel.width().max(kernel.height())).next_power_of_two();
        let transform = psf.transform(n);

        let origin = DVec2::new(extent.x0 as f64, extent.y0 as f64);
        let spectrum = profile
            .shifted(center - origin)
            .fourier_transform(&transform.freqs, &transform.freqs);
        let product = spectrum
            .iter()
            .zip(&transform.spectrum)
            .map(|(a, b)| a * b)
            .collect();

        Self {
            transform,
            product,
            width,
            height,
        }
    }

    fn value(&self) -> Buffer2<f64> {
        self.inverse(self.product.clone())
    }

    /// d/d(center.x) multiplies the spectrum by `-2 pi i v`; same for y.
    fn position_derivatives(&self) -> (Buffer2<f64>, Buffer2<f64>) {
        let n = self.transform.fft.size();
        let freqs = &self.transform.freqs;
        let ramp = |axis_freq: &dyn Fn(usize) -> f64| -> Vec<Complex<f64>> {
            self.product
                .iter()
                .enumerate()
                .map(|(i, p)| p * Complex::new(0.0, -TAU * axis_freq(i)))
                .collect()
        };
        let d_dx = ramp(&|i| freqs[i % n]);
        let d_dy = ramp(&|i| freqs[i / n]);
        (self.inverse(d_dx), self.inverse(d_dy))
    }

    fn inverse(&self, mut data: Vec<Complex<f64>>) -> Buffer2<f64> {
        self.transform.fft.inverse(&mut data);
        let n = self.transform.fft.size();
        Buffer2::from_fn(self.width, self.height, |x, y| data[y * n + x].re)
    }
}
