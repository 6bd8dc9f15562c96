//! Positioned pixel buffers for per-source contributions.

use common::{Buffer2, EPSILON};

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)` in image coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extent {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Extent {
    #[inline]
    pub const fn new(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Whole image of the given size.
    #[inline]
    pub const fn image(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub const fn width(&self) -> usize {
        self.x1.saturating_sub(self.x0)
    }

    #[inline]
    pub const fn height(&self) -> usize {
        self.y1.saturating_sub(self.y0)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    #[inline]
    pub const fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    pub fn intersect(&self, other: &Extent) -> Option<Extent> {
        let e = Extent::new(
            self.x0.max(other.x0),
            self.y0.max(other.y0),
            self.x1.min(other.x1),
            self.y1.min(other.y1),
        );
        (!e.is_empty()).then_some(e)
    }

    pub fn union(&self, other: &Extent) -> Extent {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Extent::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    /// Square box of half-size `radius` around `center`, clipped to
    /// `bounds`. `None` when nothing is left.
    pub fn around(center: glam::DVec2, radius: f64, bounds: &Extent) -> Option<Extent> {
        if !(center.is_finite() && radius.is_finite()) {
            return None;
        }
        let lo = |c: f64| (c - radius).floor();
        let hi = |c: f64| (c + radius).ceil() + 1.0;
        let clip = |v: f64, min: usize, max: usize| v.clamp(min as f64, max as f64) as usize;
        let e = Extent::new(
            clip(lo(center.x), bounds.x0, bounds.x1),
            clip(lo(center.y), bounds.y0, bounds.y1),
            clip(hi(center.x), bounds.x0, bounds.x1),
            clip(hi(center.y), bounds.y0, bounds.y1),
        );
        (!e.is_empty()).then_some(e)
    }
}

/// One source's (or one derivative's) contribution to an image.
///
/// Pixels outside the patch are implicitly zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPatch {
    x0: usize,
    y0: usize,
    pixels: Buffer2<f64>,
    name: Option<String>,
}

impl ModelPatch {
    pub fn new(x0: usize, y0: usize, pixels: Buffer2<f64>) -> Self {
        Self {
            x0,
            y0,
            pixels,
            name: None,
        }
    }

    pub fn zeros(extent: Extent) -> Self {
        Self::new(
            extent.x0,
            extent.y0,
            Buffer2::new_default(extent.width(), extent.height()),
        )
    }

    pub fn filled(extent: Extent, value: f64) -> Self {
        Self::new(
            extent.x0,
            extent.y0,
            Buffer2::new_filled(extent.width(), extent.height(), value),
        )
    }

    /// Attach a debugging label, e.g. `d(ExpGalaxy)/d(shape.re)`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn x0(&self) -> usize {
        self.x0
    }

    #[inline]
    pub fn y0(&self) -> usize {
        self.y0
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.pixels.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.pixels.height()
    }

    pub fn extent(&self) -> Extent {
        Extent::new(
            self.x0,
            self.y0,
            self.x0 + self.width(),
            self.y0 + self.height(),
        )
    }

    pub fn pixels(&self) -> &Buffer2<f64> {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut Buffer2<f64> {
        &mut self.pixels
    }

    /// Value at image pixel `(x, y)`; zero outside the patch.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        if self.extent().contains(x, y) {
            self.pixels[(x - self.x0, y - self.y0)]
        } else {
            0.0
        }
    }

    pub fn sum(&self) -> f64 {
        self.pixels.sum()
    }

    /// True when every pixel is zero to within [`EPSILON`].
    pub fn is_zero(&self) -> bool {
        self.pixels.max_abs() <= EPSILON
    }

    pub fn scale(&mut self, factor: f64) {
        self.pixels.scale(factor);
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        self.scale(factor);
        self
    }

    /// `image += scale * self` over the part of the patch inside the image.
    pub fn add_scaled_to(&self, image: &mut Buffer2<f64>, scale: f64) {
        let bounds = Extent::image(image.width(), image.height());
        let Some(overlap) = self.extent().intersect(&bounds) else {
            return;
        };
        for y in overlap.y0..overlap.y1 {
            let src = self.pixels.row(y - self.y0);
            let dst = image.row_mut(y);
            for x in overlap.x0..overlap.x1 {
                dst[x] += scale * src[x - self.x0];
            }
        }
    }

    pub fn add_to(&self, image: &mut Buffer2<f64>) {
        self.add_scaled_to(image, 1.0);
    }

    /// `self + scale * other` over the union of both extents.
    pub fn combine(&self, other: &ModelPatch, scale: f64) -> ModelPatch {
        let extent = self.extent().union(&other.extent());
        let mut out = ModelPatch::zeros(extent);
        out.accumulate(self, 1.0);
        out.accumulate(other, scale);
        out
    }

    /// `self - other` over the union of both extents.
    pub fn difference(&self, other: &ModelPatch) -> ModelPatch {
        self.combine(other, -1.0)
    }

    /// Restrict the patch to `bounds`. `None` when they do not overlap.
    pub fn clipped(&self, bounds: &Extent) -> Option<ModelPatch> {
        let overlap = self.extent().intersect(bounds)?;
        let pixels = Buffer2::from_fn(overlap.width(), overlap.height(), |x, y| {
            self.pixels[(x + overlap.x0 - self.x0, y + overlap.y0 - self.y0)]
        });
        Some(ModelPatch {
            x0: overlap.x0,
            y0: overlap.y0,
            pixels,
            name: self.name.clone(),
        })
    }

    /// `sum(weight * self * other)` over the overlap of the two patches.
    pub fn weighted_dot(&self, other: &ModelPatch, weight: &Buffer2<f64>) -> f64 {
        let Some(overlap) = self.extent().intersect(&other.extent()) else {
            return 0.0;
        };
        let mut total = 0.0;
        for y in overlap.y0..overlap.y1 {
            let a = self.pixels.row(y - self.y0);
            let b = other.pixels.row(y - other.y0);
            let w = weight.row(y);
            for x in overlap.x0..overlap.x1 {
                total += w[x] * a[x - self.x0] * b[x - other.x0];
            }
        }
        total
    }

    /// `sum(weight * self * image)` over the patch, `image` full-sized.
    pub fn weighted_dot_image(&self, image: &Buffer2<f64>, weight: &Buffer2<f64>) -> f64 {
        let bounds = Extent::image(image.width(), image.height());
        let Some(overlap) = self.extent().intersect(&bounds) else {
            return 0.0;
        };
        let mut total = 0.0;
        for y in overlap.y0..overlap.y1 {
            let a = self.pixels.row(y - self.y0);
            let (img, w) = (image.row(y), weight.row(y));
            for x in overlap.x0..overlap.x1 {
                total += w[x] * a[x - self.x0] * img[x];
            }
        }
        total
    }

    fn accumulate(&mut self, other: &ModelPatch, scale: f64) {
        let (x0, y0) = (self.x0, self.y0);
        for y in 0..other.height() {
            let dst = self.pixels.row_mut(y + other.y0 - y0);
            for (x, v) in other.pixels.row(y).iter().enumerate() {
                dst[x + other.x0 - x0] += scale * v;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;

    fn patch(x0: usize, y0: usize, w: usize, h: usize, v: f64) -> ModelPatch {
        ModelPatch::filled(Extent::new(x0, y0, x0 + w, y0 + h), v)
    }

    #[test]
    fn test_extent_around_clips_to_bounds() {
        let bounds = Extent::image(10, 8);
        let e = Extent::around(DVec2::new(1.2, 6.5), 2.0, &bounds).unwrap();
        assert_eq!(e, Extent::new(0, 4, 5, 8));
        assert!(Extent::around(DVec2::new(50.0, 50.0), 3.0, &bounds).is_none());
        assert!(Extent::around(DVec2::new(f64::NAN, 0.0), 3.0, &bounds).is_none());
    }

    #[test]
    fn test_get_is_zero_outside() {
        let p = patch(2, 3, 2, 2, 5.0);
        assert_eq!(p.get(2, 3), 5.0);
        assert_eq!(p.get(3, 4), 5.0);
        assert_eq!(p.get(4, 4), 0.0);
        assert_eq!(p.get(0, 0), 0.0);
    }

    #[test]
    fn test_add_to_clips_at_image_edge() {
        let mut image = Buffer2::new_default(4, 4);
        patch(3, 3, 3, 3, 1.0).add_to(&mut image);
        assert_eq!(image.sum(), 1.0);
        assert_eq!(image[(3, 3)], 1.0);
    }

    #[test]
    fn test_difference_covers_union() {
        let a = patch(0, 0, 2, 2, 3.0);
        let b = patch(1, 1, 2, 2, 1.0).named("b");
        let d = a.difference(&b);
        assert_eq!(d.extent(), Extent::new(0, 0, 3, 3));
        assert_eq!(d.get(0, 0), 3.0);
        assert_eq!(d.get(1, 1), 2.0);
        assert_eq!(d.get(2, 2), -1.0);
        assert_eq!(d.get(2, 0), 0.0);
        assert!((d.sum() - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_weighted_dots_use_overlap() {
        let a = patch(0, 0, 3, 3, 2.0);
        let b = patch(2, 2, 3, 3, 4.0);
        let w = Buffer2::new_filled(6, 6, 0.5);
        assert_eq!(a.weighted_dot(&b, &w), 4.0);
        let img = Buffer2::new_filled(6, 6, 1.0);
        assert_eq!(a.weighted_dot_image(&img, &w), 9.0);
    }

    #[test]
    fn test_clipped_keeps_name_and_values() {
        let p = patch(1, 1, 4, 4, 1.0).named("x");
        let c = p.clipped(&Extent::new(0, 0, 3, 3)).unwrap();
        assert_eq!(c.extent(), Extent::new(1, 1, 3, 3));
        assert_eq!(c.name(), Some("x"));
        assert!(p.clipped(&Extent::new(10, 10, 12, 12)).is_none());
        assert!(ModelPatch::zeros(Extent::new(0, 0, 2, 2)).is_zero());
    }
}
