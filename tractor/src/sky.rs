use common::Buffer2;
use serde::{Deserialize, Serialize};

use crate::patch::{Extent, ModelPatch};

/// Flat background level, in counts per pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantSky {
    pub value: f64,
}

impl ConstantSky {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn add_to(&self, image: &mut Buffer2<f64>) {
        for v in image.iter_mut() {
            *v += self.value;
        }
    }

    /// Derivative of the model with respect to the sky level: one everywhere.
    pub fn derivative(&self, width: usize, height: usize) -> ModelPatch {
        ModelPatch::filled(Extent::image(width, height), 1.0).named("d(sky)")
    }
}
