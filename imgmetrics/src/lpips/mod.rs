//! LPIPS (Learned Perceptual Image Patch Similarity).
//!
//! Compares normalized activations of a pretrained AlexNet trunk through
//! learned per-channel weights. Lower is more similar; identical images
//! score `0.0`.
//!
//! Reference: "The Unreasonable Effectiveness of Deep Features as a Perceptual Metric"
//! <https://arxiv.org/abs/1801.03924>

mod alexnet;
mod weights;

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};

pub use alexnet::{AlexFeatures, LinearHeads, LpipsAlex, TAP_CHANNELS};
pub use weights::LpipsWeights;

use crate::input::{ensure_same_dimensions, Rgb8Image};
use crate::MetricsError;

/// Smallest side length for which every AlexNet stage still has an output.
pub const MIN_SIDE: usize = 31;

/// A perceptual distance between two images of equal size.
pub trait PerceptualDistance {
    /// # Errors
    /// - If the images have different dimensions or cannot be handled by the model
    fn distance(&self, a: &Rgb8Image, b: &Rgb8Image) -> Result<f64, MetricsError>;
}

/// Loaded LPIPS model bound to a device.
///
/// Loading is the expensive part; build one and reuse it for every pair.
pub struct Lpips<B: Backend> {
    model: LpipsAlex<B>,
    device: B::Device,
}

impl<B: Backend> Lpips<B> {
    pub fn new(model: LpipsAlex<B>, device: B::Device) -> Self {
        Self { model, device }
    }

    /// Loads pretrained weights onto `device`.
    ///
    /// # Errors
    /// - If the checkpoint(s) cannot be read
    pub fn load(weights: &LpipsWeights, device: B::Device) -> Result<Self, MetricsError> {
        let model = weights.load::<B>(&device)?;
        Ok(Self::new(model, device))
    }

    /// `[1, 3, H, W]` tensor with values in `[0, 1]`.
    fn to_tensor(&self, img: &Rgb8Image) -> Tensor<B, 4> {
        let data = TensorData::new(img.to_unit_hwc(), [1, img.height(), img.width(), 3]);
        Tensor::<B, 4>::from_data(data, &self.device).permute([0, 3, 1, 2])
    }
}

impl<B: Backend> PerceptualDistance for Lpips<B> {
    fn distance(&self, a: &Rgb8Image, b: &Rgb8Image) -> Result<f64, MetricsError> {
        ensure_same_dimensions(a, b)?;
        let (width, height) = a.dimensions();
        if width < MIN_SIDE || height < MIN_SIDE {
            return Err(MetricsError::ImageTooSmall {
                metric: "LPIPS",
                width,
                height,
                min: MIN_SIDE,
            });
        }

        let distance = self.model.forward(self.to_tensor(a), self.to_tensor(b));
        Ok(distance.into_scalar().elem::<f64>())
    }
}
