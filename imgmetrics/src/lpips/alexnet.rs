use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::PaddingConfig2d;
use burn::prelude::*;
use burn::tensor::activation::relu;
use burn::tensor::module::max_pool2d;

/// Channels of the five compared activations.
pub const TAP_CHANNELS: [usize; 5] = [64, 192, 384, 256, 256];

const SHIFT: [f32; 3] = [-0.030, -0.088, -0.188];
const SCALE: [f32; 3] = [0.458, 0.448, 0.450];
const NORM_EPS: f32 = 1e-10;

/// AlexNet convolution trunk, truncated after the fifth ReLU.
#[derive(Module, Debug)]
pub struct AlexFeatures<B: Backend> {
    pub(crate) conv1: Conv2d<B>,
    pub(crate) conv2: Conv2d<B>,
    pub(crate) conv3: Conv2d<B>,
    pub(crate) conv4: Conv2d<B>,
    pub(crate) conv5: Conv2d<B>,
}

impl<B: Backend> AlexFeatures<B> {
    /// Randomly initialized trunk. Load a record to get usable weights.
    pub fn new(device: &B::Device) -> Self {
        let conv = |channels: [usize; 2], kernel: usize, stride: usize, padding: usize| {
            Conv2dConfig::new(channels, [kernel, kernel])
                .with_stride([stride, stride])
                .with_padding(PaddingConfig2d::Explicit(padding, padding))
                .init(device)
        };

        Self {
            conv1: conv([3, TAP_CHANNELS[0]], 11, 4, 2),
            conv2: conv([TAP_CHANNELS[0], TAP_CHANNELS[1]], 5, 1, 2),
            conv3: conv([TAP_CHANNELS[1], TAP_CHANNELS[2]], 3, 1, 1),
            conv4: conv([TAP_CHANNELS[2], TAP_CHANNELS[3]], 3, 1, 1),
            conv5: conv([TAP_CHANNELS[3], TAP_CHANNELS[4]], 3, 1, 1),
        }
    }

    /// Returns the five ReLU activations.
    pub fn forward(&self, x: Tensor<B, 4>) -> [Tensor<B, 4>; 5] {
        let tap1 = relu(self.conv1.forward(x));
        let tap2 = relu(self.conv2.forward(pool(tap1.clone())));
        let tap3 = relu(self.conv3.forward(pool(tap2.clone())));
        let tap4 = relu(self.conv4.forward(tap3.clone()));
        let tap5 = relu(self.conv5.forward(tap4.clone()));
        [tap1, tap2, tap3, tap4, tap5]
    }
}

fn pool<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    max_pool2d(x, [3, 3], [2, 2], [0, 0], [1, 1])
}

/// One bias-free 1x1 convolution per tap, reducing channels to a single map.
#[derive(Module, Debug)]
pub struct LinearHeads<B: Backend> {
    pub(crate) lin0: Conv2d<B>,
    pub(crate) lin1: Conv2d<B>,
    pub(crate) lin2: Conv2d<B>,
    pub(crate) lin3: Conv2d<B>,
    pub(crate) lin4: Conv2d<B>,
}

impl<B: Backend> LinearHeads<B> {
    pub fn new(device: &B::Device) -> Self {
        let head = |channels: usize| {
            Conv2dConfig::new([channels, 1], [1, 1])
                .with_bias(false)
                .init(device)
        };

        Self {
            lin0: head(TAP_CHANNELS[0]),
            lin1: head(TAP_CHANNELS[1]),
            lin2: head(TAP_CHANNELS[2]),
            lin3: head(TAP_CHANNELS[3]),
            lin4: head(TAP_CHANNELS[4]),
        }
    }

    /// Weighs each squared tap difference and sums the spatial means.
    /// Output shape is `[N, 1, 1, 1]`.
    pub fn forward(&self, diffs: [Tensor<B, 4>; 5]) -> Tensor<B, 4> {
        let [d0, d1, d2, d3, d4] = diffs;
        spatial_average(self.lin0.forward(d0))
            + spatial_average(self.lin1.forward(d1))
            + spatial_average(self.lin2.forward(d2))
            + spatial_average(self.lin3.forward(d3))
            + spatial_average(self.lin4.forward(d4))
    }
}

fn spatial_average<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    x.mean_dim(2).mean_dim(3)
}

/// LPIPS network with an AlexNet trunk.
#[derive(Module, Debug)]
pub struct LpipsAlex<B: Backend> {
    pub(crate) features: AlexFeatures<B>,
    pub(crate) heads: LinearHeads<B>,
}

impl<B: Backend> LpipsAlex<B> {
    /// Randomly initialized network, mostly useful for tests.
    pub fn new(device: &B::Device) -> Self {
        Self::from_parts(AlexFeatures::new(device), LinearHeads::new(device))
    }

    pub fn from_parts(features: AlexFeatures<B>, heads: LinearHeads<B>) -> Self {
        Self { features, heads }
    }

    /// Distance per batch item for two `[N, 3, H, W]` inputs. Output shape is `[N]`.
    pub fn forward(&self, a: Tensor<B, 4>, b: Tensor<B, 4>) -> Tensor<B, 1> {
        let batch = a.dims()[0];
        let [a1, a2, a3, a4, a5] = self.features.forward(scale_input(a));
        let [b1, b2, b3, b4, b5] = self.features.forward(scale_input(b));

        let diffs = [
            tap_difference(a1, b1),
            tap_difference(a2, b2),
            tap_difference(a3, b3),
            tap_difference(a4, b4),
            tap_difference(a5, b5),
        ];
        self.heads.forward(diffs).reshape([batch])
    }
}

fn scale_input<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let device = x.device();
    let shift = Tensor::<B, 1>::from_floats(SHIFT, &device).reshape([1, 3, 1, 1]);
    let scale = Tensor::<B, 1>::from_floats(SCALE, &device).reshape([1, 3, 1, 1]);
    (x - shift) / scale
}

fn unit_normalize<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    let norm = x.clone().powf_scalar(2.0).sum_dim(1).sqrt();
    x / norm.add_scalar(NORM_EPS)
}

fn tap_difference<B: Backend>(a: Tensor<B, 4>, b: Tensor<B, 4>) -> Tensor<B, 4> {
    (unit_normalize(a) - unit_normalize(b)).powf_scalar(2.0)
}
