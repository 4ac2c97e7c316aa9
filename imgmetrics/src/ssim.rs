//! Mean structural similarity (MSSIM) over RGB images.
//!
//! Each channel is scored independently and the three scores are averaged.
//! Local statistics use a square uniform window; the mean is taken over the
//! pixels whose window lies entirely inside the image, so no border padding
//! mode is involved.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::input::{ensure_same_dimensions, Rgb8Image};
use crate::psnr::DATA_RANGE_U8;
use crate::MetricsError;

/// SSIM parameters.
///
/// The defaults are the usual reference settings: a 7x7 uniform window,
/// `K1 = 0.01`, `K2 = 0.03`, an 8-bit data range and sample covariance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SsimConfig {
    /// Side length of the square window. Must be odd.
    pub win_size: usize,
    pub k1: f64,
    pub k2: f64,
    pub data_range: f64,
    /// Normalize variances by `N - 1` instead of `N`.
    pub sample_covariance: bool,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            win_size: 7,
            k1: 0.01,
            k2: 0.03,
            data_range: DATA_RANGE_U8,
            sample_covariance: true,
        }
    }
}

impl SsimConfig {
    #[must_use]
    pub fn with_win_size(mut self, win_size: usize) -> Self {
        self.win_size = win_size;
        self
    }

    fn validate(&self, width: usize, height: usize) -> Result<(), MetricsError> {
        if self.win_size < 3 || self.win_size % 2 == 0 {
            return Err(MetricsError::InvalidWindowSize(self.win_size));
        }
        if width < self.win_size || height < self.win_size {
            return Err(MetricsError::ImageTooSmall {
                metric: "SSIM",
                width,
                height,
                min: self.win_size,
            });
        }
        Ok(())
    }
}

/// SSIM with the default [`SsimConfig`].
///
/// # Errors
/// - If the images have different dimensions
/// - If either side is shorter than the window
pub fn compute_ssim(a: &Rgb8Image, b: &Rgb8Image) -> Result<f64, MetricsError> {
    compute_ssim_with_config(a, b, &SsimConfig::default())
}

/// SSIM averaged over the three channels.
///
/// # Errors
/// - If the images have different dimensions
/// - If the window size is even or smaller than 3
/// - If either side is shorter than the window
pub fn compute_ssim_with_config(
    a: &Rgb8Image,
    b: &Rgb8Image,
    config: &SsimConfig,
) -> Result<f64, MetricsError> {
    ensure_same_dimensions(a, b)?;
    let (width, height) = a.dimensions();
    config.validate(width, height)?;

    let planes_a = a.to_planes_f64();
    let planes_b = b.to_planes_f64();

    #[cfg(feature = "rayon")]
    let channel_scores: Vec<f64> = planes_a[..]
        .par_iter()
        .zip(planes_b[..].par_iter())
        .map(|(x, y)| channel_ssim(x, y, width, height, config))
        .collect();

    #[cfg(not(feature = "rayon"))]
    let channel_scores: Vec<f64> = planes_a
        .iter()
        .zip(planes_b.iter())
        .map(|(x, y)| channel_ssim(x, y, width, height, config))
        .collect();

    Ok(channel_scores.iter().sum::<f64>() / channel_scores.len() as f64)
}

/// Summed-area table with a zero row and column in front.
struct SummedArea {
    table: Vec<f64>,
    stride: usize,
}

impl SummedArea {
    fn new(width: usize, height: usize, value: impl Fn(usize) -> f64) -> Self {
        let stride = width + 1;
        let mut table = vec![0.0f64; stride * (height + 1)];
        for y in 0..height {
            let mut row_sum = 0.0;
            for x in 0..width {
                row_sum += value(y * width + x);
                table[(y + 1) * stride + x + 1] = table[y * stride + x + 1] + row_sum;
            }
        }
        Self { table, stride }
    }

    /// Sum over the `size x size` window with top-left corner `(x, y)`.
    #[inline]
    fn window(&self, x: usize, y: usize, size: usize) -> f64 {
        let top = y * self.stride;
        let bottom = (y + size) * self.stride;
        self.table[bottom + x + size] - self.table[bottom + x] - self.table[top + x + size]
            + self.table[top + x]
    }
}

fn channel_ssim(x: &[f64], y: &[f64], width: usize, height: usize, config: &SsimConfig) -> f64 {
    let win = config.win_size;
    let np = (win * win) as f64;
    let cov_norm = if config.sample_covariance {
        np / (np - 1.0)
    } else {
        1.0
    };
    let c1 = (config.k1 * config.data_range).powi(2);
    let c2 = (config.k2 * config.data_range).powi(2);

    let sx = SummedArea::new(width, height, |i| x[i]);
    let sy = SummedArea::new(width, height, |i| y[i]);
    let sxx = SummedArea::new(width, height, |i| x[i] * x[i]);
    let syy = SummedArea::new(width, height, |i| y[i] * y[i]);
    let sxy = SummedArea::new(width, height, |i| x[i] * y[i]);

    let out_w = width - win + 1;
    let out_h = height - win + 1;
    let mut total = 0.0f64;

    for wy in 0..out_h {
        for wx in 0..out_w {
            let ux = sx.window(wx, wy, win) / np;
            let uy = sy.window(wx, wy, win) / np;
            let uxx = sxx.window(wx, wy, win) / np;
            let uyy = syy.window(wx, wy, win) / np;
            let uxy = sxy.window(wx, wy, win) / np;

            let vx = cov_norm * (uxx - ux * ux);
            let vy = cov_norm * (uyy - uy * uy);
            let vxy = cov_norm * (uxy - ux * uy);

            let a1 = 2.0 * ux * uy + c1;
            let a2 = 2.0 * vxy + c2;
            let b1 = ux * ux + uy * uy + c1;
            let b2 = vx + vy + c2;

            total += (a1 * a2) / (b1 * b2);
        }
    }

    total / (out_w * out_h) as f64
}
