//! Full-reference image similarity metrics for pairs of RGB images.
//!
//! Three scores are computed for every pair:
//!
//! | Metric | Range | Identical images |
//! |--------|-------|------------------|
//! | PSNR   | dB, `(0, +inf]` | `+inf` |
//! | SSIM   | `[-1, 1]` | `1.0` |
//! | LPIPS  | `[0, ~1]` (lower is closer) | `0.0` |
//!
//! The batch driver ([`process_folders`]) compares every file name shared by
//! two directories and writes a JSON report with one record per image and a
//! trailing average record.
//!
//! # Example
//!
//! ```
//! use imgmetrics::{compute_psnr, compute_ssim, Rgb8Image};
//!
//! let source = Rgb8Image::new(vec![[120, 64, 200]; 16 * 16], 16, 16);
//! let distorted = Rgb8Image::new(vec![[122, 64, 198]; 16 * 16], 16, 16);
//!
//! let psnr = compute_psnr(&source, &distorted).unwrap();
//! let ssim = compute_ssim(&source, &distorted).unwrap();
//! assert!(psnr > 40.0);
//! assert!(ssim > 0.99);
//! ```

mod batch;
mod input;
pub mod lpips;
mod psnr;
mod report;
mod ssim;

use std::path::{Path, PathBuf};

pub use batch::{
    common_file_names, compare_common_files, compare_folders, list_file_names, process_folders,
    BatchEvent, BatchOptions, FailurePolicy,
};
pub use input::{Rgb8Image, ToRgb8};
pub use lpips::{Lpips, LpipsWeights, PerceptualDistance};
pub use psnr::{compute_psnr, mean_squared_error, psnr_from_mse, DATA_RANGE_U8};
pub use report::{AverageMetrics, MetricRecord, Report};
pub use ssim::{compute_ssim, compute_ssim_with_config, SsimConfig};

/// Errors that can occur while computing metrics or writing a report.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "images must have the same dimensions, got {}x{} and {}x{}",
        .left.0, .left.1, .right.0, .right.1
    )]
    NonMatchingImageDimensions {
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("{metric} needs images of at least {min}x{min} pixels, got {width}x{height}")]
    ImageTooSmall {
        metric: &'static str,
        width: usize,
        height: usize,
        min: usize,
    },
    #[error("SSIM window size must be odd and at least 3, got {0}")]
    InvalidWindowSize(usize),
    #[error("failed to load LPIPS weights from {}", .path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: burn::record::RecorderError,
    },
    #[error("failed to serialize report")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to compare {name}")]
    Pair {
        name: String,
        #[source]
        source: Box<MetricsError>,
    },
}

impl MetricsError {
    /// Whether the error only concerns the images of one pair, as opposed to
    /// the run as a whole (directory listing, model, output file).
    #[must_use]
    pub fn is_pair_local(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. } | Self::NonMatchingImageDimensions { .. } | Self::ImageTooSmall { .. }
        )
    }
}

/// The three scores of one image pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PairMetrics {
    pub psnr: f64,
    pub ssim: f64,
    pub lpips: f64,
}

/// Computes PSNR, SSIM and the perceptual distance between two decoded images.
///
/// # Errors
/// - If the images have different dimensions
/// - If an image is too small for the SSIM window or the perceptual model
pub fn compare_images<D: PerceptualDistance + ?Sized>(
    source: &Rgb8Image,
    distorted: &Rgb8Image,
    model: &D,
    ssim_config: &SsimConfig,
) -> Result<PairMetrics, MetricsError> {
    input::ensure_same_dimensions(source, distorted)?;

    let psnr = compute_psnr(source, distorted)?;
    let ssim = compute_ssim_with_config(source, distorted, ssim_config)?;
    let lpips = model.distance(source, distorted)?;

    Ok(PairMetrics { psnr, ssim, lpips })
}

/// Decodes both files as RGB and compares them with [`compare_images`].
///
/// # Errors
/// - If either file cannot be read or decoded
/// - Any error of [`compare_images`]
pub fn compare_files<D: PerceptualDistance + ?Sized>(
    source: &Path,
    distorted: &Path,
    model: &D,
    ssim_config: &SsimConfig,
) -> Result<PairMetrics, MetricsError> {
    let source = Rgb8Image::open(source)?;
    let distorted = Rgb8Image::open(distorted)?;
    compare_images(&source, &distorted, model, ssim_config)
}
