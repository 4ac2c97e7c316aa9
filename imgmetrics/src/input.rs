//! Input image types and conversion to 8-bit RGB.
//!
//! Every metric works on [`Rgb8Image`]: row-major `[u8; 3]` pixels.
//!
//! ## Supported input types
//!
//! | Type | Conversion |
//! |------|------------|
//! | `image::RgbImage` | none |
//! | `image::DynamicImage` | alpha dropped, gray expanded, 16-bit and float scaled to 8-bit |
//! | file path ([`Rgb8Image::open`]) | decode, then as `DynamicImage` |

use std::path::Path;

use crate::MetricsError;

/// 8-bit RGB image used as the common input of all metrics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rgb8Image {
    data: Vec<[u8; 3]>,
    width: usize,
    height: usize,
}

impl Rgb8Image {
    /// Creates a new image from row-major pixel data.
    pub fn new(data: Vec<[u8; 3]>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Decodes an image file and converts it to RGB.
    ///
    /// # Errors
    /// - If the file cannot be opened or is not a supported image
    pub fn open(path: &Path) -> Result<Self, MetricsError> {
        let decoded = image::open(path).map_err(|source| MetricsError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(decoded.to_rgb8_image())
    }

    /// Returns the image width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Returns the pixel data.
    pub fn data(&self) -> &[[u8; 3]] {
        &self.data
    }

    /// Splits the pixels into three `f64` planes (R, G, B) on the 0-255 scale.
    pub(crate) fn to_planes_f64(&self) -> [Vec<f64>; 3] {
        let mut planes = [
            Vec::with_capacity(self.data.len()),
            Vec::with_capacity(self.data.len()),
            Vec::with_capacity(self.data.len()),
        ];
        for px in &self.data {
            for (plane, &v) in planes.iter_mut().zip(px) {
                plane.push(f64::from(v));
            }
        }
        planes
    }

    /// Interleaved (HWC) pixel values scaled to `[0, 1]`.
    pub(crate) fn to_unit_hwc(&self) -> Vec<f32> {
        self.data
            .iter()
            .flat_map(|px| px.map(|v| f32::from(v) / 255.0))
            .collect()
    }
}

/// Trait for converting image types to [`Rgb8Image`].
///
/// Implement this trait to add support for custom image types.
pub trait ToRgb8 {
    /// Convert to an 8-bit RGB image.
    fn to_rgb8_image(&self) -> Rgb8Image;
}

impl ToRgb8 for Rgb8Image {
    fn to_rgb8_image(&self) -> Rgb8Image {
        self.clone()
    }
}

impl ToRgb8 for image::RgbImage {
    fn to_rgb8_image(&self) -> Rgb8Image {
        let data = self.pixels().map(|p| p.0).collect();
        Rgb8Image::new(data, self.width() as usize, self.height() as usize)
    }
}

impl ToRgb8 for image::DynamicImage {
    fn to_rgb8_image(&self) -> Rgb8Image {
        match self {
            image::DynamicImage::ImageRgb8(rgb) => rgb.to_rgb8_image(),
            other => other.to_rgb8().to_rgb8_image(),
        }
    }
}

pub(crate) fn ensure_same_dimensions(a: &Rgb8Image, b: &Rgb8Image) -> Result<(), MetricsError> {
    if a.dimensions() != b.dimensions() {
        return Err(MetricsError::NonMatchingImageDimensions {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }
    Ok(())
}
