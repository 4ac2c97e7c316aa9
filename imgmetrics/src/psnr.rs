//! Peak signal-to-noise ratio.

use crate::input::{ensure_same_dimensions, Rgb8Image};
use crate::MetricsError;

/// Dynamic range of 8-bit samples.
pub const DATA_RANGE_U8: f64 = 255.0;

/// Mean squared error over every channel of every pixel.
///
/// # Errors
/// - If the images have different dimensions
pub fn mean_squared_error(a: &Rgb8Image, b: &Rgb8Image) -> Result<f64, MetricsError> {
    ensure_same_dimensions(a, b)?;

    let samples = a.data().len() * 3;
    if samples == 0 {
        return Ok(0.0);
    }

    // Integer accumulation keeps the sum exact.
    let sum: u64 = a
        .data()
        .iter()
        .zip(b.data())
        .flat_map(|(pa, pb)| pa.iter().zip(pb))
        .map(|(&x, &y)| {
            let d = i64::from(x) - i64::from(y);
            (d * d) as u64
        })
        .sum();

    Ok(sum as f64 / samples as f64)
}

/// Converts an MSE to PSNR in dB. A zero error maps to `+inf`.
#[must_use]
pub fn psnr_from_mse(mse: f64, data_range: f64) -> f64 {
    if mse == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (data_range * data_range / mse).log10()
}

/// PSNR in dB relative to the 8-bit dynamic range.
///
/// # Errors
/// - If the images have different dimensions
pub fn compute_psnr(a: &Rgb8Image, b: &Rgb8Image) -> Result<f64, MetricsError> {
    let mse = mean_squared_error(a, b)?;
    Ok(psnr_from_mse(mse, DATA_RANGE_U8))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(value: u8, size: usize) -> Rgb8Image {
        Rgb8Image::new(vec![[value; 3]; size * size], size, size)
    }

    #[test]
    fn test_identical_is_infinite() {
        let img = uniform(128, 8);
        assert_eq!(compute_psnr(&img, &img).unwrap(), f64::INFINITY);
    }

    #[test]
    fn test_unit_error() {
        // MSE of 1 gives 20 * log10(255)
        let psnr = compute_psnr(&uniform(100, 8), &uniform(101, 8)).unwrap();
        assert!((psnr - 48.130_803_608_679_1).abs() < 1e-9, "psnr = {psnr}");
    }

    #[test]
    fn test_mse_single_channel_difference() {
        let a = Rgb8Image::new(vec![[0, 0, 0], [0, 0, 0]], 2, 1);
        let b = Rgb8Image::new(vec![[6, 0, 0], [0, 0, 0]], 2, 1);
        assert_eq!(mean_squared_error(&a, &b).unwrap(), 36.0 / 6.0);
    }

    #[test]
    fn test_decreases_with_offset() {
        let base = uniform(100, 16);
        let mut prev = f64::INFINITY;
        for offset in 1..=20u8 {
            let psnr = compute_psnr(&base, &uniform(100 + offset, 16)).unwrap();
            assert!(psnr < prev, "offset {offset}: {psnr} >= {prev}");
            prev = psnr;
        }
    }

    #[test]
    fn test_symmetric() {
        let a = Rgb8Image::new(vec![[10, 200, 30], [0, 0, 255]], 2, 1);
        let b = Rgb8Image::new(vec![[12, 190, 31], [5, 1, 250]], 2, 1);
        assert_eq!(compute_psnr(&a, &b).unwrap(), compute_psnr(&b, &a).unwrap());
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = compute_psnr(&uniform(0, 8), &uniform(0, 4));
        assert!(matches!(
            result,
            Err(MetricsError::NonMatchingImageDimensions { .. })
        ));
    }
}
