//! Per-image records, their averages, and the JSON report layout.
//!
//! The report is a single JSON array: one object per image, followed by one
//! `{"average_metrics": {...}}` object. Non-finite numbers (PSNR of
//! identical images) are written as `null`.

use std::path::Path;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

use crate::{MetricsError, PairMetrics};

/// Scores of one image pair.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricRecord {
    pub image_name: String,
    pub psnr: f64,
    pub ssim: f64,
    pub lpips: f64,
}

impl MetricRecord {
    pub fn new(image_name: impl Into<String>, metrics: PairMetrics) -> Self {
        Self {
            image_name: image_name.into(),
            psnr: metrics.psnr,
            ssim: metrics.ssim,
            lpips: metrics.lpips,
        }
    }
}

/// Arithmetic means over all records; all zero when there are none.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct AverageMetrics {
    pub psnr: f64,
    pub ssim: f64,
    pub lpips: f64,
}

impl AverageMetrics {
    pub fn of(records: &[MetricRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let (psnr, ssim, lpips) = records.iter().fold((0.0, 0.0, 0.0), |acc, r| {
            (acc.0 + r.psnr, acc.1 + r.ssim, acc.2 + r.lpips)
        });
        let count = records.len() as f64;

        Self {
            psnr: psnr / count,
            ssim: ssim / count,
            lpips: lpips / count,
        }
    }
}

#[derive(Serialize)]
struct AverageRecord<'a> {
    average_metrics: &'a AverageMetrics,
}

/// Result of a batch run.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    records: Vec<MetricRecord>,
    average: AverageMetrics,
}

impl Report {
    pub fn new(records: Vec<MetricRecord>) -> Self {
        let average = AverageMetrics::of(&records);
        Self { records, average }
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn average(&self) -> &AverageMetrics {
        &self.average
    }

    /// Pretty JSON with a 4-space indent.
    ///
    /// # Errors
    /// - If serialization fails
    pub fn to_json_vec(&self) -> Result<Vec<u8>, MetricsError> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        Ok(buf)
    }

    /// Writes the report to `path`, replacing any existing file.
    ///
    /// # Errors
    /// - If serialization fails or the file cannot be written
    pub fn write_json(&self, path: &Path) -> Result<(), MetricsError> {
        let json = self.to_json_vec()?;
        std::fs::write(path, json).map_err(|source| MetricsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Serialize for Report {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.records.len() + 1))?;
        for record in &self.records {
            seq.serialize_element(record)?;
        }
        seq.serialize_element(&AverageRecord {
            average_metrics: &self.average,
        })?;
        seq.end()
    }
}
