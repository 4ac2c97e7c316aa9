//! End-to-end folder comparisons on generated PNG fixtures.
//!
//! Most tests use a cheap stand-in for LPIPS so they check the batch logic
//! rather than the network; `lpips_network_end_to_end` runs the real
//! (randomly initialized) network.

use std::fs;
use std::path::Path;

use imgmetrics::lpips::LpipsAlex;
use imgmetrics::{
    compare_folders, BatchEvent, BatchOptions, FailurePolicy, Lpips, MetricsError,
    PerceptualDistance, Report, Rgb8Image,
};
use serde_json::Value;

/// Mean absolute difference on the 0-1 scale.
struct MeanAbsDiff;

impl PerceptualDistance for MeanAbsDiff {
    fn distance(&self, a: &Rgb8Image, b: &Rgb8Image) -> Result<f64, MetricsError> {
        let total: f64 = a
            .data()
            .iter()
            .zip(b.data())
            .flat_map(|(pa, pb)| pa.iter().zip(pb))
            .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs() / 255.0)
            .sum();
        Ok(total / (a.data().len() * 3) as f64)
    }
}

/// Uniform RGB image with a small diagonal pattern so SSIM sees some structure.
fn write_png(dir: &Path, name: &str, width: u32, height: u32, base: u8) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        let v = base.saturating_add(((x + y) % 4) as u8 * 8);
        image::Rgb([v, base, 255 - v])
    });
    img.save(dir.join(name)).unwrap();
}

fn run(left: &Path, right: &Path, options: &BatchOptions) -> Result<Report, MetricsError> {
    compare_folders(left, right, &MeanAbsDiff, options, |_| {})
}

fn to_json(report: &Report) -> Value {
    serde_json::from_slice(&report.to_json_vec().unwrap()).unwrap()
}

#[test]
fn only_common_names_are_compared() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "a.png", 16, 16, 10);
    write_png(left.path(), "b.png", 16, 16, 20);
    write_png(right.path(), "b.png", 16, 16, 24);
    write_png(right.path(), "c.png", 16, 16, 30);

    let report = run(left.path(), right.path(), &BatchOptions::default()).unwrap();
    let json = to_json(&report);

    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["image_name"], "b.png");
    assert!(entries[1].get("average_metrics").is_some());
}

#[test]
fn no_common_names_gives_zero_average() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "a.png", 16, 16, 10);
    write_png(right.path(), "c.png", 16, 16, 30);

    let report = run(left.path(), right.path(), &BatchOptions::default()).unwrap();
    let json = to_json(&report);

    assert_eq!(
        json,
        serde_json::json!([{"average_metrics": {"psnr": 0.0, "ssim": 0.0, "lpips": 0.0}}])
    );
}

#[test]
fn average_matches_records() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    for (i, name) in ["one.png", "two.png", "three.png"].iter().enumerate() {
        write_png(left.path(), name, 24, 20, 40);
        write_png(right.path(), name, 24, 20, 40 + 5 * (i as u8 + 1));
    }

    let report = run(left.path(), right.path(), &BatchOptions::default()).unwrap();
    let json = to_json(&report);
    let entries = json.as_array().unwrap();
    let (records, average) = entries.split_at(entries.len() - 1);
    assert_eq!(records.len(), 3);

    for metric in ["psnr", "ssim", "lpips"] {
        let mean = records
            .iter()
            .map(|r| r[metric].as_f64().unwrap())
            .sum::<f64>()
            / records.len() as f64;
        let reported = average[0]["average_metrics"][metric].as_f64().unwrap();
        assert!(
            (mean - reported).abs() < 1e-9,
            "{metric}: mean {mean} vs reported {reported}"
        );
    }
}

#[test]
fn identical_images_score_perfectly() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "same.png", 16, 16, 90);
    write_png(right.path(), "same.png", 16, 16, 90);

    let report = run(left.path(), right.path(), &BatchOptions::default()).unwrap();
    let record = &report.records()[0];

    assert!(record.psnr.is_infinite());
    assert!((record.ssim - 1.0).abs() < 1e-12);
    assert_eq!(record.lpips, 0.0);
}

#[test]
fn psnr_drops_as_offset_grows() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    for offset in 1..=4u8 {
        let name = format!("offset_{offset}.png");
        write_png(left.path(), &name, 16, 16, 100);
        write_png(right.path(), &name, 16, 16, 100 + offset * 3);
    }

    let report = run(left.path(), right.path(), &BatchOptions::default()).unwrap();
    let psnr: Vec<f64> = report.records().iter().map(|r| r.psnr).collect();

    assert_eq!(psnr.len(), 4);
    assert!(psnr.windows(2).all(|w| w[0] > w[1]), "{psnr:?}");
}

#[test]
fn reruns_are_identical() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    for name in ["x.png", "y.png", "z.png"] {
        write_png(left.path(), name, 20, 20, 60);
        write_png(right.path(), name, 20, 20, 75);
    }

    let first = run(left.path(), right.path(), &BatchOptions::default()).unwrap();
    let second = run(left.path(), right.path(), &BatchOptions::default()).unwrap();

    assert_eq!(first.to_json_vec().unwrap(), second.to_json_vec().unwrap());
}

#[test]
fn mismatched_dimensions_abort_by_default() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "a.png", 16, 16, 10);
    write_png(right.path(), "a.png", 16, 20, 10);

    let err = run(left.path(), right.path(), &BatchOptions::default()).unwrap_err();
    match err {
        MetricsError::Pair { name, source } => {
            assert_eq!(name, "a.png");
            assert!(matches!(
                *source,
                MetricsError::NonMatchingImageDimensions {
                    left: (16, 16),
                    right: (16, 20)
                }
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn skip_policy_leaves_bad_pairs_out() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "good.png", 16, 16, 10);
    write_png(right.path(), "good.png", 16, 16, 12);
    write_png(left.path(), "mismatch.png", 16, 16, 10);
    write_png(right.path(), "mismatch.png", 20, 16, 10);
    fs::write(left.path().join("notes.txt"), b"hello").unwrap();
    fs::write(right.path().join("notes.txt"), b"hello").unwrap();

    let options = BatchOptions {
        on_error: FailurePolicy::Skip,
        ..BatchOptions::default()
    };
    let mut skipped = Vec::new();
    let report = compare_folders(left.path(), right.path(), &MeanAbsDiff, &options, |event| {
        if let BatchEvent::Skipped { name, .. } = event {
            skipped.push(name.to_string());
        }
    })
    .unwrap();

    let names: Vec<&str> = report
        .records()
        .iter()
        .map(|r| r.image_name.as_str())
        .collect();
    assert_eq!(names, vec!["good.png"]);
    assert_eq!(skipped, vec!["mismatch.png".to_string(), "notes.txt".to_string()]);
    assert_eq!(report.average().psnr, report.records()[0].psnr);
}

#[test]
fn non_image_aborts_and_writes_nothing() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "a.png", 16, 16, 10);
    write_png(right.path(), "a.png", 16, 16, 10);
    fs::write(left.path().join("notes.txt"), b"hello").unwrap();
    fs::write(right.path().join("notes.txt"), b"hello").unwrap();
    let output = left.path().join("out.json");

    let result = run(left.path(), right.path(), &BatchOptions::default())
        .and_then(|report| report.write_json(&output));

    match result {
        Err(MetricsError::Pair { name, source }) => {
            assert_eq!(name, "notes.txt");
            assert!(matches!(*source, MetricsError::Decode { .. }));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!output.exists());
}

#[cfg(unix)]
#[test]
fn non_utf8_file_names_are_opened() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    // Both names are lossily displayed as "img_\u{FFFD}.png".
    for raw in [&b"img_\xfe.png"[..], &b"img_\xff.png"[..]] {
        let name = OsStr::from_bytes(raw);
        for dir in [left.path(), right.path()] {
            let img = image::RgbImage::from_pixel(16, 16, image::Rgb([40, 80, 120]));
            img.save(dir.join(name)).unwrap();
        }
    }

    let report = run(left.path(), right.path(), &BatchOptions::default()).unwrap();

    assert_eq!(report.records().len(), 2);
    for record in report.records() {
        assert_eq!(record.image_name, "img_\u{FFFD}.png");
        assert!(record.psnr.is_infinite());
        assert_eq!(record.lpips, 0.0);
    }
}

#[test]
fn events_follow_progress() {
    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    for name in ["a.png", "b.png"] {
        write_png(left.path(), name, 16, 16, 10);
        write_png(right.path(), name, 16, 16, 11);
    }

    let mut events = Vec::new();
    compare_folders(
        left.path(),
        right.path(),
        &MeanAbsDiff,
        &BatchOptions::default(),
        |event| {
            events.push(match event {
                BatchEvent::Started { total } => format!("start {total}"),
                BatchEvent::Compared(record) => format!("done {}", record.image_name),
                BatchEvent::Skipped { name, .. } => format!("skip {name}"),
            })
        },
    )
    .unwrap();

    assert_eq!(events, vec!["start 2", "done a.png", "done b.png"]);
}

#[test]
fn lpips_network_end_to_end() {
    type Backend = burn::backend::NdArray<f32>;

    let left = tempfile::tempdir().unwrap();
    let right = tempfile::tempdir().unwrap();
    write_png(left.path(), "same.png", 32, 32, 50);
    write_png(right.path(), "same.png", 32, 32, 50);
    write_png(left.path(), "other.png", 32, 32, 50);
    write_png(right.path(), "other.png", 32, 32, 90);

    let device = Default::default();
    let model = Lpips::<Backend>::new(LpipsAlex::new(&device), device);

    let first = compare_folders(
        left.path(),
        right.path(),
        &model,
        &BatchOptions::default(),
        |_| {},
    )
    .unwrap();
    let second = compare_folders(
        left.path(),
        right.path(),
        &model,
        &BatchOptions::default(),
        |_| {},
    )
    .unwrap();

    let same = first
        .records()
        .iter()
        .find(|r| r.image_name == "same.png")
        .unwrap();
    assert_eq!(same.lpips, 0.0);

    for (a, b) in first.records().iter().zip(second.records()) {
        assert!((a.lpips - b.lpips).abs() < 1e-6);
        assert_eq!(a.psnr.to_bits(), b.psnr.to_bits());
        assert_eq!(a.ssim.to_bits(), b.ssim.to_bits());
    }
}
