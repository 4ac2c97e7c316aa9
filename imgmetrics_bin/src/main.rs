use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use imgmetrics::{process_folders, BatchEvent, BatchOptions, FailurePolicy, LpipsWeights};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

#[cfg(not(feature = "wgpu"))]
type MetricsBackend = burn::backend::NdArray<f32>;
#[cfg(feature = "wgpu")]
type MetricsBackend = burn::backend::Wgpu;

/// Calculate PSNR, SSIM, and LPIPS between images in two folders.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the first folder containing images.
    #[arg(long = "folder1", value_name = "DIR")]
    folder1: PathBuf,

    /// Path to the second folder containing images.
    #[arg(long = "folder2", value_name = "DIR")]
    folder2: PathBuf,

    /// Path to the output JSON file to save results.
    #[arg(long = "output_json", value_name = "FILE")]
    output_json: PathBuf,

    /// LPIPS checkpoint: trunk and heads merged, or the trunk alone when
    /// --lpips-heads is given.
    #[arg(
        long,
        value_name = "FILE",
        env = "IMGMETRICS_LPIPS_WEIGHTS",
        default_value = "weights/lpips_alex.pth"
    )]
    lpips_weights: PathBuf,

    /// Separate checkpoint holding the LPIPS linear heads.
    #[arg(long, value_name = "FILE", env = "IMGMETRICS_LPIPS_HEADS")]
    lpips_heads: Option<PathBuf>,

    /// What to do when a pair cannot be compared.
    #[arg(long, value_enum, default_value_t = OnError::Abort)]
    on_error: OnError,

    /// Hide the progress bar.
    #[arg(long, short)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnError {
    /// Stop at the first failing pair without writing the report
    Abort,
    /// Warn and leave undecodable, mismatched or too small pairs out
    Skip,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Abort => FailurePolicy::Abort,
            OnError::Skip => FailurePolicy::Skip,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let weights = match &args.lpips_heads {
        Some(heads) => LpipsWeights::split(&args.lpips_weights, heads),
        None => LpipsWeights::merged(&args.lpips_weights),
    };
    let options = BatchOptions {
        on_error: args.on_error.into(),
        ..BatchOptions::default()
    };

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {msg}")
                .context("invalid progress bar template")?
                .progress_chars("=> "),
        );
        bar
    };

    let report = process_folders::<MetricsBackend, _>(
        &args.folder1,
        &args.folder2,
        &args.output_json,
        &weights,
        Default::default(),
        &options,
        |event| match event {
            BatchEvent::Started { total } => progress.set_length(total as u64),
            BatchEvent::Compared(record) => {
                progress.set_message(record.image_name.clone());
                progress.inc(1);
            }
            BatchEvent::Skipped { name, .. } => {
                progress.set_message(format!("skipped {name}"));
                progress.inc(1);
            }
        },
    )
    .with_context(|| {
        format!(
            "failed to compare {} with {}",
            args.folder1.display(),
            args.folder2.display()
        )
    })?;
    progress.finish_and_clear();

    let average = report.average();
    info!(
        "average over {} images: psnr={:.4} ssim={:.4} lpips={:.4}",
        report.records().len(),
        average.psnr,
        average.ssim,
        average.lpips
    );

    Ok(())
}
