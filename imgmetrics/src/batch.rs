//! Folder-against-folder comparison.
//!
//! Every file name present in both directories is treated as one pair. The
//! directories are not searched recursively and no extension filter is
//! applied; entries that are not images fail to decode.

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::Path;

use burn::tensor::backend::Backend;
use log::{debug, info, warn};

use crate::lpips::{Lpips, LpipsWeights, PerceptualDistance};
use crate::report::{MetricRecord, Report};
use crate::ssim::SsimConfig;
use crate::{compare_files, MetricsError};

/// What to do when one pair cannot be compared.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the run and return the error. Nothing is written.
    #[default]
    Abort,
    /// Log a warning and leave the pair out of the records and averages.
    ///
    /// Only pair-local errors are skipped (see [`MetricsError::is_pair_local`]).
    Skip,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BatchOptions {
    pub on_error: FailurePolicy,
    pub ssim: SsimConfig,
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    /// Emitted once, before the first pair.
    Started { total: usize },
    Compared(&'a MetricRecord),
    Skipped { name: &'a str, error: &'a MetricsError },
}

/// Names of all entries directly inside `dir`.
///
/// Names are kept as the OS returns them, so entries that are not valid
/// UTF-8 can still be opened.
///
/// # Errors
/// - If the directory cannot be read
pub fn list_file_names(dir: &Path) -> Result<BTreeSet<OsString>, MetricsError> {
    let io_err = |source| MetricsError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = BTreeSet::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        names.insert(entry.file_name());
    }
    Ok(names)
}

/// File names present in both directories, sorted.
///
/// # Errors
/// - If either directory cannot be read
pub fn common_file_names(folder1: &Path, folder2: &Path) -> Result<Vec<OsString>, MetricsError> {
    let names1 = list_file_names(folder1)?;
    let names2 = list_file_names(folder2)?;
    Ok(names1.intersection(&names2).cloned().collect())
}

/// Compares the given names across both folders with an already loaded model.
///
/// # Errors
/// - Any pair error under [`FailurePolicy::Abort`], wrapped in [`MetricsError::Pair`]
/// - Errors that are not pair-local under [`FailurePolicy::Skip`]
pub fn compare_common_files<D, F>(
    folder1: &Path,
    folder2: &Path,
    names: &[OsString],
    model: &D,
    options: &BatchOptions,
    mut on_event: F,
) -> Result<Report, MetricsError>
where
    D: PerceptualDistance + ?Sized,
    F: FnMut(BatchEvent<'_>),
{
    on_event(BatchEvent::Started { total: names.len() });

    let mut records = Vec::with_capacity(names.len());
    for file_name in names {
        let name = file_name.to_string_lossy();
        match compare_files(
            &folder1.join(file_name),
            &folder2.join(file_name),
            model,
            &options.ssim,
        ) {
            Ok(metrics) => {
                let record = MetricRecord::new(&*name, metrics);
                debug!(
                    "{}: psnr={:.4} ssim={:.4} lpips={:.4}",
                    name, record.psnr, record.ssim, record.lpips
                );
                on_event(BatchEvent::Compared(&record));
                records.push(record);
            }
            Err(error) if options.on_error == FailurePolicy::Skip && error.is_pair_local() => {
                warn!("skipping {}: {}", name, error);
                on_event(BatchEvent::Skipped {
                    name: &name,
                    error: &error,
                });
            }
            Err(error) => {
                return Err(MetricsError::Pair {
                    name: name.into_owned(),
                    source: Box::new(error),
                })
            }
        }
    }

    Ok(Report::new(records))
}

/// Lists both folders and compares every common file name.
///
/// # Errors
/// - If either directory cannot be read
/// - Any error of [`compare_common_files`]
pub fn compare_folders<D, F>(
    folder1: &Path,
    folder2: &Path,
    model: &D,
    options: &BatchOptions,
    on_event: F,
) -> Result<Report, MetricsError>
where
    D: PerceptualDistance + ?Sized,
    F: FnMut(BatchEvent<'_>),
{
    let names = common_file_names(folder1, folder2)?;
    compare_common_files(folder1, folder2, &names, model, options, on_event)
}

/// Full batch run: list, load LPIPS once, compare every pair, write the report.
///
/// The report file is only written after every pair has been processed.
///
/// # Errors
/// - If a directory cannot be read or the model cannot be loaded
/// - Any error of [`compare_common_files`]
/// - If the report cannot be written
pub fn process_folders<B, F>(
    folder1: &Path,
    folder2: &Path,
    output_json: &Path,
    weights: &LpipsWeights,
    device: B::Device,
    options: &BatchOptions,
    on_event: F,
) -> Result<Report, MetricsError>
where
    B: Backend,
    F: FnMut(BatchEvent<'_>),
{
    let names = common_file_names(folder1, folder2)?;
    info!(
        "{} common file names between {} and {}",
        names.len(),
        folder1.display(),
        folder2.display()
    );

    let model = Lpips::<B>::load(weights, device)?;
    info!("loaded LPIPS weights from {}", weights.trunk_path().display());

    let report = compare_common_files(folder1, folder2, &names, &model, options, on_event)?;
    report.write_json(output_json)?;
    info!(
        "wrote {} records to {}",
        report.records().len(),
        output_json.display()
    );

    Ok(report)
}
