use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::record::{FullPrecisionSettings, Record, Recorder, RecorderError};
use burn::tensor::backend::Backend;
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};
use log::debug;

use super::alexnet::{AlexFeatures, AlexFeaturesRecord, LinearHeads, LinearHeadsRecord, LpipsAlex};
use crate::MetricsError;

// Accepts both torchvision (`features.N`) and lpips (`net.sliceK.N`) naming.
const TRUNK_KEY_REMAP: [(&str, &str); 5] = [
    (r"^(?:features|net\.slice\d)\.0\.(weight|bias)$", "conv1.$1"),
    (r"^(?:features|net\.slice\d)\.3\.(weight|bias)$", "conv2.$1"),
    (r"^(?:features|net\.slice\d)\.6\.(weight|bias)$", "conv3.$1"),
    (r"^(?:features|net\.slice\d)\.8\.(weight|bias)$", "conv4.$1"),
    (r"^(?:features|net\.slice\d)\.10\.(weight|bias)$", "conv5.$1"),
];

const HEAD_KEY_REMAP: [(&str, &str); 1] = [(r"^lin(\d)\.model\.1\.weight$", "lin$1.weight")];

/// Location of the pretrained LPIPS checkpoint(s).
///
/// A merged checkpoint holds both the AlexNet trunk and the linear heads.
/// The heads can also come from their own file, which is how the lpips
/// project distributes them next to the torchvision backbone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LpipsWeights {
    trunk: PathBuf,
    heads: Option<PathBuf>,
}

impl LpipsWeights {
    /// Trunk and heads in one checkpoint.
    pub fn merged(path: impl Into<PathBuf>) -> Self {
        Self {
            trunk: path.into(),
            heads: None,
        }
    }

    /// Trunk and heads in separate checkpoints.
    pub fn split(trunk: impl Into<PathBuf>, heads: impl Into<PathBuf>) -> Self {
        Self {
            trunk: trunk.into(),
            heads: Some(heads.into()),
        }
    }

    pub fn trunk_path(&self) -> &Path {
        &self.trunk
    }

    pub fn heads_path(&self) -> &Path {
        self.heads.as_deref().unwrap_or(&self.trunk)
    }

    /// Builds the network and loads both parts.
    ///
    /// # Errors
    /// - If a checkpoint is missing or lacks one of the expected tensors
    pub fn load<B: Backend>(&self, device: &B::Device) -> Result<LpipsAlex<B>, MetricsError> {
        let trunk: AlexFeaturesRecord<B> = load_record(&self.trunk, &TRUNK_KEY_REMAP, device)?;
        let heads: LinearHeadsRecord<B> = load_record(self.heads_path(), &HEAD_KEY_REMAP, device)?;

        Ok(LpipsAlex::from_parts(
            AlexFeatures::new(device).load_record(trunk),
            LinearHeads::new(device).load_record(heads),
        ))
    }
}

fn load_record<B, R>(path: &Path, remap: &[(&str, &str)], device: &B::Device) -> Result<R, MetricsError>
where
    B: Backend,
    R: Record<B>,
{
    if !path.is_file() {
        return Err(MetricsError::ModelLoad {
            path: path.to_path_buf(),
            source: RecorderError::FileNotFound(path.display().to_string()),
        });
    }

    debug!("loading LPIPS tensors from {}", path.display());
    let args = remap
        .iter()
        .fold(LoadArgs::new(path.to_path_buf()), |args, (pattern, replacement)| {
            args.with_key_remap(pattern, replacement)
        });

    let recorder = PyTorchFileRecorder::<FullPrecisionSettings>::default();
    Recorder::<B>::load(&recorder, args, device).map_err(|source| MetricsError::ModelLoad {
        path: path.to_path_buf(),
        source,
    })
}
