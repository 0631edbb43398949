// Dataset configuration
// Recognized options for corpus location, example shaping, and sampling

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::annot::{AnnotError, DatasetKind};
use crate::audio::AudioError;
use crate::augment::AugmentConfig;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Annotation error: {0}")]
    Annot(#[from] AnnotError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Corpus subset selection
///
/// Training subsets report a synthetic epoch length and receive length
/// normalization plus augmentation; validation/test subsets yield
/// variable-length examples with metadata, one per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Subset {
    Train,
    Val,
    Test,
    FullTrain,
    FullVal,
}

impl Subset {
    /// Training subsets are cropped/padded, augmented, and oversampled
    pub fn is_training(&self) -> bool {
        matches!(self, Subset::Train | Subset::FullTrain)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subset::Train => "train",
            Subset::Val => "val",
            Subset::Test => "test",
            Subset::FullTrain => "full-train",
            Subset::FullVal => "full-val",
        }
    }
}

impl FromStr for Subset {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Subset::Train),
            "val" => Ok(Subset::Val),
            "test" => Ok(Subset::Test),
            "full-train" => Ok(Subset::FullTrain),
            "full-val" => Ok(Subset::FullVal),
            other => Err(DatasetError::Config(format!("Invalid subset: `{}`", other))),
        }
    }
}

/// Padding behavior for examples shorter than the training window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    /// Zero padding
    Constant,

    /// Mirror around the edges without repeating the edge sample
    Reflect,

    /// Repeat the edge sample
    Replicate,

    /// Wrap around the signal
    Circular,
}

impl FromStr for PadMode {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "constant" => Ok(PadMode::Constant),
            "reflect" => Ok(PadMode::Reflect),
            "replicate" => Ok(PadMode::Replicate),
            "circular" => Ok(PadMode::Circular),
            other => Err(DatasetError::Config(format!("Invalid pad mode: `{}`", other))),
        }
    }
}

/// Configuration for a `BeatDataset` instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Root directory searched recursively for `*.wav` files
    pub audio_dir: PathBuf,

    /// Root directory holding the annotation files
    pub annot_dir: PathBuf,

    /// Sample rate audio is decoded/resampled to
    pub sample_rate: u32,

    /// Integer factor between the audio rate and the target rate
    pub target_factor: u32,

    /// Which corpus schema to parse annotations with
    pub dataset: DatasetKind,

    /// Which slice of the shuffled corpus to serve
    pub subset: Subset,

    /// Training example length in audio samples; must be divisible by
    /// `target_factor`
    pub length: usize,

    /// Read the whole subset into memory at construction
    pub preload: bool,

    /// Store preloaded data as f16 instead of f32
    pub half_precision: bool,

    /// Fraction of the subset's files to keep
    pub fraction: f64,

    /// Apply the augmentation chain to training examples
    pub augment: bool,

    /// Augmentation probabilities and parameter ranges
    pub augmentations: AugmentConfig,

    /// Collapse the corpus to a single repeated file
    pub dry_run: bool,

    /// Padding behavior for short examples
    pub pad_mode: PadMode,

    /// Synthetic epoch length for training subsets
    pub examples_per_epoch: usize,

    /// Seed for the corpus shuffle; identical across workers so every worker
    /// sees the same train/val/test split
    pub split_seed: u64,

    /// Seed for crop and augmentation randomness; give each worker its own
    pub sampler_seed: u64,
}

impl DatasetConfig {
    pub fn new(audio_dir: impl Into<PathBuf>, annot_dir: impl Into<PathBuf>) -> Self {
        DatasetConfig {
            audio_dir: audio_dir.into(),
            annot_dir: annot_dir.into(),
            sample_rate: 44100,
            target_factor: 256,
            dataset: DatasetKind::Ballroom,
            subset: Subset::Train,
            length: 16384,
            preload: false,
            half_precision: true,
            fraction: 1.0,
            augment: false,
            augmentations: AugmentConfig::default(),
            dry_run: false,
            pad_mode: PadMode::Constant,
            examples_per_epoch: 1000,
            split_seed: 42,
            sampler_seed: 0,
        }
    }

    /// Length of the dense target for a full training window
    pub fn target_length(&self) -> usize {
        self.length / self.target_factor as usize
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        if self.sample_rate == 0 {
            return Err(DatasetError::Config("sample_rate must be positive".into()));
        }
        if self.target_factor == 0 {
            return Err(DatasetError::Config("target_factor must be positive".into()));
        }
        if self.length == 0 || self.length % self.target_factor as usize != 0 {
            return Err(DatasetError::Config(format!(
                "length ({}) must be a positive multiple of target_factor ({})",
                self.length, self.target_factor
            )));
        }
        if !(self.fraction > 0.0 && self.fraction <= 1.0) {
            return Err(DatasetError::Config(format!(
                "fraction must be in (0, 1], got {}",
                self.fraction
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset_from_str() {
        assert_eq!("train".parse::<Subset>().unwrap(), Subset::Train);
        assert_eq!("full-val".parse::<Subset>().unwrap(), Subset::FullVal);
        assert!(matches!(
            "training".parse::<Subset>(),
            Err(DatasetError::Config(_))
        ));
    }

    #[test]
    fn test_subset_training_flags() {
        assert!(Subset::Train.is_training());
        assert!(Subset::FullTrain.is_training());
        assert!(!Subset::Val.is_training());
        assert!(!Subset::Test.is_training());
        assert!(!Subset::FullVal.is_training());
    }

    #[test]
    fn test_pad_mode_from_str() {
        assert_eq!("reflect".parse::<PadMode>().unwrap(), PadMode::Reflect);
        assert!("mirror".parse::<PadMode>().is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = DatasetConfig::new("/audio", "/annot");
        assert!(config.validate().is_ok());
        assert_eq!(config.target_length(), 64);

        config.length = 1000; // not a multiple of 256
        assert!(config.validate().is_err());

        config.length = 16384;
        config.fraction = 0.0;
        assert!(config.validate().is_err());
    }
}
