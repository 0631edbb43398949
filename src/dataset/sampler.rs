// Example sampling
// Assembles single training/evaluation examples: decode, target rendering,
// length normalization, augmentation, and interval building

use half::f16;
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::config::{DatasetConfig, DatasetError, PadMode};
use super::scan;
use crate::annot::{self, TimeSignature};
use crate::audio;
use crate::augment::Augmenter;
use crate::target::{build_intervals, DenseTarget, Interval, BEAT_CHANNEL, DOWNBEAT_CHANNEL};

/// Side information attached to validation/test examples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Source audio path
    pub filename: PathBuf,

    /// Genre label, taken from the audio file's parent directory name
    pub genre: String,

    /// Time signature inferred from the annotation
    pub time_signature: TimeSignature,
}

/// One assembled example
#[derive(Debug, Clone)]
pub struct Example {
    /// Mono audio, peak-normalized, at the configured sample rate
    pub audio: Vec<f32>,

    /// Interval annotations at the target rate
    pub intervals: Vec<Interval>,

    /// Present for validation/test subsets only
    pub metadata: Option<Metadata>,
}

/// Preloaded sample storage, optionally reduced to f16
#[derive(Debug, Clone)]
enum StoredSamples {
    Full(Vec<f32>),
    Half(Vec<f16>),
}

impl StoredSamples {
    fn store(samples: &[f32], half_precision: bool) -> Self {
        if half_precision {
            StoredSamples::Half(samples.iter().map(|&s| f16::from_f32(s)).collect())
        } else {
            StoredSamples::Full(samples.to_vec())
        }
    }

    fn load(&self) -> Vec<f32> {
        match self {
            StoredSamples::Full(samples) => samples.clone(),
            StoredSamples::Half(samples) => samples.iter().map(|s| s.to_f32()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedExample {
    audio: StoredSamples,
    /// Dense target rows stored back to back: beats then downbeats
    target: StoredSamples,
    target_len: usize,
    metadata: Metadata,
}

/// File-backed (or preloaded) corpus of beat-annotated audio examples.
///
/// Built once per worker; the preload cache is populated in `new()` and
/// read-only afterwards. Give each worker its own `sampler_seed` so crops and
/// augmentations decorrelate while the split (driven by `split_seed`) stays
/// identical everywhere.
#[derive(Debug)]
pub struct BeatDataset {
    config: DatasetConfig,
    files: Vec<PathBuf>,
    cache: Vec<CachedExample>,
    augmenter: Augmenter,
    rng: StdRng,
}

impl BeatDataset {
    pub fn new(config: DatasetConfig) -> Result<Self, DatasetError> {
        config.validate()?;

        let all_files = scan::discover_audio_files(&config.audio_dir)?;
        let files = scan::select_subset(
            all_files,
            config.subset,
            config.split_seed,
            config.fraction,
            config.dry_run,
        );
        if files.is_empty() {
            return Err(DatasetError::Config(format!(
                "Subset {} is empty",
                config.subset.as_str()
            )));
        }

        let augmenter = Augmenter::new(
            config.sample_rate,
            config.target_factor,
            config.augmentations.clone(),
        );
        let rng = StdRng::seed_from_u64(config.sampler_seed);

        let mut dataset = BeatDataset {
            config,
            files,
            cache: Vec::new(),
            augmenter,
            rng,
        };

        if dataset.config.preload {
            dataset.preload()?;
        }

        Ok(dataset)
    }

    fn preload(&mut self) -> Result<(), DatasetError> {
        info!("Preloading {} files into memory", self.files.len());
        let half = self.config.half_precision;

        let mut cache = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let (audio, target, metadata) = self.load_example(file)?;
            let mut flat = target.channel(BEAT_CHANNEL);
            flat.extend(target.channel(DOWNBEAT_CHANNEL));
            cache.push(CachedExample {
                audio: StoredSamples::store(&audio, half),
                target: StoredSamples::store(&flat, half),
                target_len: target.len(),
                metadata,
            });
        }
        self.cache = cache;
        Ok(())
    }

    /// Epoch length: synthetic for training subsets, file count otherwise
    pub fn len(&self) -> usize {
        if self.config.subset.is_training() {
            self.config.examples_per_epoch
        } else {
            self.files.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct files behind this subset
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Assemble the example for `index` (wrapped onto the file list).
    pub fn get(&mut self, index: usize) -> Result<Example, DatasetError> {
        let file_idx = index % self.files.len();

        let (mut audio, mut target, metadata) = if self.config.preload {
            let cached = &self.cache[file_idx];
            let flat = cached.target.load();
            let n = cached.target_len;
            let target = DenseTarget::from_channels(flat[..n].to_vec(), flat[n..].to_vec());
            (cached.audio.load(), target, cached.metadata.clone())
        } else {
            self.load_example(&self.files[file_idx].clone())?
        };

        let training = self.config.subset.is_training();

        if training {
            self.normalize_length(&mut audio, &mut target);

            if self.config.augment {
                self.augmenter.apply(&mut self.rng, &mut audio, &mut target)?;
            }
        }

        let intervals = build_intervals(&target);

        Ok(Example {
            audio,
            intervals,
            metadata: if training { None } else { Some(metadata) },
        })
    }

    /// Decode one file pair from disk into (audio, dense target, metadata).
    fn load_example(
        &self,
        audio_file: &Path,
    ) -> Result<(Vec<f32>, DenseTarget, Metadata), DatasetError> {
        let audio = audio::load_mono(audio_file, self.config.sample_rate)?;

        let annot_path = self
            .config
            .dataset
            .annotation_path(audio_file, &self.config.annot_dir)?;
        let annotation = annot::parse_file(self.config.dataset, &annot_path, self.config.sample_rate)?;

        let target = DenseTarget::render(
            audio.len(),
            self.config.sample_rate,
            self.config.target_factor,
            &annotation,
        );

        let genre = audio_file
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let metadata = Metadata {
            filename: audio_file.to_path_buf(),
            genre,
            time_signature: annotation.time_signature,
        };

        Ok((audio, target, metadata))
    }

    /// Random-crop or pad a training example to exactly the configured window.
    fn normalize_length(&mut self, audio: &mut Vec<f32>, target: &mut DenseTarget) {
        let length = self.config.length;
        let target_length = self.config.target_length();
        let factor = self.config.target_factor as usize;
        let pad_mode = self.config.pad_mode;

        if audio.len() > length {
            let start = self.rng.gen_range(0..audio.len() - length);
            let stop = start + length;
            *audio = audio[start..stop].to_vec();
            *target = target.crop(start / factor, stop / factor);
        }

        if audio.len() < length {
            let deficit = length - audio.len();
            let (left, right) = split_padding(deficit);
            *audio = pad_signal(audio, left, right, pad_mode);
        }

        if target.len() < target_length {
            let deficit = target_length - target.len();
            let (left, right) = split_padding(deficit);
            *target = DenseTarget::from_channels(
                pad_signal(&target.channel(BEAT_CHANNEL), left, right, pad_mode),
                pad_signal(&target.channel(DOWNBEAT_CHANNEL), left, right, pad_mode),
            );
        }
    }
}

/// Split a padding deficit into (left, right) with left >= right and
/// left - right <= 1.
pub fn split_padding(deficit: usize) -> (usize, usize) {
    let right = deficit / 2;
    (deficit - right, right)
}

/// Pad a signal on both sides with the requested mode.
pub fn pad_signal(samples: &[f32], left: usize, right: usize, mode: PadMode) -> Vec<f32> {
    let len = samples.len();
    let total = left + len + right;
    let mut out = Vec::with_capacity(total);

    for i in 0..total {
        let pos = i as isize - left as isize;
        let value = if pos >= 0 && (pos as usize) < len {
            samples[pos as usize]
        } else {
            match mode {
                PadMode::Constant => 0.0,
                PadMode::Replicate => {
                    if len == 0 {
                        0.0
                    } else if pos < 0 {
                        samples[0]
                    } else {
                        samples[len - 1]
                    }
                }
                PadMode::Circular => {
                    if len == 0 {
                        0.0
                    } else {
                        samples[pos.rem_euclid(len as isize) as usize]
                    }
                }
                PadMode::Reflect => {
                    if len <= 1 {
                        samples.first().copied().unwrap_or(0.0)
                    } else {
                        // mirror with period 2(len-1), edges not repeated
                        let period = 2 * (len as isize - 1);
                        let mut p = pos.rem_euclid(period);
                        if p >= len as isize {
                            p = period - p;
                        }
                        samples[p as usize]
                    }
                }
            }
        };
        out.push(value);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annot::DatasetKind;
    use crate::dataset::config::Subset;
    use std::fs;

    const SR: u32 = 8000;
    const FACTOR: u32 = 8;
    const WINDOW: usize = 256;

    /// Lay out a tiny ballroom-style corpus: `n` wav files with annotations.
    fn build_corpus(n: usize, samples_per_file: usize) -> (tempfile::TempDir, DatasetConfig) {
        let dir = tempfile::tempdir().unwrap();
        let audio_dir = dir.path().join("audio").join("waltz");
        let annot_dir = dir.path().join("annot");
        fs::create_dir_all(&audio_dir).unwrap();
        fs::create_dir_all(&annot_dir).unwrap();

        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SR,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        for i in 0..n {
            let path = audio_dir.join(format!("song{:02}.wav", i));
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for t in 0..samples_per_file {
                let v = ((t as f32 * 0.05).sin() * 12000.0) as i16;
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();

            // Beats every 0.01s, downbeats every fourth beat
            let duration = samples_per_file as f64 / SR as f64;
            let mut lines = Vec::new();
            let mut t = 0.0;
            let mut ordinal = 1;
            while t < duration {
                lines.push(format!("{:.3} {}", t, ordinal));
                ordinal = ordinal % 4 + 1;
                t += 0.01;
            }
            fs::write(
                annot_dir.join(format!("song{:02}.beats", i)),
                lines.join("\n"),
            )
            .unwrap();
        }

        let mut config = DatasetConfig::new(dir.path().join("audio"), annot_dir);
        config.sample_rate = SR;
        config.target_factor = FACTOR;
        config.length = WINDOW;
        config.dataset = DatasetKind::Ballroom;
        (dir, config)
    }

    #[test]
    fn test_split_padding_symmetry() {
        for deficit in 0..32 {
            let (left, right) = split_padding(deficit);
            assert_eq!(left + right, deficit);
            assert!(left >= right);
            assert!(left - right <= 1);
        }
    }

    #[test]
    fn test_pad_signal_modes() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];

        assert_eq!(
            pad_signal(&signal, 2, 1, PadMode::Constant),
            vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 0.0]
        );
        assert_eq!(
            pad_signal(&signal, 2, 2, PadMode::Reflect),
            vec![3.0, 2.0, 1.0, 2.0, 3.0, 4.0, 3.0, 2.0]
        );
        assert_eq!(
            pad_signal(&signal, 2, 1, PadMode::Replicate),
            vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0]
        );
        assert_eq!(
            pad_signal(&signal, 2, 2, PadMode::Circular),
            vec![3.0, 4.0, 1.0, 2.0, 3.0, 4.0, 1.0, 2.0]
        );
    }

    #[test]
    fn test_crop_consistency() {
        // For any crop start, the target window is the audio window divided
        // by the factor, and its width is exact because the window length is
        // a multiple of the factor
        let factor = FACTOR as usize;
        for start in [0usize, 1, 7, 255, 1024, 1743] {
            let stop = start + WINDOW;
            let target_start = start / factor;
            let target_stop = stop / factor;
            assert_eq!(target_stop - target_start, WINDOW / factor);
        }
    }

    #[test]
    fn test_training_examples_have_window_length() {
        let (_dir, mut config) = build_corpus(5, 2000);
        config.subset = Subset::FullTrain;
        let mut dataset = BeatDataset::new(config).unwrap();

        assert_eq!(dataset.len(), 1000); // synthetic epoch length

        for idx in 0..5 {
            let example = dataset.get(idx).unwrap();
            assert_eq!(example.audio.len(), WINDOW);
            assert!(example.metadata.is_none());
        }
    }

    #[test]
    fn test_short_file_is_padded() {
        let (_dir, mut config) = build_corpus(2, 100); // shorter than the window
        config.subset = Subset::FullTrain;
        let mut dataset = BeatDataset::new(config).unwrap();

        let example = dataset.get(0).unwrap();
        assert_eq!(example.audio.len(), WINDOW);
    }

    #[test]
    fn test_validation_examples_keep_native_length() {
        let (_dir, mut config) = build_corpus(10, 2000);
        config.subset = Subset::Val;
        let mut dataset = BeatDataset::new(config).unwrap();

        assert_eq!(dataset.len(), 1); // 10% of 10 files
        let example = dataset.get(0).unwrap();
        assert_eq!(example.audio.len(), 2000);

        let metadata = example.metadata.expect("validation examples carry metadata");
        assert_eq!(metadata.genre, "waltz");
        assert_eq!(metadata.time_signature, TimeSignature::FourFour);
        assert!(!example.intervals.is_empty());
    }

    #[test]
    fn test_preload_matches_disk_path() {
        let (_dir, mut config) = build_corpus(4, 2000);
        config.subset = Subset::FullVal;

        let mut from_disk = BeatDataset::new(config.clone()).unwrap();

        config.preload = true;
        config.half_precision = false;
        let mut preloaded = BeatDataset::new(config).unwrap();

        for idx in 0..4 {
            let a = from_disk.get(idx).unwrap();
            let b = preloaded.get(idx).unwrap();
            assert_eq!(a.audio, b.audio);
            assert_eq!(a.intervals, b.intervals);
        }
    }

    #[test]
    fn test_preload_half_precision_approximates() {
        let (_dir, mut config) = build_corpus(2, 1000);
        config.subset = Subset::FullVal;
        config.preload = true;
        config.half_precision = true;
        let mut dataset = BeatDataset::new(config).unwrap();

        let example = dataset.get(0).unwrap();
        assert_eq!(example.audio.len(), 1000);
        // f16 storage keeps values close to full precision
        assert!(example.audio.iter().all(|s| s.abs() <= 1.001));
    }

    #[test]
    fn test_dry_run_single_file() {
        let (_dir, mut config) = build_corpus(5, 2000);
        config.dry_run = true;
        config.subset = Subset::FullVal;
        let dataset = BeatDataset::new(config).unwrap();
        assert_eq!(dataset.file_count(), 50);
    }

    #[test]
    fn test_missing_annotation_fails_example() {
        let (dir, mut config) = build_corpus(3, 1000);
        config.subset = Subset::FullVal;

        // Remove one annotation file; the corresponding example must fail
        let mut removed = None;
        for entry in fs::read_dir(dir.path().join("annot")).unwrap() {
            let path = entry.unwrap().path();
            removed = Some(path.clone());
            fs::remove_file(path).unwrap();
            break;
        }
        assert!(removed.is_some());

        let mut dataset = BeatDataset::new(config).unwrap();
        let failures = (0..3).filter(|&i| dataset.get(i).is_err()).count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn test_augmented_examples_stay_aligned() {
        let (_dir, mut config) = build_corpus(3, 2000);
        config.subset = Subset::FullTrain;
        config.augment = true;
        let mut dataset = BeatDataset::new(config).unwrap();

        for idx in 0..8 {
            let example = dataset.get(idx).unwrap();
            assert_eq!(example.audio.len(), WINDOW);
            let target_len = WINDOW / FACTOR as usize;
            for interval in &example.intervals {
                assert!(interval.start < interval.end);
                assert!(interval.end < target_len + 1);
            }
        }
    }
}
