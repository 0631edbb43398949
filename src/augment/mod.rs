// Randomized training augmentations
// A fixed-order chain of independently gated transforms applied jointly to
// the audio and its dense target, preserving sample-count alignment

pub mod effects;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::audio::{peak_normalize, AudioError};
use crate::target::{DenseTarget, BEAT_CHANNEL, DOWNBEAT_CHANNEL};

/// Gating probabilities and parameter ranges for the augmentation chain.
///
/// Defaults reproduce the training recipe; tests pin individual
/// probabilities to 0 or 1 to exercise single stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AugmentConfig {
    /// Negate all samples
    pub invert_prob: f64,

    /// Zero a contiguous window in audio and target
    pub silence_prob: f64,

    /// Window length as a fraction of the example length
    pub silence_fraction: f64,

    /// Perturb every event index by an independent Gaussian offset
    pub jitter_prob: f64,

    /// Jitter window in seconds; the Gaussian std is half of this,
    /// expressed in target-rate samples
    pub jitter_window_secs: f64,

    /// Resampling-based pitch shift, audio only
    pub pitch_prob: f64,

    /// Maximum pitch shift magnitude in semitones
    pub pitch_max_semitones: f64,

    /// Butterworth lowpass, cutoff uniform in [4000, 8000] Hz
    pub lowpass_prob: f64,

    /// Highpass, cutoff uniform in [20, 1020] Hz
    pub highpass_prob: f64,

    /// Chorus with fixed voicing
    pub chorus_prob: f64,

    /// Compressor, attack uniform in [5, 305] ms, release in [300, 1300] ms
    pub compress_prob: f64,

    /// Bell EQ, frequency uniform in [60, 8060] Hz, Q in [0.1, 7.1],
    /// gain ~ Normal(0, 6) dB
    pub eq_prob: f64,

    /// Additive white noise
    pub noise_prob: f64,

    /// tanh saturation
    pub saturate_prob: f64,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        AugmentConfig {
            invert_prob: 0.5,
            silence_prob: 0.05,
            silence_fraction: 0.1,
            jitter_prob: 0.3,
            jitter_window_secs: 0.045,
            pitch_prob: 0.5,
            pitch_max_semitones: 8.0,
            lowpass_prob: 0.1,
            highpass_prob: 0.1,
            chorus_prob: 0.05,
            compress_prob: 0.15,
            eq_prob: 0.15,
            noise_prob: 0.05,
            saturate_prob: 0.2,
        }
    }
}

/// Applies the augmentation chain to one training example.
///
/// Transforms run in a fixed order, each consuming the previous output, and
/// every step leaves the audio and target sample counts unchanged. The final
/// peak normalization always runs.
#[derive(Debug, Clone)]
pub struct Augmenter {
    sample_rate: u32,
    target_factor: u32,
    config: AugmentConfig,
}

impl Augmenter {
    pub fn new(sample_rate: u32, target_factor: u32, config: AugmentConfig) -> Self {
        Augmenter {
            sample_rate,
            target_factor,
            config,
        }
    }

    /// Apply the chain in place.
    pub fn apply<R: Rng>(
        &self,
        rng: &mut R,
        audio: &mut Vec<f32>,
        target: &mut DenseTarget,
    ) -> Result<(), AudioError> {
        let cfg = &self.config;

        // 1. phase inversion
        if rng.gen::<f64>() < cfg.invert_prob {
            for s in audio.iter_mut() {
                *s = -*s;
            }
        }

        // 2. silence a contiguous window, audio and target together
        if rng.gen::<f64>() < cfg.silence_prob {
            self.silence_window(rng, audio, target);
        }

        // 3. temporal jitter of event positions
        if rng.gen::<f64>() < cfg.jitter_prob {
            self.jitter_events(rng, target);
        }

        // 4. pitch shift, audio only
        if rng.gen::<f64>() < cfg.pitch_prob {
            let sign = if rng.gen::<f64>() < 0.5 { -1.0 } else { 1.0 };
            let semitones = sign * rng.gen::<f64>() * cfg.pitch_max_semitones;
            *audio = effects::pitch_shift(audio, semitones).map_err(AudioError::ResampleError)?;
        }

        // 5. lowpass
        if rng.gen::<f64>() < cfg.lowpass_prob {
            let cutoff = (rng.gen::<f64>() * 4000.0 + 4000.0) as f32;
            effects::lowpass(audio, self.sample_rate, cutoff);
        }

        // 6. highpass
        if rng.gen::<f64>() < cfg.highpass_prob {
            let cutoff = (rng.gen::<f64>() * 1000.0 + 20.0) as f32;
            effects::highpass(audio, self.sample_rate, cutoff);
        }

        // 7. chorus
        if rng.gen::<f64>() < cfg.chorus_prob {
            effects::chorus_effect(audio, self.sample_rate);
        }

        // 8. compression
        if rng.gen::<f64>() < cfg.compress_prob {
            let attack = (rng.gen::<f64>() * 0.300 + 0.005) as f32;
            let release = (rng.gen::<f64>() * 1.000 + 0.300) as f32;
            effects::compress(audio, self.sample_rate, attack, release);
        }

        // 9. parametric EQ
        if rng.gen::<f64>() < cfg.eq_prob {
            let freq = (rng.gen::<f64>() * 8000.0 + 60.0) as f32;
            let q = (rng.gen::<f64>() * 7.0 + 0.1) as f32;
            let gain_db = sample_normal(rng, 0.0, 6.0) as f32;
            effects::bell_eq(audio, self.sample_rate, freq, q, gain_db);
        }

        // 10. additive white noise
        if rng.gen::<f64>() < cfg.noise_prob {
            // Intentionally not a plain dB-to-linear conversion.
            let gain = (10.0f64.powf(-(rng.gen::<f64>() * 20.0) - 12.0) / 20.0) as f32;
            for s in audio.iter_mut() {
                let wn = rng.gen::<f32>() * 2.0 - 1.0;
                *s += gain * wn;
            }
        }

        // 11. saturation
        if rng.gen::<f64>() < cfg.saturate_prob {
            for s in audio.iter_mut() {
                *s = s.tanh();
            }
        }

        // 12. final peak normalization
        peak_normalize(audio);

        Ok(())
    }

    fn silence_window<R: Rng>(&self, rng: &mut R, audio: &mut [f32], target: &mut DenseTarget) {
        let zero_len = (audio.len() as f64 * self.config.silence_fraction) as usize;
        if zero_len == 0 || audio.len() <= zero_len + 1 {
            return;
        }

        let start = rng.gen_range(0..audio.len() - zero_len);
        let stop = start + zero_len;
        for s in &mut audio[start..stop] {
            *s = 0.0;
        }

        let factor = self.target_factor as usize;
        target.zero_range(start / factor, stop / factor);
    }

    /// Shift every active index in each channel by its own Gaussian draw.
    ///
    /// The channels are jittered independently, so a downbeat's copy in the
    /// beat channel can land on a different index than its copy in the
    /// downbeat channel. Offsets are truncated to whole samples; indices
    /// jittered outside [0, len) are dropped.
    fn jitter_events<R: Rng>(&self, rng: &mut R, target: &mut DenseTarget) {
        let target_rate = self.sample_rate as f64 / self.target_factor as f64;
        let max_shift = (self.config.jitter_window_secs * target_rate).trunc();
        let std = max_shift / 2.0;

        let normal = match Normal::new(0.0, std) {
            Ok(n) => n,
            Err(_) => return,
        };

        let len = target.len();
        let mut shifted = [Vec::new(), Vec::new()];
        for (slot, channel) in shifted.iter_mut().zip([BEAT_CHANNEL, DOWNBEAT_CHANNEL]) {
            for idx in target.active_indices(channel) {
                let moved = idx as i64 + normal.sample(rng).trunc() as i64;
                if moved >= 0 && (moved as usize) < len {
                    slot.push(moved as usize);
                }
            }
        }

        *target = DenseTarget::from_indices(len, &shifted[0], &shifted[1]);
    }
}

fn sample_normal<R: Rng>(rng: &mut R, mean: f64, std: f64) -> f64 {
    match Normal::new(mean, std) {
        Ok(n) => n.sample(rng),
        Err(_) => mean,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn silent_config() -> AugmentConfig {
        AugmentConfig {
            invert_prob: 0.0,
            silence_prob: 0.0,
            silence_fraction: 0.1,
            jitter_prob: 0.0,
            jitter_window_secs: 0.045,
            pitch_prob: 0.0,
            pitch_max_semitones: 8.0,
            lowpass_prob: 0.0,
            highpass_prob: 0.0,
            chorus_prob: 0.0,
            compress_prob: 0.0,
            eq_prob: 0.0,
            noise_prob: 0.0,
            saturate_prob: 0.0,
        }
    }

    fn test_example(len: usize, factor: u32) -> (Vec<f32>, DenseTarget) {
        let audio: Vec<f32> = (0..len).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        let target_len = len / factor as usize + 1;
        let beats: Vec<usize> = (0..target_len).step_by(8).collect();
        let downbeats: Vec<usize> = (0..target_len).step_by(32).collect();
        let target = DenseTarget::from_indices(target_len, &beats, &downbeats);
        (audio, target)
    }

    #[test]
    fn test_chain_always_peak_normalizes() {
        let (mut audio, mut target) = test_example(4096, 256);
        let augmenter = Augmenter::new(44100, 256, silent_config());
        let mut rng = StdRng::seed_from_u64(7);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();
        let peak = audio.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_phase_inversion() {
        let (mut audio, mut target) = test_example(4096, 256);
        let mut expected = audio.clone();
        for s in expected.iter_mut() {
            *s = -*s;
        }
        peak_normalize(&mut expected);

        let mut config = silent_config();
        config.invert_prob = 1.0;
        let augmenter = Augmenter::new(44100, 256, config);
        let mut rng = StdRng::seed_from_u64(7);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();
        assert_eq!(audio, expected);
    }

    #[test]
    fn test_silence_window_zeroes_audio_and_target() {
        let audio_len = 8192usize;
        let mut audio: Vec<f32> = (0..audio_len).map(|i| ((i as f32) * 0.01).sin() * 0.5).collect();
        // Every target index active, so any zeroed stretch removes events
        let target_len = audio_len / 256 + 1;
        let all: Vec<usize> = (0..target_len).collect();
        let mut target = DenseTarget::from_indices(target_len, &all, &all);

        let mut config = silent_config();
        config.silence_prob = 1.0;
        let augmenter = Augmenter::new(44100, 256, config);
        let mut rng = StdRng::seed_from_u64(3);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();

        // A contiguous run of 10% of the audio is gone
        let zero_len = (audio_len as f64 * 0.1) as usize;
        let has_zero_run = audio
            .windows(zero_len)
            .any(|w| w.iter().all(|&s| s == 0.0));
        assert!(has_zero_run);

        // The aligned stretch of the target went with it
        assert!(target.active_indices(BEAT_CHANNEL).len() < target_len);
        assert_eq!(
            target.active_indices(BEAT_CHANNEL),
            target.active_indices(DOWNBEAT_CHANNEL)
        );
    }

    #[test]
    fn test_jitter_keeps_indices_in_range() {
        let (mut audio, mut target) = test_example(16384, 256);
        let beats_before = target.active_indices(BEAT_CHANNEL).len();
        let downbeats_before = target.active_indices(DOWNBEAT_CHANNEL).len();

        let mut config = silent_config();
        config.jitter_prob = 1.0;
        let augmenter = Augmenter::new(44100, 256, config);
        let mut rng = StdRng::seed_from_u64(11);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();

        let len = target.len();
        let beats = target.active_indices(BEAT_CHANNEL);
        let downbeats = target.active_indices(DOWNBEAT_CHANNEL);
        assert!(beats.iter().all(|&i| i < len));
        assert!(downbeats.iter().all(|&i| i < len));

        // Events can only be lost (clipping or collisions), never created
        assert!(beats.len() <= beats_before);
        assert!(downbeats.len() <= downbeats_before);

        // NOTE: the channels are jittered independently, so downbeat indices
        // are NOT asserted to remain a subset of beat indices here; that
        // relation is allowed to break.
    }

    #[test]
    fn test_pitch_shift_preserves_alignment() {
        let (mut audio, mut target) = test_example(8192, 256);
        let audio_len = audio.len();
        let target_len = target.len();

        let mut config = silent_config();
        config.pitch_prob = 1.0;
        let augmenter = Augmenter::new(44100, 256, config);
        let mut rng = StdRng::seed_from_u64(19);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();
        assert_eq!(audio.len(), audio_len);
        assert_eq!(target.len(), target_len);
    }

    #[test]
    fn test_noise_gain_is_negligible() {
        // The literal gain law lands many orders of magnitude below the
        // signal, so the audio is numerically unchanged after normalization.
        let (mut audio, mut target) = test_example(4096, 256);
        let mut expected = audio.clone();
        peak_normalize(&mut expected);

        let mut config = silent_config();
        config.noise_prob = 1.0;
        let augmenter = Augmenter::new(44100, 256, config);
        let mut rng = StdRng::seed_from_u64(23);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();
        for (a, e) in audio.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_saturation_bounds_samples() {
        let (mut audio, mut target) = test_example(4096, 256);
        for s in audio.iter_mut() {
            *s *= 10.0;
        }

        let mut config = silent_config();
        config.saturate_prob = 1.0;
        let augmenter = Augmenter::new(44100, 256, config);
        let mut rng = StdRng::seed_from_u64(29);

        augmenter.apply(&mut rng, &mut audio, &mut target).unwrap();
        assert!(audio.iter().all(|s| s.abs() <= 1.0));
    }
}
