// Audio effect processing for augmentation
// Filter, EQ, and chorus stages run through fundsp units; the compressor is
// a plain envelope follower; pitch shifting rides on the resampler

use fundsp::hacker32::AudioUnit;

use crate::audio::resample;

/// Q of a 2nd-order Butterworth response
const BUTTERWORTH_Q: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Compressor gain computer settings (attack/release are sampled per example)
const COMPRESSOR_THRESHOLD: f32 = 0.5;
const COMPRESSOR_RATIO: f32 = 4.0;

/// Run a 1-in/1-out fundsp unit over a sample buffer in place.
fn run_unit(unit: &mut dyn AudioUnit, sample_rate: u32, samples: &mut [f32]) {
    unit.set_sample_rate(sample_rate as f64);
    unit.reset();

    let mut out = [0.0f32; 1];
    for s in samples.iter_mut() {
        unit.tick(&[*s], &mut out);
        *s = out[0];
    }
}

/// 2nd-order Butterworth lowpass
pub fn lowpass(samples: &mut [f32], sample_rate: u32, cutoff_hz: f32) {
    use fundsp::hacker32::butterpass_hz;
    run_unit(&mut butterpass_hz(cutoff_hz), sample_rate, samples);
}

/// 2nd-order highpass at Butterworth Q
pub fn highpass(samples: &mut [f32], sample_rate: u32, cutoff_hz: f32) {
    use fundsp::hacker32::highpass_hz;
    run_unit(&mut highpass_hz(cutoff_hz, BUTTERWORTH_Q), sample_rate, samples);
}

/// Parametric bell EQ with gain in dB
pub fn bell_eq(samples: &mut [f32], sample_rate: u32, freq_hz: f32, q: f32, gain_db: f32) {
    use fundsp::hacker32::{bell_hz, db_amp};
    run_unit(&mut bell_hz(freq_hz, q, db_amp(gain_db)), sample_rate, samples);
}

/// Chorus with fixed default voicing
pub fn chorus_effect(samples: &mut [f32], sample_rate: u32) {
    use fundsp::hacker32::chorus;
    run_unit(&mut chorus(0, 0.015, 0.005, 0.5), sample_rate, samples);
}

/// Feed-forward dynamic-range compression.
///
/// A one-pole envelope follower with separate attack/release time constants
/// drives a fixed-threshold, fixed-ratio gain computer.
pub fn compress(samples: &mut [f32], sample_rate: u32, attack_secs: f32, release_secs: f32) {
    if samples.is_empty() || attack_secs <= 0.0 || release_secs <= 0.0 {
        return;
    }

    let sr = sample_rate as f32;
    let attack_coeff = (-1.0 / (attack_secs * sr)).exp();
    let release_coeff = (-1.0 / (release_secs * sr)).exp();

    let mut envelope = 0.0f32;
    for s in samples.iter_mut() {
        let level = s.abs();
        let coeff = if level > envelope {
            attack_coeff
        } else {
            release_coeff
        };
        envelope = coeff * envelope + (1.0 - coeff) * level;

        if envelope > COMPRESSOR_THRESHOLD {
            let compressed =
                COMPRESSOR_THRESHOLD + (envelope - COMPRESSOR_THRESHOLD) / COMPRESSOR_RATIO;
            *s *= compressed / envelope;
        }
    }
}

/// Resampling-based pitch shift.
///
/// Resamples by `2^(-semitones / 12)` and re-fits the result to the original
/// sample count so the caller's audio/target alignment is preserved.
pub fn pitch_shift(samples: &[f32], semitones: f64) -> Result<Vec<f32>, String> {
    let ratio = 2.0f64.powf(-semitones / 12.0);
    let mut shifted = resample::resample_by_ratio(samples, ratio)?;
    fit_length(&mut shifted, samples.len());
    Ok(shifted)
}

/// Truncate or zero-pad a buffer to exactly `len` samples.
pub fn fit_length(samples: &mut Vec<f32>, len: usize) {
    if samples.len() > len {
        samples.truncate(len);
    } else {
        samples.resize(len, 0.0);
    }
}
