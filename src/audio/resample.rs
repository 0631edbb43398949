// Sample-rate conversion built on rubato
// Converts decoded audio to the configured training rate and backs the
// resampling-based pitch shift in the augmentation chain

use log::debug;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Resample a mono signal from `from_rate` to `to_rate`.
///
/// If the rates already match, the input is returned as a copy.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, String> {
    if from_rate == to_rate {
        return Ok(input.to_vec());
    }

    debug!("Resampling {} frames from {}Hz to {}Hz", input.len(), from_rate, to_rate);
    resample_by_ratio(input, to_rate as f64 / from_rate as f64)
}

/// Resample a mono signal by an arbitrary output/input ratio.
///
/// The whole signal is processed as a single chunk; the output length is
/// approximately `input.len() * ratio`.
pub fn resample_by_ratio(input: &[f32], ratio: f64) -> Result<Vec<f32>, String> {
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(format!("Invalid resample ratio: {}", ratio));
    }

    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0, // fixed ratio, no runtime adjustment
        PolynomialDegree::Septic,
        input.len(),
        1,
    )
    .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let output = resampler
        .process(&[input.to_vec()], None)
        .map_err(|e| format!("Resampling failed: {}", e))?;

    Ok(output.into_iter().next().unwrap_or_default())
}
