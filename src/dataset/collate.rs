// Batch collation
// Stacks equal-length examples into fixed-shape tensors, padding the
// per-example interval lists with sentinel rows

use ndarray::Array3;

use super::config::DatasetError;
use super::sampler::{Example, Metadata};

/// Value filling unused annotation rows ("no object")
pub const SENTINEL: f32 = -1.0;

/// A collated batch
#[derive(Debug, Clone)]
pub struct Batch {
    /// Audio tensor, shape (batch, 1, samples)
    pub audio: Array3<f32>,

    /// Interval tensor, shape (batch, max(max_intervals, 1), 3); each row is
    /// (start, end, class id), unused rows are all-sentinel
    pub annotations: Array3<f32>,

    /// Per-example metadata, present when every example carries it
    pub metadata: Option<Vec<Metadata>>,
}

/// Stack examples into a batch.
///
/// All examples must share the same audio length (the training sampler's
/// fixed-window contract guarantees this). The annotation tensor always has
/// at least one row so downstream shapes stay rectangular even when no
/// example has any interval.
pub fn collate(examples: Vec<Example>) -> Result<Batch, DatasetError> {
    if examples.is_empty() {
        return Err(DatasetError::Config("Cannot collate an empty batch".into()));
    }

    let batch = examples.len();
    let audio_len = examples[0].audio.len();
    if examples.iter().any(|e| e.audio.len() != audio_len) {
        return Err(DatasetError::Config(
            "All examples in a batch must share the same audio length".into(),
        ));
    }

    let max_intervals = examples.iter().map(|e| e.intervals.len()).max().unwrap_or(0);
    let rows = max_intervals.max(1);

    let mut audio = Array3::zeros((batch, 1, audio_len));
    let mut annotations = Array3::from_elem((batch, rows, 3), SENTINEL);
    let mut metadata = Vec::new();

    for (b, example) in examples.into_iter().enumerate() {
        for (i, &s) in example.audio.iter().enumerate() {
            audio[[b, 0, i]] = s;
        }
        for (row, interval) in example.intervals.iter().enumerate() {
            annotations[[b, row, 0]] = interval.start as f32;
            annotations[[b, row, 1]] = interval.end as f32;
            annotations[[b, row, 2]] = interval.class.id() as f32;
        }
        if let Some(meta) = example.metadata {
            metadata.push(meta);
        }
    }

    let metadata = if metadata.len() == batch {
        Some(metadata)
    } else {
        None
    };

    Ok(Batch {
        audio,
        annotations,
        metadata,
    })
}
