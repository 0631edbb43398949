// Dense target rendering
// Converts sample-domain beat positions into a two-channel indicator signal
// at the reduced target rate consumed by the detection head

use ndarray::Array2;

use crate::annot::Annotation;

/// Row index of the beat indicator channel
pub const BEAT_CHANNEL: usize = 0;

/// Row index of the downbeat indicator channel
pub const DOWNBEAT_CHANNEL: usize = 1;

/// A 2xN indicator matrix at the target rate.
///
/// Row 0 marks beats, row 1 marks downbeats; values are 0 or 1. The target
/// rate is `sample_rate / target_factor` and N is
/// `trunc(duration_seconds * target_rate) + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseTarget {
    data: Array2<f32>,
}

impl DenseTarget {
    /// Render a target from an annotation.
    ///
    /// Every position is rescaled source samples -> seconds -> target samples
    /// through the same conversion so both channels round identically.
    /// Positions at or past the end of the target are dropped; positions that
    /// collide after rescaling collapse into a single 1.
    pub fn render(
        audio_len: usize,
        sample_rate: u32,
        target_factor: u32,
        annot: &Annotation,
    ) -> DenseTarget {
        let target_rate = sample_rate as f64 / target_factor as f64;
        let duration = audio_len as f64 / sample_rate as f64;
        let len = (duration * target_rate) as usize + 1;

        let mut data = Array2::zeros((2, len));
        for &pos in &annot.beat_samples {
            let idx = to_target_index(pos, sample_rate, target_rate);
            if idx < len {
                data[[BEAT_CHANNEL, idx]] = 1.0;
            }
        }
        for &pos in &annot.downbeat_samples {
            let idx = to_target_index(pos, sample_rate, target_rate);
            if idx < len {
                data[[DOWNBEAT_CHANNEL, idx]] = 1.0;
            }
        }

        DenseTarget { data }
    }

    /// Build a target directly from per-channel active indices.
    /// Out-of-range indices are dropped.
    pub fn from_indices(len: usize, beats: &[usize], downbeats: &[usize]) -> DenseTarget {
        let mut data = Array2::zeros((2, len));
        for &idx in beats {
            if idx < len {
                data[[BEAT_CHANNEL, idx]] = 1.0;
            }
        }
        for &idx in downbeats {
            if idx < len {
                data[[DOWNBEAT_CHANNEL, idx]] = 1.0;
            }
        }
        DenseTarget { data }
    }

    /// Wrap an existing 2xN matrix
    pub fn from_array(data: Array2<f32>) -> DenseTarget {
        assert_eq!(data.nrows(), 2, "dense target must have exactly 2 channels");
        DenseTarget { data }
    }

    /// Number of target-rate samples
    pub fn len(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.ncols() == 0
    }

    /// Underlying 2xN matrix
    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    /// Ascending indices of active (nonzero) samples in one channel
    pub fn active_indices(&self, channel: usize) -> Vec<usize> {
        self.data
            .row(channel)
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    /// One channel as a plain vector (used for padding)
    pub fn channel(&self, channel: usize) -> Vec<f32> {
        self.data.row(channel).to_vec()
    }

    /// Rebuild from two equal-length channel vectors
    pub fn from_channels(beats: Vec<f32>, downbeats: Vec<f32>) -> DenseTarget {
        assert_eq!(beats.len(), downbeats.len());
        let len = beats.len();
        let mut data = Array2::zeros((2, len));
        for (i, v) in beats.into_iter().enumerate() {
            data[[BEAT_CHANNEL, i]] = v;
        }
        for (i, v) in downbeats.into_iter().enumerate() {
            data[[DOWNBEAT_CHANNEL, i]] = v;
        }
        DenseTarget { data }
    }

    /// Copy of the column range [start, stop)
    pub fn crop(&self, start: usize, stop: usize) -> DenseTarget {
        let stop = stop.min(self.len());
        let start = start.min(stop);
        DenseTarget {
            data: self.data.slice(ndarray::s![.., start..stop]).to_owned(),
        }
    }

    /// Zero both channels over the column range [start, stop)
    pub fn zero_range(&mut self, start: usize, stop: usize) {
        let stop = stop.min(self.len());
        for ch in 0..2 {
            for i in start..stop {
                self.data[[ch, i]] = 0.0;
            }
        }
    }
}

fn to_target_index(sample_pos: usize, sample_rate: u32, target_rate: f64) -> usize {
    let seconds = sample_pos as f64 / sample_rate as f64;
    (seconds * target_rate) as usize
}
