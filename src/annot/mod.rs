// Beat annotation parsing
// Normalizes per-corpus annotation files into sample-domain beat and
// downbeat positions with an inferred time signature

pub mod format;

pub use format::{AnnotError, DatasetKind};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Musical time signature inferred from annotated beat ordinals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSignature {
    /// 2/4 time (2 beats per bar)
    TwoFour,

    /// 3/4 time - waltz feel (3 beats per bar)
    ThreeFour,

    /// 4/4 time - most common (4 beats per bar)
    FourFour,

    /// No usable ordinal information
    Unknown,
}

impl TimeSignature {
    /// Infer the signature from the maximum beat ordinal seen in a file.
    /// This is a heuristic, not a guarantee.
    pub fn from_max_ordinal(max_ordinal: Option<u32>) -> Self {
        match max_ordinal {
            Some(2) => TimeSignature::TwoFour,
            Some(3) => TimeSignature::ThreeFour,
            Some(4) => TimeSignature::FourFour,
            _ => TimeSignature::Unknown,
        }
    }

    /// Get number of beats per bar, if known
    pub fn beats_per_bar(&self) -> Option<u32> {
        match self {
            TimeSignature::TwoFour => Some(2),
            TimeSignature::ThreeFour => Some(3),
            TimeSignature::FourFour => Some(4),
            TimeSignature::Unknown => None,
        }
    }

    /// Conventional display form ("4/4", or "?" when unknown)
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSignature::TwoFour => "2/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::FourFour => "4/4",
            TimeSignature::Unknown => "?",
        }
    }
}

/// Normalized beat annotation for one audio file
///
/// Positions are integer sample indices at the source audio rate.
/// Every downbeat position also appears in `beat_samples`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Sample positions of all beats, in file order
    pub beat_samples: Vec<usize>,

    /// Sample positions of downbeats (ordinal-1 beats), in file order
    pub downbeat_samples: Vec<usize>,

    /// Beat ordinal per entry of `beat_samples` (1 = downbeat)
    pub beat_ordinals: Vec<u32>,

    /// Time signature inferred from the maximum observed ordinal
    pub time_signature: TimeSignature,
}

impl Annotation {
    /// True when the file carries no events at all
    pub fn is_empty(&self) -> bool {
        self.beat_samples.is_empty()
    }
}

/// Parse an annotation file into sample-domain positions.
///
/// Every line contributes a beat at `trunc(seconds * sample_rate)`; lines
/// with ordinal 1 additionally contribute the same position as a downbeat.
/// A line that does not match the corpus schema fails the whole file.
pub fn parse_file(
    kind: DatasetKind,
    path: &Path,
    sample_rate: u32,
) -> Result<Annotation, AnnotError> {
    let contents = std::fs::read_to_string(path)?;

    let mut beat_samples = Vec::new();
    let mut downbeat_samples = Vec::new();
    let mut beat_ordinals = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let (seconds, ordinal) =
            kind.parse_line(line)
                .map_err(|reason| AnnotError::FormatError {
                    file: path.to_path_buf(),
                    line: line_no + 1,
                    reason,
                })?;

        let position = (seconds * sample_rate as f64) as usize;
        beat_samples.push(position);
        beat_ordinals.push(ordinal);

        if ordinal == 1 {
            downbeat_samples.push(position);
        }
    }

    let time_signature = TimeSignature::from_max_ordinal(beat_ordinals.iter().copied().max());

    Ok(Annotation {
        beat_samples,
        downbeat_samples,
        beat_ordinals,
        time_signature,
    })
}
