// Interval annotations
// Converts the dense indicator signal into (start, end, class) spans between
// consecutive same-class events, the detection-style annotation format

use serde::{Deserialize, Serialize};

use super::render::{DenseTarget, BEAT_CHANNEL, DOWNBEAT_CHANNEL};

/// Class of an interval annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalClass {
    /// Span between two consecutive downbeats
    DownbeatSpan,

    /// Span between two consecutive beats
    BeatSpan,
}

impl IntervalClass {
    /// Numeric class id used in batch tensors (0 = downbeat span, 1 = beat span)
    pub fn id(&self) -> usize {
        match self {
            IntervalClass::DownbeatSpan => 0,
            IntervalClass::BeatSpan => 1,
        }
    }
}

/// A labeled span between two consecutive same-class events, in target-rate
/// samples. Plays the role a bounding box plays in image detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start position (earlier event), target-rate samples
    pub start: usize,

    /// End position (later event), target-rate samples
    pub end: usize,

    /// Span class
    pub class: IntervalClass,
}

/// Build interval annotations from a dense target.
///
/// Each channel with at least two active samples contributes one interval per
/// consecutive pair; a channel with fewer than two events contributes nothing.
/// A file where both channels are under-populated yields an empty list, which
/// is expected for sparsely annotated corpora and is not an error.
pub fn build_intervals(target: &DenseTarget) -> Vec<Interval> {
    let mut intervals = Vec::new();
    channel_intervals(
        &target.active_indices(DOWNBEAT_CHANNEL),
        IntervalClass::DownbeatSpan,
        &mut intervals,
    );
    channel_intervals(
        &target.active_indices(BEAT_CHANNEL),
        IntervalClass::BeatSpan,
        &mut intervals,
    );
    intervals
}

fn channel_intervals(positions: &[usize], class: IntervalClass, out: &mut Vec<Interval>) {
    if positions.len() < 2 {
        return;
    }
    for pair in positions.windows(2) {
        out.push(Interval {
            start: pair[0],
            end: pair[1],
            class,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_counts() {
        // 5 beats and 2 downbeats: 4 beat spans, 1 downbeat span
        let target = DenseTarget::from_indices(200, &[10, 40, 70, 100, 130], &[10, 130]);
        let intervals = build_intervals(&target);

        let downbeat_spans: Vec<_> = intervals
            .iter()
            .filter(|iv| iv.class == IntervalClass::DownbeatSpan)
            .collect();
        let beat_spans: Vec<_> = intervals
            .iter()
            .filter(|iv| iv.class == IntervalClass::BeatSpan)
            .collect();

        assert_eq!(downbeat_spans.len(), 1);
        assert_eq!(beat_spans.len(), 4);
        assert_eq!(downbeat_spans[0].start, 10);
        assert_eq!(downbeat_spans[0].end, 130);
        assert_eq!(beat_spans[0].start, 10);
        assert_eq!(beat_spans[0].end, 40);
    }

    #[test]
    fn test_single_event_per_channel_yields_nothing() {
        let target = DenseTarget::from_indices(100, &[42], &[42]);
        assert!(build_intervals(&target).is_empty());
    }

    #[test]
    fn test_channels_are_independent() {
        // One downbeat only, but three beats: beat spans still come through
        let target = DenseTarget::from_indices(100, &[10, 30, 50], &[10]);
        let intervals = build_intervals(&target);

        assert_eq!(intervals.len(), 2);
        assert!(intervals.iter().all(|iv| iv.class == IntervalClass::BeatSpan));
    }

    #[test]
    fn test_empty_target() {
        let target = DenseTarget::from_indices(100, &[], &[]);
        assert!(build_intervals(&target).is_empty());
    }

    #[test]
    fn test_class_ids() {
        assert_eq!(IntervalClass::DownbeatSpan.id(), 0);
        assert_eq!(IntervalClass::BeatSpan.id(), 1);
    }
}
