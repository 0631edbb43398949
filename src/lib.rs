// Beatforge - Beat/downbeat detection training-data pipeline
// Module declarations

pub mod annot;
pub mod audio;
pub mod augment;
pub mod dataset;
pub mod model;
pub mod target;

pub use annot::{AnnotError, Annotation, DatasetKind, TimeSignature};
pub use audio::{AudioData, AudioError};
pub use augment::{AugmentConfig, Augmenter};
pub use dataset::{
    collate, Batch, BeatDataset, DatasetConfig, DatasetError, Example, Metadata, PadMode, Subset,
};
pub use model::{Backbone, BackboneConfig, ModelError};
pub use target::{build_intervals, DenseTarget, Interval, IntervalClass};
