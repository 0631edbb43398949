// Dataset module
// Corpus discovery, example sampling, and batch collation

pub mod collate;
pub mod config;
pub mod sampler;
pub mod scan;

pub use collate::{collate, Batch, SENTINEL};
pub use config::{DatasetConfig, DatasetError, PadMode, Subset};
pub use sampler::{pad_signal, split_padding, BeatDataset, Example, Metadata};
pub use scan::{discover_audio_files, select_subset};
