// Audio processing module
// Handles WAV file ingestion, mono conversion, and sample-rate conversion

pub mod ingest;
pub mod resample;

pub use ingest::{ingest_wav, load_mono, peak_normalize, AudioData, AudioError};
pub use resample::{resample, resample_by_ratio};
