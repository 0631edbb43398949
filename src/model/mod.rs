// Model module
// The downsampling temporal backbone and its building-block layers

pub mod backbone;
pub mod layers;

pub use backbone::{Backbone, BackboneConfig, ModelError};
pub use layers::{Activation, ActivationKind, BatchNorm1d, Conv1d, GroupNorm, Norm, NormKind};
