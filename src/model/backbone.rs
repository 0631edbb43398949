// Downsampling temporal backbone
// A stack of residual dilated-convolution blocks that halves temporal
// resolution per block and exposes the deepest activations as a feature
// pyramid for an external detection head

use ndarray::Array3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::layers::{Activation, ActivationKind, BatchNorm1d, Conv1d, GroupNorm, Norm, NormKind};

/// Channel count per group-norm group in the reference topology
const GROUP_NORM_GROUPS: usize = 32;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Invalid model configuration: {0}")]
    Config(String),
}

/// Backbone hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackboneConfig {
    /// Input channels (1 for mono audio)
    pub input_channels: usize,

    /// Output channel count consumed by the external detection head
    /// (beat + downbeat classes); the backbone itself ends at its last block
    pub output_channels: usize,

    /// Number of residual blocks
    pub block_count: usize,

    /// Convolution kernel width
    pub kernel_size: usize,

    /// Stride per block; each block divides the temporal resolution by this
    pub stride: usize,

    /// Dilation at block i is `dilation_growth ^ (i % stack_size)`
    pub dilation_growth: usize,

    /// Channel increment added at every block after the first
    pub channel_growth: usize,

    /// Output channels of the first block
    pub channel_width: usize,

    /// Number of blocks forming one dilation stack
    pub stack_size: usize,

    /// Optional normalization applied after each convolution
    pub norm: Option<NormKind>,

    /// Nonlinearity applied on the main path
    pub activation: ActivationKind,

    /// How many of the deepest blocks feed the feature pyramid
    pub pyramid_depth_count: usize,

    /// 1-based block index whose activation shape sizes the anchor grid
    pub base_level_index: usize,
}

impl Default for BackboneConfig {
    fn default() -> Self {
        BackboneConfig {
            input_channels: 1,
            output_channels: 2,
            block_count: 8,
            kernel_size: 15,
            stride: 2,
            dilation_growth: 8,
            channel_growth: 1,
            channel_width: 32,
            stack_size: 4,
            norm: Some(NormKind::Batch),
            activation: ActivationKind::PRelu,
            pyramid_depth_count: 3,
            base_level_index: 5,
        }
    }
}

/// One residual block: strided dilated conv -> optional norm -> activation,
/// summed with a strided 1x1 projection of the input (optionally normed).
#[derive(Debug, Clone)]
struct Block {
    conv: Conv1d,
    norm: Option<Norm>,
    act: Activation,
    res_conv: Conv1d,
    res_norm: Option<Norm>,
}

impl Block {
    fn forward(&self, x: &Array3<f32>) -> Array3<f32> {
        let mut main = self.conv.forward(x);
        if let Some(norm) = &self.norm {
            norm.forward(&mut main);
        }
        self.act.forward(&mut main);

        let mut shortcut = self.res_conv.forward(x);
        if let Some(norm) = &self.res_norm {
            norm.forward(&mut shortcut);
        }

        main + shortcut
    }
}

/// The downsampling backbone.
///
/// `forward` returns the activations of the last `pyramid_depth_count`
/// blocks (shallowest first) together with the activation shape captured
/// after block `base_level_index`, which the detection head uses to size its
/// anchor grid.
#[derive(Debug, Clone)]
pub struct Backbone {
    blocks: Vec<Block>,
    config: BackboneConfig,
}

impl Backbone {
    pub fn new(config: BackboneConfig, seed: u64) -> Result<Backbone, ModelError> {
        validate(&config)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut blocks = Vec::with_capacity(config.block_count);

        // Explicit channel fold: the first block maps the input width to
        // channel_width, every later block adds channel_growth
        let mut in_channels = config.input_channels;
        for index in 0..config.block_count {
            let out_channels = if index == 0 {
                config.channel_width
            } else {
                in_channels + config.channel_growth
            };
            let dilation = config.dilation_growth.pow((index % config.stack_size) as u32);
            let padding = (config.kernel_size - 1) * dilation / 2;

            let norm = make_norm(config.norm, out_channels);
            let res_norm = make_norm(config.norm, out_channels);

            blocks.push(Block {
                conv: Conv1d::new(
                    &mut rng,
                    in_channels,
                    out_channels,
                    config.kernel_size,
                    config.stride,
                    dilation,
                    padding,
                ),
                norm,
                act: Activation::new(config.activation, out_channels),
                res_conv: Conv1d::new(&mut rng, in_channels, out_channels, 1, config.stride, 1, 0),
                res_norm,
            });

            in_channels = out_channels;
        }

        Ok(Backbone { blocks, config })
    }

    /// Run all blocks, collecting the feature pyramid and the base-level
    /// activation shape.
    pub fn forward(&self, x: &Array3<f32>) -> (Vec<Array3<f32>>, [usize; 3]) {
        let pyramid_start = self.blocks.len() - self.config.pyramid_depth_count;
        let mut pyramid = Vec::with_capacity(self.config.pyramid_depth_count);
        let mut base_shape = [0usize; 3];

        let mut activation = x.clone();
        for (index, block) in self.blocks.iter().enumerate() {
            activation = block.forward(&activation);

            if index >= pyramid_start {
                pyramid.push(activation.clone());
            }
            if index == self.config.base_level_index - 1 {
                let (b, c, t) = activation.dim();
                base_shape = [b, c, t];
            }
        }

        (pyramid, base_shape)
    }

    /// Coarse analytic receptive-field bound in input samples.
    pub fn receptive_field(&self) -> usize {
        let cfg = &self.config;
        (0..cfg.block_count)
            .map(|_| (cfg.kernel_size - 1) * (cfg.block_count * cfg.stride))
            .sum()
    }

    /// Output channel width of every block, in order
    pub fn channel_widths(&self) -> Vec<usize> {
        self.blocks
            .iter()
            .map(|b| b.conv.weight.dim().0)
            .collect()
    }

    pub fn config(&self) -> &BackboneConfig {
        &self.config
    }
}

fn make_norm(kind: Option<NormKind>, channels: usize) -> Option<Norm> {
    match kind {
        None => None,
        Some(NormKind::Batch) => Some(Norm::Batch(BatchNorm1d::new(channels))),
        Some(NormKind::Group) => Some(Norm::Group(GroupNorm::new(GROUP_NORM_GROUPS, channels))),
    }
}

fn validate(config: &BackboneConfig) -> Result<(), ModelError> {
    if config.block_count == 0 {
        return Err(ModelError::Config("block_count must be positive".into()));
    }
    if config.kernel_size == 0 || config.stride == 0 || config.stack_size == 0 {
        return Err(ModelError::Config(
            "kernel_size, stride, and stack_size must be positive".into(),
        ));
    }
    if config.channel_width == 0 || config.input_channels == 0 {
        return Err(ModelError::Config(
            "input_channels and channel_width must be positive".into(),
        ));
    }
    if config.pyramid_depth_count == 0 || config.pyramid_depth_count > config.block_count {
        return Err(ModelError::Config(format!(
            "pyramid_depth_count must be in 1..={}",
            config.block_count
        )));
    }
    if config.base_level_index == 0 || config.base_level_index > config.block_count {
        return Err(ModelError::Config(format!(
            "base_level_index must be in 1..={}",
            config.block_count
        )));
    }

    let mut in_channels = config.input_channels;
    for index in 0..config.block_count {
        let out_channels = if index == 0 {
            config.channel_width
        } else {
            in_channels + config.channel_growth
        };
        let dilation = config.dilation_growth.pow((index % config.stack_size) as u32);

        // The main and shortcut paths must emit the same length for the sum
        if (config.kernel_size - 1) * dilation % 2 != 0 {
            return Err(ModelError::Config(format!(
                "block {}: (kernel_size - 1) * dilation must be even",
                index
            )));
        }
        if config.norm == Some(NormKind::Group) && out_channels % GROUP_NORM_GROUPS != 0 {
            return Err(ModelError::Config(format!(
                "block {}: group norm needs channels divisible by {}, got {}",
                index, GROUP_NORM_GROUPS, out_channels
            )));
        }

        in_channels = out_channels;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> BackboneConfig {
        BackboneConfig {
            input_channels: 1,
            output_channels: 2,
            block_count: 4,
            kernel_size: 3,
            stride: 2,
            dilation_growth: 2,
            channel_growth: 4,
            channel_width: 4,
            stack_size: 2,
            norm: None,
            activation: ActivationKind::Relu,
            pyramid_depth_count: 2,
            base_level_index: 3,
        }
    }

    #[test]
    fn test_channel_fold() {
        let backbone = Backbone::new(small_config(), 0).unwrap();
        assert_eq!(backbone.channel_widths(), vec![4, 8, 12, 16]);
    }

    #[test]
    fn test_forward_shapes() {
        let backbone = Backbone::new(small_config(), 0).unwrap();
        let x = Array3::zeros((1, 1, 64));

        let (pyramid, base_shape) = backbone.forward(&x);

        // Last two blocks feed the pyramid; lengths halve per block
        assert_eq!(pyramid.len(), 2);
        assert_eq!(pyramid[0].dim(), (1, 12, 16));
        assert_eq!(pyramid[1].dim(), (1, 16, 8));

        // Base level captured after the third block
        assert_eq!(base_shape, [1, 12, 16]);
    }

    #[test]
    fn test_forward_with_batch_norm() {
        let mut config = small_config();
        config.norm = Some(NormKind::Batch);
        config.activation = ActivationKind::PRelu;
        let backbone = Backbone::new(config, 7).unwrap();

        let x = Array3::from_shape_fn((2, 1, 64), |(_, _, t)| ((t as f32) * 0.1).sin());
        let (pyramid, base_shape) = backbone.forward(&x);

        assert_eq!(pyramid[1].dim(), (2, 16, 8));
        assert_eq!(base_shape[0], 2);
        assert!(pyramid.iter().all(|level| level.iter().all(|v| v.is_finite())));
    }

    #[test]
    fn test_receptive_field_formula() {
        let backbone = Backbone::new(small_config(), 0).unwrap();
        // 4 blocks * (3 - 1) * (4 * 2)
        assert_eq!(backbone.receptive_field(), 64);
    }

    #[test]
    fn test_group_norm_divisibility_validated() {
        let mut config = small_config();
        config.norm = Some(NormKind::Group);
        // channel widths 4, 8, 12, 16 are not divisible by 32
        assert!(Backbone::new(config, 0).is_err());

        let mut config = small_config();
        config.norm = Some(NormKind::Group);
        config.channel_width = 32;
        config.channel_growth = 32;
        assert!(Backbone::new(config, 0).is_ok());
    }

    #[test]
    fn test_even_padding_validated() {
        let mut config = small_config();
        config.kernel_size = 4; // (k - 1) * dilation odd at dilation 1
        assert!(Backbone::new(config, 0).is_err());
    }

    #[test]
    fn test_level_indices_validated() {
        let mut config = small_config();
        config.pyramid_depth_count = 5;
        assert!(Backbone::new(config, 0).is_err());

        let mut config = small_config();
        config.base_level_index = 0;
        assert!(Backbone::new(config, 0).is_err());
    }
}
