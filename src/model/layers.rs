// Network building blocks
// Forward-only 1-D layers over ndarray tensors shaped (batch, channels, time)

use ndarray::{Array1, Array3};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

const NORM_EPS: f32 = 1e-5;

/// Strided, dilated 1-D convolution with zero padding.
#[derive(Debug, Clone)]
pub struct Conv1d {
    /// (out_channels, in_channels, kernel)
    pub(crate) weight: Array3<f32>,
    pub(crate) bias: Array1<f32>,
    stride: usize,
    dilation: usize,
    padding: usize,
}

impl Conv1d {
    pub fn new<R: Rng>(
        rng: &mut R,
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        dilation: usize,
        padding: usize,
    ) -> Conv1d {
        // Kaiming-normal initialization over the fan-in
        let std = (2.0 / (in_channels * kernel_size) as f64).sqrt();
        let normal = Normal::new(0.0, std).unwrap();

        let weight = Array3::from_shape_fn((out_channels, in_channels, kernel_size), |_| {
            normal.sample(rng) as f32
        });
        let bias = Array1::zeros(out_channels);

        Conv1d {
            weight,
            bias,
            stride,
            dilation,
            padding,
        }
    }

    /// Output length for an input of `len` samples
    pub fn output_len(&self, len: usize) -> usize {
        let kernel = self.weight.dim().2;
        let span = self.dilation * (kernel - 1);
        let padded = len + 2 * self.padding;
        if padded > span {
            (padded - span - 1) / self.stride + 1
        } else {
            0
        }
    }

    pub fn forward(&self, x: &Array3<f32>) -> Array3<f32> {
        let (batch, in_channels, len) = x.dim();
        let (out_channels, weight_in, kernel) = self.weight.dim();
        assert_eq!(in_channels, weight_in, "input channel count mismatch");

        let out_len = self.output_len(len);
        let mut y = Array3::zeros((batch, out_channels, out_len));

        for b in 0..batch {
            for oc in 0..out_channels {
                for ot in 0..out_len {
                    let base = ot * self.stride;
                    let mut acc = self.bias[oc];
                    for ic in 0..in_channels {
                        for ki in 0..kernel {
                            let pos = base + ki * self.dilation;
                            if pos < self.padding {
                                continue; // left zero padding
                            }
                            let ip = pos - self.padding;
                            if ip < len {
                                acc += self.weight[[oc, ic, ki]] * x[[b, ic, ip]];
                            }
                        }
                    }
                    y[[b, oc, ot]] = acc;
                }
            }
        }

        y
    }
}

/// Normalization flavor selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    Batch,
    Group,
}

/// Per-channel batch normalization over (batch, time)
#[derive(Debug, Clone)]
pub struct BatchNorm1d {
    gamma: Array1<f32>,
    beta: Array1<f32>,
}

impl BatchNorm1d {
    pub fn new(channels: usize) -> BatchNorm1d {
        BatchNorm1d {
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
        }
    }

    pub fn forward(&self, x: &mut Array3<f32>) {
        let (batch, channels, len) = x.dim();
        let count = (batch * len) as f32;
        if count == 0.0 {
            return;
        }

        for c in 0..channels {
            let mut mean = 0.0f32;
            for b in 0..batch {
                for t in 0..len {
                    mean += x[[b, c, t]];
                }
            }
            mean /= count;

            let mut var = 0.0f32;
            for b in 0..batch {
                for t in 0..len {
                    let d = x[[b, c, t]] - mean;
                    var += d * d;
                }
            }
            var /= count;

            let scale = self.gamma[c] / (var + NORM_EPS).sqrt();
            for b in 0..batch {
                for t in 0..len {
                    x[[b, c, t]] = (x[[b, c, t]] - mean) * scale + self.beta[c];
                }
            }
        }
    }
}

/// Group normalization over (channels-in-group, time), per sample
#[derive(Debug, Clone)]
pub struct GroupNorm {
    groups: usize,
    gamma: Array1<f32>,
    beta: Array1<f32>,
}

impl GroupNorm {
    pub fn new(groups: usize, channels: usize) -> GroupNorm {
        assert!(groups > 0 && channels % groups == 0);
        GroupNorm {
            groups,
            gamma: Array1::ones(channels),
            beta: Array1::zeros(channels),
        }
    }

    pub fn forward(&self, x: &mut Array3<f32>) {
        let (batch, channels, len) = x.dim();
        let group_size = channels / self.groups;
        let count = (group_size * len) as f32;
        if count == 0.0 {
            return;
        }

        for b in 0..batch {
            for g in 0..self.groups {
                let c0 = g * group_size;
                let c1 = c0 + group_size;

                let mut mean = 0.0f32;
                for c in c0..c1 {
                    for t in 0..len {
                        mean += x[[b, c, t]];
                    }
                }
                mean /= count;

                let mut var = 0.0f32;
                for c in c0..c1 {
                    for t in 0..len {
                        let d = x[[b, c, t]] - mean;
                        var += d * d;
                    }
                }
                var /= count;

                let inv = 1.0 / (var + NORM_EPS).sqrt();
                for c in c0..c1 {
                    for t in 0..len {
                        x[[b, c, t]] =
                            (x[[b, c, t]] - mean) * inv * self.gamma[c] + self.beta[c];
                    }
                }
            }
        }
    }
}

/// Normalization layer as configured for one block
#[derive(Debug, Clone)]
pub enum Norm {
    Batch(BatchNorm1d),
    Group(GroupNorm),
}

impl Norm {
    pub fn forward(&self, x: &mut Array3<f32>) {
        match self {
            Norm::Batch(norm) => norm.forward(x),
            Norm::Group(norm) => norm.forward(x),
        }
    }
}

/// Activation flavor selected by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationKind {
    Relu,
    PRelu,
    Selu,
    Elu,
}

/// Activation layer; PReLU carries one learnable slope per channel
#[derive(Debug, Clone)]
pub enum Activation {
    Relu,
    PRelu { alpha: Array1<f32> },
    Selu,
    Elu,
}

const SELU_SCALE: f32 = 1.050_701;
const SELU_ALPHA: f32 = 1.673_263_2;

impl Activation {
    pub fn new(kind: ActivationKind, channels: usize) -> Activation {
        match kind {
            ActivationKind::Relu => Activation::Relu,
            ActivationKind::PRelu => Activation::PRelu {
                alpha: Array1::from_elem(channels, 0.25),
            },
            ActivationKind::Selu => Activation::Selu,
            ActivationKind::Elu => Activation::Elu,
        }
    }

    pub fn forward(&self, x: &mut Array3<f32>) {
        match self {
            Activation::Relu => x.mapv_inplace(|v| v.max(0.0)),
            Activation::PRelu { alpha } => {
                let (batch, channels, len) = x.dim();
                for b in 0..batch {
                    for c in 0..channels {
                        let slope = alpha[c];
                        for t in 0..len {
                            let v = x[[b, c, t]];
                            if v < 0.0 {
                                x[[b, c, t]] = slope * v;
                            }
                        }
                    }
                }
            }
            Activation::Selu => x.mapv_inplace(|v| {
                if v > 0.0 {
                    SELU_SCALE * v
                } else {
                    SELU_SCALE * SELU_ALPHA * (v.exp() - 1.0)
                }
            }),
            Activation::Elu => x.mapv_inplace(|v| if v > 0.0 { v } else { v.exp() - 1.0 }),
        }
    }
}
