//! Hyperparameters. Every struct is serde-(de)serialisable so a driver can
//! load them from whatever format it prefers.

use crate::{AdaGrad, Adam, Momentum, Optimizer, Sgd};
use serde::{Deserialize, Serialize};

/// Optimizer choice and its constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OptimizerConfig {
    Sgd { lr: f64 },
    Momentum { lr: f64, momentum: f64 },
    AdaGrad { lr: f64 },
    Adam { lr: f64, beta1: f64, beta2: f64 },
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig::Sgd { lr: 0.1 }
    }
}

impl OptimizerConfig {
    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerConfig::Sgd { lr } => Box::new(Sgd::new(lr)),
            OptimizerConfig::Momentum { lr, momentum } => Box::new(Momentum::with_momentum(lr, momentum)),
            OptimizerConfig::AdaGrad { lr } => Box::new(AdaGrad::new(lr)),
            OptimizerConfig::Adam { lr, beta1, beta2 } => Box::new(Adam::with_betas(lr, beta1, beta2)),
        }
    }
}

/// Initial weight scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightInit {
    /// Fixed standard deviation.
    Std(f64),
    /// `sqrt(1 / fan_in)`, suited to sigmoid.
    Xavier,
    /// `sqrt(2 / fan_in)`, suited to ReLU.
    He,
}

impl Default for WeightInit {
    fn default() -> Self {
        WeightInit::Std(0.01)
    }
}

impl WeightInit {
    pub fn scale(&self, fan_in: usize) -> f64 {
        match *self {
            WeightInit::Std(s) => s,
            WeightInit::Xavier => (1.0 / fan_in as f64).sqrt(),
            WeightInit::He => (2.0 / fan_in as f64).sqrt(),
        }
    }
}

/// Nonlinearity placed between affine layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Relu,
    Sigmoid,
}

/// Fully-connected network shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlpConfig {
    pub input_size: usize,
    pub hidden_sizes: Vec<usize>,
    pub output_size: usize,
    pub activation: Activation,
    pub init: WeightInit,
    /// L2 penalty on weight matrices; 0 disables it.
    pub weight_decay: f64,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            input_size: 784,
            hidden_sizes: vec![50],
            output_size: 10,
            activation: Activation::Relu,
            init: WeightInit::default(),
            weight_decay: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDim {
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Default for InputDim {
    fn default() -> Self {
        Self {
            channels: 1,
            height: 28,
            width: 28,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvParams {
    pub filter_num: usize,
    pub filter_size: usize,
    pub pad: usize,
    pub stride: usize,
}

impl Default for ConvParams {
    fn default() -> Self {
        Self {
            filter_num: 30,
            filter_size: 5,
            pad: 0,
            stride: 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub size: usize,
    pub stride: usize,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self { size: 2, stride: 2 }
    }
}

/// Conv → ReLU → Pool → Affine → ReLU → Affine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvNetConfig {
    pub input: InputDim,
    pub conv: ConvParams,
    pub pool: PoolParams,
    pub hidden_size: usize,
    pub output_size: usize,
    pub init: WeightInit,
    pub weight_decay: f64,
}

impl Default for ConvNetConfig {
    fn default() -> Self {
        Self {
            input: InputDim::default(),
            conv: ConvParams::default(),
            pool: PoolParams::default(),
            hidden_size: 100,
            output_size: 10,
            init: WeightInit::default(),
            weight_decay: 0.0,
        }
    }
}

impl ConvNetConfig {
    /// 1×28×28 input, 30 filters of 5×5, 100 hidden units, 10 classes.
    pub fn mnist() -> Self {
        Self::default()
    }
}

/// Training-loop schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub iterations: usize,
    pub batch_size: usize,
    /// Evaluate accuracy every this many iterations; 0 disables evaluation.
    pub eval_interval: usize,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            iterations: 10_000,
            batch_size: 100,
            eval_interval: 600,
            seed: 0,
        }
    }
}
