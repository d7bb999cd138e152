//! Layers, optimizers, networks, and the training loop.
//!
//! Every layer pairs a `forward` that caches what it needs with a `backward`
//! that consumes the cache (see [`Layer`]). Networks chain layers in a fixed
//! order, end in a [`LossLayer`], and hand named gradients to an
//! [`Optimizer`].

mod config;
mod conv;
mod data;
mod error;
pub mod gradcheck;
mod layer;
mod layers;
mod loss;
mod network;
mod optimizer;
mod param;
mod rng;
mod trainer;

pub use config::{
    Activation, ConvNetConfig, ConvParams, InputDim, MlpConfig, OptimizerConfig, PoolParams,
    TrainConfig, WeightInit,
};
pub use conv::{Convolution, Pooling};
pub use data::{blobs, one_hot, Batch, Dataset};
pub use error::{Error, Result};
pub use layer::{Layer, LossLayer};
pub use layers::{Affine, Relu, Sequential, Sigmoid};
pub use loss::SoftmaxWithLoss;
pub use network::Network;
pub use optimizer::{AdaGrad, Adam, Momentum, Optimizer, Sgd};
pub use param::{Grads, Param, ParamMut, ParamsMut};
pub use rng::Rng;
pub use trainer::{History, Trainer};

pub use sumi_la::{Matrix, Vector};
pub use sumi_tensor::{Tensor3D, Tensor4D};
