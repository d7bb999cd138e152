//! Higher-rank tensors for the convolutional path.
//!
//! [`Tensor<N>`] is a flat row-major array with a const-generic rank. The
//! aliases [`Tensor3D`] `(channel, height, width)` and [`Tensor4D`]
//! `(batch, channel, height, width)` carry the feature maps; [`Tensor5D`] and
//! [`Tensor6D`] are scratch shapes used while rearranging receptive fields
//! in [`im2col`] / [`col2im`].

mod im2col;
mod ranked;
mod shape;
mod tensor;

pub use im2col::{col2im, im2col, Window};
pub use ranked::{Tensor3D, Tensor4D, Tensor5D, Tensor6D};
pub use shape::conv_output_size;
pub use tensor::Tensor;

pub use sumi_la::{Error, Matrix, Result};
