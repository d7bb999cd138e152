//! Receptive-field rearrangement so that convolution and pooling reduce to
//! row-wise matrix work.
//!
//! `im2col` gathers one strided `(batch, channel, out_h, out_w)` slice per
//! filter offset into a [`Tensor5D`], views it as
//! `(filter_h, filter_w, batch, channel, out_h, out_w)`, and transposes to
//! `(batch, out_h, out_w, channel, filter_h, filter_w)` so that each row of
//! the resulting matrix is one receptive field laid out like a flattened
//! filter. `col2im` walks the same path backwards, accumulating where
//! windows overlap.

use crate::{conv_output_size, Tensor, Tensor4D, Tensor5D, Tensor6D};
use sumi_la::{Error, Matrix, Result};

/// Sliding-window geometry shared by convolution and pooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub height: usize,
    pub width: usize,
    pub stride: usize,
    pub pad: usize,
}

impl Window {
    pub fn new(height: usize, width: usize, stride: usize, pad: usize) -> Self {
        Self {
            height,
            width,
            stride,
            pad,
        }
    }

    /// Output `(out_h, out_w)` for an `h × w` input.
    pub fn output_hw(&self, h: usize, w: usize) -> Result<(usize, usize)> {
        Ok((
            conv_output_size(h, self.height, self.pad, self.stride)?,
            conv_output_size(w, self.width, self.pad, self.stride)?,
        ))
    }
}

/// `(batch, channel, h, w)` → `(batch·out_h·out_w, channel·win_h·win_w)`.
pub fn im2col(input: &Tensor4D, win: &Window) -> Result<Matrix> {
    let [n, c, h, w] = input.dims();
    let (oh, ow) = win.output_hw(h, w)?;
    let padded = input.pad(win.pad);
    let s = win.stride;

    let mut patches = Vec::with_capacity(win.height * win.width);
    for i in 0..win.height {
        for j in 0..win.width {
            patches.push(Tensor4D::from_fn([n, c, oh, ow], |[b, ch, y, x]| {
                padded.get([b, ch, i + s * y, j + s * x])
            })?);
        }
    }
    let windows: Tensor6D =
        Tensor5D::from_patches(&patches)?.into_reshape([win.height, win.width, n, c, oh, ow])?;
    windows
        .transpose([2, 4, 5, 3, 0, 1])?
        .into_reshape([n * oh * ow, c * win.height * win.width])?
        .into_matrix()
}

/// Scatter-add a column matrix back onto an input of `input_dims`.
pub fn col2im(col: &Matrix, input_dims: [usize; 4], win: &Window) -> Result<Tensor4D> {
    let [n, c, h, w] = input_dims;
    let (oh, ow) = win.output_hw(h, w)?;
    let expected = (n * oh * ow, c * win.height * win.width);
    if col.shape() != expected {
        return Err(Error::shape_mismatch(
            "col2im",
            &[col.rows(), col.cols()],
            &[expected.0, expected.1],
        ));
    }

    let windows: Tensor6D = Tensor::<2>::from_matrix(col)
        .into_reshape([n, oh, ow, c, win.height, win.width])?
        .transpose([4, 5, 0, 3, 1, 2])?;
    let patches: Tensor5D = windows.into_reshape([win.height * win.width, n, c, oh, ow])?;

    let s = win.stride;
    let mut padded = Tensor4D::zeros([n, c, h + 2 * win.pad, w + 2 * win.pad])?;
    for p in 0..win.height * win.width {
        let (i, j) = (p / win.width, p % win.width);
        let patch = patches.patch(p);
        for b in 0..n {
            for ch in 0..c {
                for y in 0..oh {
                    for x in 0..ow {
                        padded.add_at([b, ch, i + s * y, j + s * x], patch.get([b, ch, y, x]));
                    }
                }
            }
        }
    }
    padded.crop(win.pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(dims: [usize; 4]) -> Tensor4D {
        Tensor4D::from_fn(dims, |[b, c, y, x]| (b * 1000 + c * 100 + y * 10 + x) as f64).unwrap()
    }

    #[test]
    fn rows_are_receptive_fields() {
        let x = input([1, 2, 3, 3]);
        let win = Window::new(2, 2, 1, 0);
        let col = im2col(&x, &win).unwrap();
        assert_eq!(col.shape(), (4, 8));
        // output (0, 1): rows 0..2, cols 1..3 of each channel
        assert_eq!(
            col.row(1),
            &[1.0, 2.0, 11.0, 12.0, 101.0, 102.0, 111.0, 112.0]
        );
    }

    #[test]
    fn padding_inserts_zeros() {
        let x = input([1, 1, 2, 2]);
        let win = Window::new(3, 3, 1, 1);
        let col = im2col(&x, &win).unwrap();
        assert_eq!(col.shape(), (4, 9));
        assert_eq!(col.row(0), &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 10.0, 11.0]);
    }

    #[test]
    fn col2im_accumulates_overlaps() {
        let x = input([1, 1, 3, 3]);
        let win = Window::new(2, 2, 1, 0);
        let col = im2col(&x, &win).unwrap();
        let ones = col.map(|_| 1.0);
        let back = col2im(&ones, x.dims(), &win).unwrap();
        // how many 2x2 windows cover each cell of a 3x3 map
        let counts = [1.0, 2.0, 1.0, 2.0, 4.0, 2.0, 1.0, 2.0, 1.0];
        assert_eq!(back.data(), &counts);
    }

    #[test]
    fn col2im_is_adjoint_of_im2col() {
        // <im2col(x), y> == <x, col2im(y)> for any x, y
        let x = input([2, 2, 4, 4]).map(|v| (v * 0.01).sin());
        let win = Window::new(3, 3, 1, 1);
        let col = im2col(&x, &win).unwrap();
        let y = col.map(|v| (v * 7.0).cos());
        let lhs: f64 = col.as_slice().iter().zip(y.as_slice()).map(|(a, b)| a * b).sum();
        let back = col2im(&y, x.dims(), &win).unwrap();
        let rhs: f64 = x.data().iter().zip(back.data()).map(|(a, b)| a * b).sum();
        assert!((lhs - rhs).abs() < 1e-9, "{} vs {}", lhs, rhs);
    }

    #[test]
    fn geometry_errors_surface() {
        let x = input([1, 1, 5, 5]);
        assert!(matches!(
            im2col(&x, &Window::new(2, 2, 2, 0)),
            Err(Error::Configuration(_))
        ));
        let wrong = Matrix::zeros(3, 3).unwrap();
        assert!(matches!(
            col2im(&wrong, [1, 1, 3, 3], &Window::new(2, 2, 1, 0)),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
