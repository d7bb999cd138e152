//! Convolution and max-pooling over `(batch, channel, height, width)`
//! batches, both expressed through [`im2col`] / [`col2im`].

use crate::param::randn_filters;
use crate::{Error, Layer, Param, ParamMut, Result, Rng, WeightInit};
use sumi_la::Matrix;
use sumi_tensor::{col2im, im2col, Tensor, Tensor4D, Window};

struct ConvCache {
    input_dims: [usize; 4],
    out_hw: (usize, usize),
    col: Matrix,
    col_w: Matrix,
}

/// 2-D convolution. Filters are `(filters, channels, h, w)`, bias is `[1, filters]`.
pub struct Convolution {
    pub weight: Tensor4D,
    pub bias: Matrix,
    stride: usize,
    pad: usize,
    cache: Option<ConvCache>,
    dw: Option<Tensor4D>,
    db: Option<Matrix>,
}

impl Convolution {
    pub fn new(weight: Tensor4D, bias: Matrix, stride: usize, pad: usize) -> Result<Self> {
        let fnum = weight.dims()[0];
        if bias.shape() != (1, fnum) {
            return Err(
                sumi_la::Error::shape_mismatch("conv bias", &[1, fnum], &[bias.rows(), bias.cols()]).into(),
            );
        }
        Ok(Self {
            weight,
            bias,
            stride,
            pad,
            cache: None,
            dw: None,
            db: None,
        })
    }

    pub fn init(
        filters: usize,
        channels: usize,
        size: usize,
        stride: usize,
        pad: usize,
        init: WeightInit,
        rng: &mut Rng,
    ) -> Result<Self> {
        let weight = randn_filters([filters, channels, size, size], init, rng)?;
        Self::new(weight, Matrix::zeros(1, filters)?, stride, pad)
    }

    pub fn window(&self) -> Window {
        let [_, _, fh, fw] = self.weight.dims();
        Window::new(fh, fw, self.stride, self.pad)
    }

    pub fn dw(&self) -> Option<&Tensor4D> {
        self.dw.as_ref()
    }

    pub fn db(&self) -> Option<&Matrix> {
        self.db.as_ref()
    }
}

impl Layer<Tensor4D> for Convolution {
    fn forward(&mut self, input: &Tensor4D) -> Result<Tensor4D> {
        let [n, c, h, w] = input.dims();
        let [fnum, fc, fh, fw] = self.weight.dims();
        if c != fc {
            return Err(sumi_la::Error::shape_mismatch("conv channels", &[n, c, h, w], &[fnum, fc, fh, fw]).into());
        }
        let win = self.window();
        let (oh, ow) = win.output_hw(h, w)?;

        let col = im2col(input, &win)?;
        let col_w = self
            .weight
            .reshape([fnum, fc * fh * fw])?
            .into_matrix()?
            .transpose();
        let out = col.par_dot(&col_w)?.add_row(&self.bias)?;
        let out = Tensor::<2>::from_matrix(&out)
            .into_reshape([n, oh, ow, fnum])?
            .transpose([0, 3, 1, 2])?;

        self.cache = Some(ConvCache {
            input_dims: input.dims(),
            out_hw: (oh, ow),
            col,
            col_w,
        });
        Ok(out)
    }

    fn backward(&mut self, dout: &Tensor4D) -> Result<Tensor4D> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("Convolution"))?;
        let fnum = self.weight.dims()[0];
        let (oh, ow) = cache.out_hw;
        let expected = [cache.input_dims[0], fnum, oh, ow];
        if dout.dims() != expected {
            return Err(sumi_la::Error::shape_mismatch("conv backward", &expected, &dout.dims()).into());
        }

        let dout = dout
            .transpose([0, 2, 3, 1])?
            .into_reshape([expected[0] * oh * ow, fnum])?
            .into_matrix()?;

        self.db = Some(dout.sum_axis(0)?);
        let dw = cache.col.transpose().par_dot(&dout)?.transpose();
        self.dw = Some(Tensor::<2>::from_matrix(&dw).into_reshape(self.weight.dims())?);

        let dcol = dout.par_dot(&cache.col_w.transpose())?;
        Ok(col2im(&dcol, cache.input_dims, &self.window())?)
    }

    fn params_mut(&mut self) -> Vec<(&'static str, ParamMut<'_>)> {
        vec![("W", (&mut self.weight).into()), ("b", (&mut self.bias).into())]
    }

    fn grads(&self) -> Vec<(&'static str, Param)> {
        match (&self.dw, &self.db) {
            (Some(dw), Some(db)) => vec![("W", dw.clone().into()), ("b", db.clone().into())],
            _ => Vec::new(),
        }
    }
}

struct PoolCache {
    input_dims: [usize; 4],
    out_hw: (usize, usize),
    argmax: Vec<usize>,
}

/// Max pooling. Remembers the winning offset of every window.
pub struct Pooling {
    window: Window,
    cache: Option<PoolCache>,
}

impl Pooling {
    pub fn new(height: usize, width: usize, stride: usize) -> Self {
        Self {
            window: Window::new(height, width, stride, 0),
            cache: None,
        }
    }

    pub fn window(&self) -> Window {
        self.window
    }
}

impl Layer<Tensor4D> for Pooling {
    fn forward(&mut self, input: &Tensor4D) -> Result<Tensor4D> {
        let [n, c, h, w] = input.dims();
        let (oh, ow) = self.window.output_hw(h, w)?;
        let area = self.window.height * self.window.width;

        // one row per (sample, y, x, channel) window
        let col = im2col(input, &self.window)?.reshape(n * oh * ow * c, area)?;
        let mut argmax = Vec::with_capacity(col.rows());
        let mut maxima = Vec::with_capacity(col.rows());
        for r in 0..col.rows() {
            let row = col.row(r);
            let mut best = 0;
            for (i, &v) in row.iter().enumerate().skip(1) {
                if v > row[best] {
                    best = i;
                }
            }
            argmax.push(best);
            maxima.push(row[best]);
        }

        let out = Tensor::new([n, oh, ow, c], maxima)?.transpose([0, 3, 1, 2])?;
        self.cache = Some(PoolCache {
            input_dims: input.dims(),
            out_hw: (oh, ow),
            argmax,
        });
        Ok(out)
    }

    fn backward(&mut self, dout: &Tensor4D) -> Result<Tensor4D> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(Error::BackwardBeforeForward("Pooling"))?;
        let [n, c, _, _] = cache.input_dims;
        let (oh, ow) = cache.out_hw;
        if dout.dims() != [n, c, oh, ow] {
            return Err(sumi_la::Error::shape_mismatch("pool backward", &[n, c, oh, ow], &dout.dims()).into());
        }
        let area = self.window.height * self.window.width;

        let flat = dout.transpose([0, 2, 3, 1])?;
        let mut dmax = vec![0.0; flat.numel() * area];
        for (i, (&g, &arg)) in flat.data().iter().zip(&cache.argmax).enumerate() {
            dmax[i * area + arg] = g;
        }
        let dcol = Matrix::new(n * oh * ow, c * area, dmax)?;
        Ok(col2im(&dcol, cache.input_dims, &self.window)?)
    }
}
