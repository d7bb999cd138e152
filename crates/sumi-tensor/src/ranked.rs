use crate::Tensor;
use sumi_la::{Error, Matrix, Result};

/// `(channel, height, width)`.
pub type Tensor3D = Tensor<3>;
/// `(batch, channel, height, width)`.
pub type Tensor4D = Tensor<4>;
/// `(patch, batch, channel, out_h, out_w)`: one strided slice per filter offset.
pub type Tensor5D = Tensor<5>;
/// Six-axis scratch for receptive-field rearrangement.
pub type Tensor6D = Tensor<6>;

impl Tensor<2> {
    pub fn from_matrix(m: &Matrix) -> Self {
        let (rows, cols) = m.shape();
        Tensor::from_parts([rows, cols], m.as_slice().to_vec())
    }

    pub fn into_matrix(self) -> Result<Matrix> {
        let [rows, cols] = self.dims();
        Matrix::new(rows, cols, self.into_data())
    }
}

impl Tensor<3> {
    /// Stack equally-shaped channel matrices.
    pub fn from_channels(channels: &[Matrix]) -> Result<Self> {
        let first = channels.first().ok_or(Error::InvalidConstruction {
            what: "tensor3d",
            dims: vec![0],
        })?;
        let (h, w) = first.shape();
        let mut data = Vec::with_capacity(channels.len() * h * w);
        for m in channels {
            if m.shape() != (h, w) {
                return Err(Error::shape_mismatch("from_channels", &[h, w], &[m.rows(), m.cols()]));
            }
            data.extend_from_slice(m.as_slice());
        }
        Tensor::new([channels.len(), h, w], data)
    }

    pub fn channel(&self, c: usize) -> Result<Matrix> {
        let [_, h, w] = self.dims();
        let start = c * h * w;
        Matrix::new(h, w, self.data()[start..start + h * w].to_vec())
    }

    pub fn channels(&self) -> Result<Vec<Matrix>> {
        (0..self.dims()[0]).map(|c| self.channel(c)).collect()
    }
}

impl Tensor<4> {
    /// Stack equally-shaped samples along a new batch axis.
    pub fn from_samples(samples: &[Tensor3D]) -> Result<Self> {
        let first = samples.first().ok_or(Error::InvalidConstruction {
            what: "tensor4d",
            dims: vec![0],
        })?;
        let inner = first.dims();
        let mut data = Vec::with_capacity(samples.len() * first.numel());
        for s in samples {
            if s.dims() != inner {
                return Err(Error::shape_mismatch("from_samples", &inner, &s.dims()));
            }
            data.extend_from_slice(s.data());
        }
        Tensor::new([samples.len(), inner[0], inner[1], inner[2]], data)
    }

    pub fn sample(&self, n: usize) -> Tensor3D {
        let [_, c, h, w] = self.dims();
        let size = c * h * w;
        Tensor::from_parts([c, h, w], self.data()[n * size..(n + 1) * size].to_vec())
    }

    /// Feature map of sample `n`, channel `c`.
    pub fn matrix(&self, n: usize, c: usize) -> Result<Matrix> {
        self.sample(n).channel(c)
    }

    /// Zero border of `pad` cells around each spatial map.
    pub fn pad(&self, pad: usize) -> Self {
        if pad == 0 {
            return self.clone();
        }
        let [n, c, h, w] = self.dims();
        let (ph, pw) = (h + 2 * pad, w + 2 * pad);
        let mut out = Tensor::from_parts([n, c, ph, pw], vec![0.0; n * c * ph * pw]);
        for b in 0..n {
            for ch in 0..c {
                for y in 0..h {
                    for x in 0..w {
                        out.set([b, ch, y + pad, x + pad], self.get([b, ch, y, x]));
                    }
                }
            }
        }
        out
    }

    /// Inverse of [`Tensor::pad`]: drop `pad` cells from every spatial edge.
    pub fn crop(&self, pad: usize) -> Result<Self> {
        if pad == 0 {
            return Ok(self.clone());
        }
        let [n, c, h, w] = self.dims();
        if h <= 2 * pad || w <= 2 * pad {
            return Err(Error::Configuration(format!(
                "cannot crop {pad} from a {h}x{w} map"
            )));
        }
        Tensor::from_fn([n, c, h - 2 * pad, w - 2 * pad], |[b, ch, y, x]| {
            self.get([b, ch, y + pad, x + pad])
        })
    }

    /// One row per sample: `(batch, channel·height·width)`.
    pub fn flatten(&self) -> Result<Matrix> {
        let [n, c, h, w] = self.dims();
        Matrix::new(n, c * h * w, self.data().to_vec())
    }

    /// Inverse of [`Tensor::flatten`].
    pub fn unflatten(m: &Matrix, dims: [usize; 4]) -> Result<Self> {
        let [n, c, h, w] = dims;
        if m.shape() != (n, c * h * w) {
            return Err(Error::shape_mismatch("unflatten", &[m.rows(), m.cols()], &dims));
        }
        Tensor::new(dims, m.as_slice().to_vec())
    }
}

impl Tensor<5> {
    /// Stack equally-shaped 4-D slices along a leading patch axis.
    pub fn from_patches(patches: &[Tensor4D]) -> Result<Self> {
        let first = patches.first().ok_or(Error::InvalidConstruction {
            what: "tensor5d",
            dims: vec![0],
        })?;
        let [n, c, h, w] = first.dims();
        let mut data = Vec::with_capacity(patches.len() * first.numel());
        for p in patches {
            if p.dims() != first.dims() {
                return Err(Error::shape_mismatch("from_patches", &first.dims(), &p.dims()));
            }
            data.extend_from_slice(p.data());
        }
        Tensor::new([patches.len(), n, c, h, w], data)
    }

    pub fn patch(&self, p: usize) -> Tensor4D {
        let [_, n, c, h, w] = self.dims();
        let size = n * c * h * w;
        Tensor::from_parts([n, c, h, w], self.data()[p * size..(p + 1) * size].to_vec())
    }
}
