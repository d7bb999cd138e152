//! The boundary to whatever supplies training data: a batch type that can be
//! subset by sample index, and a dataset of aligned inputs and targets.

use crate::{Error, InputDim, Result, Rng};
use sumi_la::Matrix;
use sumi_tensor::Tensor4D;

/// A batch whose first axis indexes samples.
pub trait Batch: Clone {
    fn batch_len(&self) -> usize;

    /// The samples at `indices`, in that order.
    fn select(&self, indices: &[usize]) -> Result<Self>;

    /// One row per sample, for argmax-based scoring.
    fn to_rows(&self) -> Result<Matrix>;
}

impl Batch for Matrix {
    fn batch_len(&self) -> usize {
        self.rows()
    }

    fn select(&self, indices: &[usize]) -> Result<Self> {
        let mut data = Vec::with_capacity(indices.len() * self.cols());
        for &i in indices {
            data.extend_from_slice(self.row(i));
        }
        Ok(Matrix::new(indices.len(), self.cols(), data)?)
    }

    fn to_rows(&self) -> Result<Matrix> {
        Ok(self.clone())
    }
}

impl Batch for Tensor4D {
    fn batch_len(&self) -> usize {
        self.dims()[0]
    }

    fn select(&self, indices: &[usize]) -> Result<Self> {
        let [_, c, h, w] = self.dims();
        let stride = c * h * w;
        let mut data = Vec::with_capacity(indices.len() * stride);
        for &i in indices {
            data.extend_from_slice(&self.data()[i * stride..(i + 1) * stride]);
        }
        Ok(Tensor4D::new([indices.len(), c, h, w], data)?)
    }

    fn to_rows(&self) -> Result<Matrix> {
        Ok(self.flatten()?)
    }
}

/// Aligned inputs and one-hot targets.
#[derive(Debug, Clone)]
pub struct Dataset<X> {
    inputs: X,
    targets: X,
}

impl<X: Batch> Dataset<X> {
    pub fn new(inputs: X, targets: X) -> Result<Self> {
        let (n, m) = (inputs.batch_len(), targets.batch_len());
        if n == 0 {
            return Err(Error::EmptyDataset);
        }
        if n != m {
            return Err(sumi_la::Error::shape_mismatch("dataset", &[n], &[m]).into());
        }
        Ok(Self { inputs, targets })
    }

    pub fn len(&self) -> usize {
        self.inputs.batch_len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn inputs(&self) -> &X {
        &self.inputs
    }

    pub fn targets(&self) -> &X {
        &self.targets
    }

    /// `size` samples drawn without replacement (the whole set if smaller).
    pub fn sample_batch(&self, size: usize, rng: &mut Rng) -> Result<(X, X)> {
        let mut idx = rng.permutation(self.len());
        idx.truncate(size.min(self.len()));
        Ok((self.inputs.select(&idx)?, self.targets.select(&idx)?))
    }

    /// Consecutive batches in sample order; the last one may be short.
    pub fn batches(&self, size: usize) -> impl Iterator<Item = Result<(X, X)>> + '_ {
        let size = size.max(1);
        (0..self.len()).step_by(size).map(move |start| {
            let idx: Vec<usize> = (start..(start + size).min(self.len())).collect();
            Ok((self.inputs.select(&idx)?, self.targets.select(&idx)?))
        })
    }
}

impl Dataset<Matrix> {
    /// Reinterpret flattened pixel rows as `(N, C, H, W)` images, with targets
    /// laid out `(N, 1, 1, classes)`.
    pub fn into_images(self, dim: InputDim) -> Result<Dataset<Tensor4D>> {
        let n = self.len();
        let inputs = Tensor4D::unflatten(&self.inputs, [n, dim.channels, dim.height, dim.width])?;
        let targets = Tensor4D::unflatten(&self.targets, [n, 1, 1, self.targets.cols()])?;
        Dataset::new(inputs, targets)
    }
}

/// One row per label with a single 1 at the label's column.
pub fn one_hot(labels: &[usize], classes: usize) -> Result<Matrix> {
    let mut out = Matrix::zeros(labels.len(), classes)?;
    for (r, &label) in labels.iter().enumerate() {
        if label >= classes {
            return Err(sumi_la::Error::Configuration(format!(
                "label {label} out of range for {classes} classes"
            ))
            .into());
        }
        out.set(r, label, 1.0);
    }
    Ok(out)
}

/// Gaussian clusters, one per class, centred `4.0` along distinct axes.
///
/// Samples are interleaved by class so any prefix is roughly balanced.
/// Requires `classes <= features`.
pub fn blobs(
    samples_per_class: usize,
    classes: usize,
    features: usize,
    spread: f64,
    rng: &mut Rng,
) -> Result<Dataset<Matrix>> {
    if classes > features {
        return Err(sumi_la::Error::Configuration(format!(
            "{classes} classes need at least as many features, got {features}"
        ))
        .into());
    }
    let n = samples_per_class * classes;
    let labels: Vec<usize> = (0..n).map(|i| i % classes).collect();
    let inputs = Matrix::from_fn(n, features, |r, c| {
        let centre = if c == labels[r] { 4.0 } else { 0.0 };
        centre + spread * rng.normal()
    })?;
    Dataset::new(inputs, one_hot(&labels, classes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hot_rows() {
        let t = one_hot(&[2, 0], 3).unwrap();
        assert_eq!(t.as_slice(), &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert!(one_hot(&[3], 3).is_err());
    }

    #[test]
    fn select_keeps_order() {
        let m = Matrix::from_fn(4, 2, |r, c| (r * 10 + c) as f64).unwrap();
        let s = m.select(&[3, 1]).unwrap();
        assert_eq!(s.as_slice(), &[30.0, 31.0, 10.0, 11.0]);

        let t = Tensor4D::from_fn([3, 1, 1, 2], |[n, _, _, x]| (n * 10 + x) as f64).unwrap();
        assert_eq!(t.select(&[2]).unwrap().data(), &[20.0, 21.0]);
    }

    #[test]
    fn dataset_rejects_misaligned() {
        let x = Matrix::zeros(3, 2).unwrap();
        let t = Matrix::zeros(2, 2).unwrap();
        assert!(Dataset::new(x, t).is_err());
    }

    #[test]
    fn sample_batch_without_replacement() {
        let mut rng = Rng::new(9);
        let data = blobs(5, 2, 3, 0.1, &mut rng).unwrap();
        let (x, t) = data.sample_batch(4, &mut rng).unwrap();
        assert_eq!(x.rows(), 4);
        assert_eq!(t.shape(), (4, 2));
        let (all, _) = data.sample_batch(100, &mut rng).unwrap();
        assert_eq!(all.rows(), 10);
    }

    #[test]
    fn batches_cover_everything_once() {
        let mut rng = Rng::new(2);
        let data = blobs(5, 2, 2, 0.1, &mut rng).unwrap();
        let sizes: Vec<usize> = data.batches(4).map(|b| b.unwrap().0.rows()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn blobs_are_separable_by_argmax() {
        let mut rng = Rng::new(5);
        let data = blobs(20, 3, 3, 0.3, &mut rng).unwrap();
        assert_eq!(data.inputs().argmax_rows(), data.targets().argmax_rows());
    }

    #[test]
    fn images_layout() {
        let mut rng = Rng::new(1);
        let data = blobs(2, 2, 4, 0.1, &mut rng).unwrap();
        let images = data
            .into_images(InputDim {
                channels: 1,
                height: 2,
                width: 2,
            })
            .unwrap();
        assert_eq!(images.inputs().dims(), [4, 1, 2, 2]);
        assert_eq!(images.targets().dims(), [4, 1, 1, 2]);
    }
}
