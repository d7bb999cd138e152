use crate::{Error, LossLayer, Result};
use sumi_la::Matrix;
use sumi_tensor::Tensor4D;

/// Row-wise softmax followed by cross-entropy against one-hot targets.
///
/// The image path takes `(N, 1, 1, classes)` logits and targets, the layout
/// produced by [`crate::Affine`] on 4-D input.
#[derive(Debug, Clone, Default)]
pub struct SoftmaxWithLoss {
    y: Option<Matrix>,
    t: Option<Matrix>,
    dims: Option<[usize; 4]>,
}

impl SoftmaxWithLoss {
    pub fn new() -> Self {
        Self::default()
    }

    /// Softmax output of the last forward.
    pub fn output(&self) -> Option<&Matrix> {
        self.y.as_ref()
    }

    fn forward_matrix(&mut self, x: &Matrix, t: &Matrix) -> Result<f64> {
        let y = x.softmax_rows();
        let loss = y.cross_entropy(t)?;
        self.y = Some(y);
        self.t = Some(t.clone());
        Ok(loss)
    }

    fn backward_matrix(&self) -> Result<Matrix> {
        let (Some(y), Some(t)) = (&self.y, &self.t) else {
            return Err(Error::BackwardBeforeForward("SoftmaxWithLoss"));
        };
        Ok(y.sub(t)?.scale(1.0 / y.rows() as f64))
    }
}

impl LossLayer<Matrix> for SoftmaxWithLoss {
    fn forward(&mut self, input: &Matrix, target: &Matrix) -> Result<f64> {
        self.dims = None;
        self.forward_matrix(input, target)
    }

    fn backward(&mut self) -> Result<Matrix> {
        self.backward_matrix()
    }
}

impl LossLayer<Tensor4D> for SoftmaxWithLoss {
    fn forward(&mut self, input: &Tensor4D, target: &Tensor4D) -> Result<f64> {
        self.dims = Some(input.dims());
        self.forward_matrix(&input.flatten()?, &target.flatten()?)
    }

    fn backward(&mut self) -> Result<Tensor4D> {
        let dims = self
            .dims
            .ok_or(Error::BackwardBeforeForward("SoftmaxWithLoss"))?;
        Ok(Tensor4D::unflatten(&self.backward_matrix()?, dims)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_logits_stay_finite() {
        let mut l = SoftmaxWithLoss::new();
        let x = Matrix::new(1, 3, vec![1000.0, 1.0, 1.0]).unwrap();
        let t = Matrix::new(1, 3, vec![1.0, 0.0, 0.0]).unwrap();
        let loss = LossLayer::<Matrix>::forward(&mut l, &x, &t).unwrap();
        assert!(loss.is_finite() && loss.abs() < 1e-6, "loss = {}", loss);
        let dx: Matrix = l.backward().unwrap();
        assert!(dx.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn gradient_divides_by_batch() {
        let mut l = SoftmaxWithLoss::new();
        let x = Matrix::zeros(2, 2).unwrap();
        let t = Matrix::new(2, 2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        let loss = LossLayer::<Matrix>::forward(&mut l, &x, &t).unwrap();
        assert!((loss - 2f64.ln()).abs() < 1e-6, "loss = {}", loss);
        let dx: Matrix = l.backward().unwrap();
        assert_eq!(dx.as_slice(), &[-0.25, 0.25, 0.25, -0.25]);
    }

    #[test]
    fn image_layout_round_trips() {
        let mut l = SoftmaxWithLoss::new();
        let x = Tensor4D::new([2, 1, 1, 2], vec![0.0, 0.0, 0.0, 0.0]).unwrap();
        let t = Tensor4D::new([2, 1, 1, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        LossLayer::<Tensor4D>::forward(&mut l, &x, &t).unwrap();
        let dx: Tensor4D = l.backward().unwrap();
        assert_eq!(dx.dims(), [2, 1, 1, 2]);
    }

    #[test]
    fn backward_requires_forward() {
        let mut l = SoftmaxWithLoss::new();
        let r: Result<Matrix> = l.backward();
        assert!(matches!(r, Err(Error::BackwardBeforeForward(_))));
    }
}
