use crate::{Rng, WeightInit};
use std::collections::BTreeMap;
use sumi_la::Matrix;
use sumi_tensor::Tensor4D;

/// A parameter or gradient value, tagged with its rank.
#[derive(Clone, Debug, PartialEq)]
pub enum Param {
    Matrix(Matrix),
    Tensor4(Tensor4D),
}

/// Live, mutable view of a weight owned by a layer.
#[derive(Debug)]
pub enum ParamMut<'a> {
    Matrix(&'a mut Matrix),
    Tensor4(&'a mut Tensor4D),
}

/// Named gradients, keyed like the network's parameters (`W1`, `b1`, ...).
pub type Grads = BTreeMap<String, Param>;

/// Named views of the weights a network's layers own. Writing through a view
/// changes what the owning layer reads on its next forward pass.
pub type ParamsMut<'a> = BTreeMap<String, ParamMut<'a>>;

impl Param {
    pub fn rank(&self) -> usize {
        match self {
            Param::Matrix(_) => 2,
            Param::Tensor4(_) => 4,
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match self {
            Param::Matrix(m) => vec![m.rows(), m.cols()],
            Param::Tensor4(t) => t.dims().to_vec(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            Param::Matrix(m) => m.as_slice(),
            Param::Tensor4(t) => t.data(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            Param::Matrix(m) => m.as_mut_slice(),
            Param::Tensor4(t) => t.data_mut(),
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Param::Matrix(m) => Some(m),
            Param::Tensor4(_) => None,
        }
    }

    pub fn as_tensor4(&self) -> Option<&Tensor4D> {
        match self {
            Param::Tensor4(t) => Some(t),
            Param::Matrix(_) => None,
        }
    }
}

impl From<Matrix> for Param {
    fn from(m: Matrix) -> Self {
        Param::Matrix(m)
    }
}

impl From<Tensor4D> for Param {
    fn from(t: Tensor4D) -> Self {
        Param::Tensor4(t)
    }
}

impl ParamMut<'_> {
    pub fn rank(&self) -> usize {
        match self {
            ParamMut::Matrix(_) => 2,
            ParamMut::Tensor4(_) => 4,
        }
    }

    pub fn dims(&self) -> Vec<usize> {
        match self {
            ParamMut::Matrix(m) => vec![m.rows(), m.cols()],
            ParamMut::Tensor4(t) => t.dims().to_vec(),
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        match self {
            ParamMut::Matrix(m) => m.as_slice(),
            ParamMut::Tensor4(t) => t.data(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            ParamMut::Matrix(m) => m.as_mut_slice(),
            ParamMut::Tensor4(t) => t.data_mut(),
        }
    }

    /// Snapshot of the current value.
    pub fn to_param(&self) -> Param {
        match self {
            ParamMut::Matrix(m) => Param::Matrix((**m).clone()),
            ParamMut::Tensor4(t) => Param::Tensor4((**t).clone()),
        }
    }
}

impl<'a> From<&'a mut Matrix> for ParamMut<'a> {
    fn from(m: &'a mut Matrix) -> Self {
        ParamMut::Matrix(m)
    }
}

impl<'a> From<&'a mut Tensor4D> for ParamMut<'a> {
    fn from(t: &'a mut Tensor4D) -> Self {
        ParamMut::Tensor4(t)
    }
}

/// Gaussian weight matrix scaled for a layer with `rows` inputs.
pub(crate) fn randn_matrix(
    rows: usize,
    cols: usize,
    init: WeightInit,
    rng: &mut Rng,
) -> sumi_la::Result<Matrix> {
    let scale = init.scale(rows);
    Matrix::from_fn(rows, cols, |_, _| rng.normal() * scale)
}

/// Gaussian filter bank `(filters, channels, h, w)`.
pub(crate) fn randn_filters(
    dims: [usize; 4],
    init: WeightInit,
    rng: &mut Rng,
) -> sumi_la::Result<Tensor4D> {
    let scale = init.scale(dims[1] * dims[2] * dims[3]);
    Tensor4D::from_fn(dims, |_| rng.normal() * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_tags() {
        let m = Matrix::zeros(2, 3).unwrap();
        let t = Tensor4D::zeros([1, 1, 2, 2]).unwrap();
        assert_eq!(Param::from(m.clone()).rank(), 2);
        assert_eq!(Param::from(t.clone()).dims(), vec![1, 1, 2, 2]);
        assert!(Param::from(m).as_tensor4().is_none());
        assert!(Param::from(t).as_matrix().is_none());
    }

    #[test]
    fn writes_through_view_reach_owner() {
        let mut w = Matrix::zeros(1, 2).unwrap();
        {
            let mut view = ParamMut::from(&mut w);
            view.as_mut_slice()[1] = 5.0;
        }
        assert_eq!(w.as_slice(), &[0.0, 5.0]);
    }

    #[test]
    fn init_scale_follows_fan_in() {
        let mut rng = Rng::new(1);
        let w = randn_matrix(200, 50, WeightInit::He, &mut rng).unwrap();
        let var = w.as_slice().iter().map(|v| v * v).sum::<f64>() / w.len() as f64;
        assert!((var - 2.0 / 200.0).abs() < 2e-3, "var = {}", var);
    }
}
