use crate::shape::{check_nonzero, check_permutation, contiguous_strides};
use sumi_la::{Error, Result};

/// Row-major `f64` array of rank `N`. Every dimension is non-zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<const N: usize> {
    data: Vec<f64>,
    dims: [usize; N],
    strides: [usize; N],
}

/// Advance a row-major multi-index; returns `false` after the last element.
fn increment<const N: usize>(idx: &mut [usize; N], dims: &[usize; N]) -> bool {
    for d in (0..N).rev() {
        idx[d] += 1;
        if idx[d] < dims[d] {
            return true;
        }
        idx[d] = 0;
    }
    false
}

impl<const N: usize> Tensor<N> {
    /// Create from flat row-major data.
    pub fn new(dims: [usize; N], data: Vec<f64>) -> Result<Self> {
        check_nonzero("tensor", &dims)?;
        let numel: usize = dims.iter().product();
        if data.len() != numel {
            return Err(Error::shape_mismatch("tensor", &dims, &[data.len()]));
        }
        Ok(Self::from_parts(dims, data))
    }

    /// Crate-internal constructor for dimensions already known to be valid.
    pub(crate) fn from_parts(dims: [usize; N], data: Vec<f64>) -> Self {
        debug_assert_eq!(data.len(), dims.iter().product::<usize>());
        Self {
            data,
            strides: contiguous_strides(&dims),
            dims,
        }
    }

    pub fn zeros(dims: [usize; N]) -> Result<Self> {
        let numel = dims.iter().product();
        Self::new(dims, vec![0.0; numel])
    }

    /// Build element by element; `f` sees multi-indices in row-major order.
    pub fn from_fn(dims: [usize; N], mut f: impl FnMut([usize; N]) -> f64) -> Result<Self> {
        check_nonzero("tensor", &dims)?;
        let numel: usize = dims.iter().product();
        let mut data = Vec::with_capacity(numel);
        let mut idx = [0usize; N];
        loop {
            data.push(f(idx));
            if !increment(&mut idx, &dims) {
                break;
            }
        }
        Ok(Self::from_parts(dims, data))
    }

    #[inline]
    pub fn dims(&self) -> [usize; N] {
        self.dims
    }

    #[inline]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    #[inline]
    fn offset(&self, idx: [usize; N]) -> usize {
        idx.iter().zip(self.strides.iter()).map(|(i, s)| i * s).sum()
    }

    #[inline]
    pub fn get(&self, idx: [usize; N]) -> f64 {
        self.data[self.offset(idx)]
    }

    #[inline]
    pub fn set(&mut self, idx: [usize; N], val: f64) {
        let o = self.offset(idx);
        self.data[o] = val;
    }

    /// `self[idx] += val`.
    #[inline]
    pub fn add_at(&mut self, idx: [usize; N], val: f64) {
        let o = self.offset(idx);
        self.data[o] += val;
    }

    /// Same data, new rank and dimensions.
    pub fn reshape<const M: usize>(&self, dims: [usize; M]) -> Result<Tensor<M>> {
        self.clone().into_reshape(dims)
    }

    pub fn into_reshape<const M: usize>(self, dims: [usize; M]) -> Result<Tensor<M>> {
        let numel: usize = dims.iter().product();
        if numel != self.numel() {
            return Err(Error::shape_mismatch("reshape", &self.dims, &dims));
        }
        Tensor::new(dims, self.data)
    }

    /// Reorder axes: output axis `i` is input axis `perm[i]`.
    pub fn transpose(&self, perm: [usize; N]) -> Result<Self> {
        check_permutation(&perm)?;
        let mut dims = [0usize; N];
        let mut src_strides = [0usize; N];
        for (i, &p) in perm.iter().enumerate() {
            dims[i] = self.dims[p];
            src_strides[i] = self.strides[p];
        }
        let mut data = Vec::with_capacity(self.numel());
        let mut idx = [0usize; N];
        loop {
            let o: usize = idx.iter().zip(src_strides.iter()).map(|(i, s)| i * s).sum();
            data.push(self.data[o]);
            if !increment(&mut idx, &dims) {
                break;
            }
        }
        Ok(Self::from_parts(dims, data))
    }

    // --- Element-wise ---

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_parts(self.dims, self.data.iter().map(|&v| f(v)).collect())
    }

    pub fn zip_with(&self, other: &Self, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.dims != other.dims {
            return Err(Error::shape_mismatch(op, &self.dims, &other.dims));
        }
        let data = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| f(a, b))
            .collect();
        Ok(Self::from_parts(self.dims, data))
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    pub fn scale(&self, s: f64) -> Self {
        self.map(|v| v * s)
    }

    // --- Reductions ---

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.dims == other.dims
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}
