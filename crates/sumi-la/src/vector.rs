use crate::{Error, Result, LOG_EPSILON};
use core::ops::{Index, IndexMut};

/// Heap-allocated sequence of `f64`.
///
/// Binary operations require equal lengths and return a fresh vector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vector {
    data: Vec<f64>,
}

impl Vector {
    /// Take ownership of `data` without copying.
    #[inline]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Copy `s` into a new vector.
    pub fn from_slice(s: &[f64]) -> Self {
        Self { data: s.to_vec() }
    }

    /// `n` zeros.
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![0.0; n],
        }
    }

    /// Element `i` is `f(i)`.
    pub fn from_fn(n: usize, f: impl FnMut(usize) -> f64) -> Self {
        Self {
            data: (0..n).map(f).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the elements.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Unwrap into the backing `Vec`.
    #[inline]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn iter(&self) -> core::slice::Iter<'_, f64> {
        self.data.iter()
    }

    // --- Element-wise ---

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combine two equal-length vectors element by element.
    pub fn zip_with(&self, other: &Self, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.len() != other.len() {
            return Err(Error::shape_mismatch(op, &[self.len()], &[other.len()]));
        }
        Ok(Self {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Elementwise `self + other`.
    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    /// Elementwise `self - other`.
    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    /// Elementwise (Hadamard) product.
    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    /// Elementwise `self / other`.
    pub fn div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    /// In-place `self += other`; used to merge accumulator slabs.
    pub fn add_assign(&mut self, other: &Self) -> Result<()> {
        if self.len() != other.len() {
            return Err(Error::shape_mismatch("add_assign", &[self.len()], &[other.len()]));
        }
        for (a, &b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
        Ok(())
    }

    /// Multiply every element by `s`.
    pub fn scale(&self, s: f64) -> Self {
        self.map(|v| v * s)
    }

    /// Add `s` to every element.
    pub fn add_scalar(&self, s: f64) -> Self {
        self.map(|v| v + s)
    }

    /// Elementwise `e^x`.
    pub fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    /// Elementwise natural log. Non-positive inputs give `-inf` or NaN.
    pub fn ln(&self) -> Self {
        self.map(f64::ln)
    }

    /// Elementwise square root.
    pub fn sqrt(&self) -> Self {
        self.map(f64::sqrt)
    }

    /// Raise every element to `p`.
    pub fn powf(&self, p: f64) -> Self {
        self.map(|v| v.powf(p))
    }

    /// Raise every element to the integer power `p`.
    pub fn powi(&self, p: i32) -> Self {
        self.map(|v| v.powi(p))
    }

    // --- Reductions ---

    /// Sum of all elements, `0.0` when empty.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Largest element; `-inf` for an empty vector.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Index of the first maximum, `None` for an empty vector.
    pub fn argmax(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Numerically stable softmax: the maximum is subtracted before `exp`.
    pub fn softmax(&self) -> Self {
        let max = self.max();
        let shifted = self.map(|v| (v - max).exp());
        let sum = shifted.sum();
        shifted.scale(1.0 / sum)
    }

    /// `-Σ t·ln(y + ε)` for one probability row `self` against target `t`.
    pub fn cross_entropy(&self, target: &Self) -> Result<f64> {
        let terms = self.zip_with(target, "cross_entropy", |y, t| t * (y + LOG_EPSILON).ln())?;
        Ok(-terms.sum())
    }

    /// Every element within `tol` of its counterpart.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.len() == other.len()
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl From<Vec<f64>> for Vector {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

impl Index<usize> for Vector {
    type Output = f64;
    #[inline]
    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for Vector {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}
