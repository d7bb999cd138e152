use crate::{Error, Result, Vector};
use core::fmt;

/// Row-major matrix over a [`Vector`].
///
/// Element `(r, c)` is stored at `data[r * cols + c]`. Both dimensions are
/// always non-zero.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    data: Vector,
    rows: usize,
    cols: usize,
}

impl Matrix {
    /// Create from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        Self::from_vector(rows, cols, Vector::from_vec(data))
    }

    /// Wrap `data` as a `rows × cols` matrix. The length must equal
    /// `rows * cols`.
    pub fn from_vector(rows: usize, cols: usize, data: Vector) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(Error::InvalidConstruction {
                what: "matrix",
                dims: vec![rows, cols],
            });
        }
        if data.len() != rows * cols {
            return Err(Error::shape_mismatch("matrix", &[rows, cols], &[data.len()]));
        }
        Ok(Self { data, rows, cols })
    }

    /// All-zero `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        Self::new(rows, cols, vec![0.0; rows * cols])
    }

    /// Zeros with the shape of `self`.
    pub fn zeros_like(&self) -> Self {
        self.with_data(Vector::zeros(self.data.len()))
    }

    /// Element `(r, c)` is `f(r, c)`.
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Result<Self> {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Self::new(rows, cols, data)
    }

    /// Single-row matrix, the layout used for biases.
    pub fn row_vector(values: &[f64]) -> Result<Self> {
        Self::new(1, values.len(), values.to_vec())
    }

    /// Same dimensions as `self`, new contents. Caller guarantees the length.
    fn with_data(&self, data: Vector) -> Self {
        debug_assert_eq!(data.len(), self.rows * self.cols);
        Self {
            data,
            rows: self.rows,
            cols: self.cols,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// NumPy-style squeezed shape: a single-row matrix reports `(cols, 0)`.
    ///
    /// Only the broadcast decision in [`Matrix::add_or_broadcast`] reads this.
    pub fn squeezed_shape(&self) -> (usize, usize) {
        if self.rows == 1 {
            (self.cols, 0)
        } else {
            (self.rows, self.cols)
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Element at `(r, c)`. Panics when out of bounds.
    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    /// Overwrite the element at `(r, c)`. Panics when out of bounds.
    #[inline]
    pub fn set(&mut self, r: usize, c: usize, val: f64) {
        self.data[r * self.cols + c] = val;
    }

    /// Borrow row `r`.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data.as_slice()[r * self.cols..(r + 1) * self.cols]
    }

    /// Row-major elements.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data.as_mut_slice()
    }

    /// The flat row-major storage.
    pub fn vector(&self) -> &Vector {
        &self.data
    }

    /// Consume into the flat row-major storage.
    pub fn into_vector(self) -> Vector {
        self.data
    }

    /// Reinterpret the row-major data with new dimensions.
    pub fn reshape(&self, rows: usize, cols: usize) -> Result<Self> {
        if rows * cols != self.len() {
            return Err(Error::shape_mismatch("reshape", &[self.rows, self.cols], &[rows, cols]));
        }
        Self::from_vector(rows, cols, self.data.clone())
    }

    // --- Element-wise ---

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_data(self.data.map(f))
    }

    fn zip_with(&self, other: &Self, op: &'static str, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        if self.shape() != other.shape() {
            return Err(Error::shape_mismatch(
                op,
                &[self.rows, self.cols],
                &[other.rows, other.cols],
            ));
        }
        Ok(self.with_data(self.data.zip_with(&other.data, op, f)?))
    }

    /// Elementwise sum. Shapes must match exactly; see
    /// [`Matrix::add_or_broadcast`] for the broadcasting form.
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

    /// Add a `1 × cols` row to every row of `self`.
    pub fn add_row(&self, row: &Self) -> Result<Self> {
        if row.rows != 1 || row.cols != self.cols {
            return Err(Error::shape_mismatch(
                "add_row",
                &[self.rows, self.cols],
                &[row.rows, row.cols],
            ));
        }
        let b = row.as_slice();
        let mut out = self.clone();
        for chunk in out.as_mut_slice().chunks_exact_mut(self.cols) {
            for (v, &bc) in chunk.iter_mut().zip(b) {
                *v += bc;
            }
        }
        Ok(out)
    }

    /// Elementwise add for equal shapes, row broadcast when `other` is
    /// vector-like (squeezed shape `(cols, 0)`), otherwise a mismatch.
    pub fn add_or_broadcast(&self, other: &Self) -> Result<Self> {
        if self.shape() == other.shape() {
            return self.add(other);
        }
        match other.squeezed_shape() {
            (n, 0) if n == self.cols => self.add_row(other),
            _ => Err(Error::shape_mismatch(
                "add_or_broadcast",
                &[self.rows, self.cols],
                &[other.rows, other.cols],
            )),
        }
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
        self.with_data(self.data.exp())
    }

    /// Elementwise natural log.
    pub fn ln(&self) -> Self {
        self.with_data(self.data.ln())
    }

    /// Elementwise square root.
    pub fn sqrt(&self) -> Self {
        self.with_data(self.data.sqrt())
    }

    /// Raise every element to `p`.
    pub fn powf(&self, p: f64) -> Self {
        self.with_data(self.data.powf(p))
    }

    /// Raise every element to the integer power `p`.
    pub fn powi(&self, p: i32) -> Self {
        self.with_data(self.data.powi(p))
    }

    // --- Reductions ---

    /// Sum of all elements.
    pub fn sum(&self) -> f64 {
        self.data.sum()
    }

    /// Largest element; `-inf` for an empty matrix.
    pub fn max(&self) -> f64 {
        self.data.max()
    }

    /// Sum along `axis`, returning a single-row matrix.
    ///
    /// Axis 0 collapses rows (one sum per column), axis 1 collapses columns
    /// (one sum per row).
    pub fn sum_axis(&self, axis: usize) -> Result<Self> {
        match axis {
            0 => {
                let mut out = vec![0.0; self.cols];
                for r in 0..self.rows {
                    for (acc, &v) in out.iter_mut().zip(self.row(r)) {
                        *acc += v;
                    }
                }
                Self::new(1, self.cols, out)
            }
            1 => {
                let out = (0..self.rows).map(|r| self.row(r).iter().sum()).collect();
                Self::new(1, self.rows, out)
            }
            _ => Err(Error::Configuration(format!(
                "sum_axis: axis {axis} out of range for a matrix"
            ))),
        }
    }

    /// Column index of the maximum in each row.
    pub fn argmax_rows(&self) -> Vec<usize> {
        (0..self.rows)
            .map(|r| Vector::from_slice(self.row(r)).argmax().unwrap_or(0))
            .collect()
    }

    /// Logical transpose: element `(r, c)` moves to `(c, r)`.
    pub fn transpose(&self) -> Self {
        let mut data = Vec::with_capacity(self.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                data.push(self.get(r, c));
            }
        }
        Self {
            data: Vector::from_vec(data),
            rows: self.cols,
            cols: self.rows,
        }
    }

    // --- Classification helpers ---

    /// Row-wise softmax with max subtraction.
    pub fn softmax_rows(&self) -> Self {
        let mut data = Vec::with_capacity(self.len());
        for r in 0..self.rows {
            data.extend(Vector::from_slice(self.row(r)).softmax().into_vec());
        }
        self.with_data(Vector::from_vec(data))
    }

    /// Mean over rows of `-Σ t·ln(y + ε)`, with `self` as the probabilities.
    pub fn cross_entropy(&self, target: &Self) -> Result<f64> {
        if self.shape() != target.shape() {
            return Err(Error::shape_mismatch(
                "cross_entropy",
                &[self.rows, self.cols],
                &[target.rows, target.cols],
            ));
        }
        let mut total = 0.0;
        for r in 0..self.rows {
            let y = Vector::from_slice(self.row(r));
            total += y.cross_entropy(&Vector::from_slice(target.row(r)))?;
        }
        Ok(total / self.rows as f64)
    }

    /// Same shape and every element within `tol`.
    pub fn approx_eq(&self, other: &Self, tol: f64) -> bool {
        self.shape() == other.shape() && self.data.approx_eq(&other.data, tol)
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for r in 0..self.rows {
            writeln!(f, "  {:?},", self.row(r))?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: usize, cols: usize, data: &[f64]) -> Matrix {
        Matrix::new(rows, cols, data.to_vec()).unwrap()
    }

    #[test]
    fn construction_rejects_zero_dims() {
        assert!(matches!(
            Matrix::zeros(0, 3),
            Err(Error::InvalidConstruction { .. })
        ));
        assert!(matches!(
            Matrix::new(2, 2, vec![1.0; 3]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn row_major_layout() {
        let a = m(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.get(1, 0), 4.0);
        assert_eq!(a.row(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn squeezed_shape_of_single_row() {
        let b = m(1, 3, &[1.0, 2.0, 3.0]);
        assert_eq!(b.shape(), (1, 3));
        assert_eq!(b.squeezed_shape(), (3, 0));
        assert_eq!(m(2, 3, &[0.0; 6]).squeezed_shape(), (2, 3));
    }

    #[test]
    fn add_or_broadcast_rules() {
        let a = m(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let b = m(1, 3, &[10.0, 20.0, 30.0]);
        let c = a.add_or_broadcast(&b).unwrap();
        assert_eq!(c.as_slice(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let same = a.add_or_broadcast(&a).unwrap();
        assert_eq!(same.as_slice(), &[2.0, 4.0, 6.0, 8.0, 10.0, 12.0]);

        let bad = m(1, 2, &[1.0, 2.0]);
        assert!(a.add_or_broadcast(&bad).is_err());
    }

    #[test]
    fn elementwise_requires_exact_shape() {
        let a = m(2, 3, &[0.0; 6]);
        let b = m(3, 2, &[0.0; 6]);
        assert!(matches!(a.add(&b), Err(Error::ShapeMismatch { op: "add", .. })));
    }

    #[test]
    fn sum_axis_both_directions() {
        let a = m(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.sum_axis(0).unwrap().as_slice(), &[5.0, 7.0, 9.0]);
        assert_eq!(a.sum_axis(1).unwrap().as_slice(), &[6.0, 15.0]);
        assert!(a.sum_axis(2).is_err());
        assert_eq!(a.sum(), 21.0);
    }

    #[test]
    fn transpose_moves_elements() {
        let a = m(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let t = a.transpose();
        assert_eq!(t.shape(), (3, 2));
        assert_eq!(t.as_slice(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(t.transpose(), a);
    }

    #[test]
    fn argmax_per_row() {
        let a = m(2, 3, &[0.1, 0.8, 0.1, 0.9, 0.05, 0.05]);
        assert_eq!(a.argmax_rows(), vec![1, 0]);
    }

    #[test]
    fn softmax_rows_stable_and_normalised() {
        let a = m(2, 3, &[1000.0, 1.0, 1.0, 1.0, 2.0, 3.0]);
        let s = a.softmax_rows();
        for r in 0..2 {
            let sum: f64 = s.row(r).iter().sum();
            assert!((sum - 1.0).abs() < 1e-12, "row {} sums to {}", r, sum);
        }
        assert!(s.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn cross_entropy_averages_rows() {
        let y = m(2, 2, &[0.5, 0.5, 0.5, 0.5]);
        let t = m(2, 2, &[1.0, 0.0, 0.0, 1.0]);
        let loss = y.cross_entropy(&t).unwrap();
        assert!((loss - (0.5f64 + 1e-7).ln().abs()).abs() < 1e-12);
    }

    #[test]
    fn display_lists_rows() {
        let a = m(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(a.to_string(), "[\n  [1.0, 2.0],\n  [3.0, 4.0],\n]");
    }
}
