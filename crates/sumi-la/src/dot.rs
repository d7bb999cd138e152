//! Matrix multiply: the serial reference and the fan-out parallel variant.

use crate::{Error, Matrix, Result};
use rayon::prelude::*;
use tracing::trace;

/// Upper bound on the total number of `f64` held in private slabs by one
/// parallel multiply wave. Past this, a multiply runs in several waves.
const SLAB_BUDGET: usize = 1 << 22;

impl Matrix {
    fn check_dot(&self, other: &Matrix) -> Result<()> {
        if self.cols() != other.rows() {
            return Err(Error::shape_mismatch(
                "dot",
                &[self.rows(), self.cols()],
                &[other.rows(), other.cols()],
            ));
        }
        Ok(())
    }

    /// `C[r, c] = Σ_k A[r, k]·B[k, c]`, summed for `k = 0..K` in order.
    pub fn dot(&self, other: &Matrix) -> Result<Matrix> {
        self.check_dot(other)?;
        let (m, k, n) = (self.rows(), self.cols(), other.cols());
        let a = self.as_slice();
        let b = other.as_slice();
        let mut out = vec![0.0; m * n];
        for r in 0..m {
            let out_row = &mut out[r * n..(r + 1) * n];
            for i in 0..k {
                let a_ri = a[r * k + i];
                for (o, &b_ic) in out_row.iter_mut().zip(&b[i * n..(i + 1) * n]) {
                    *o += a_ri * b_ic;
                }
            }
        }
        Matrix::new(m, n, out)
    }

    /// Parallel matrix multiply, fanned out over the contraction dimension.
    ///
    /// Each task writes the contribution of one contraction index into a
    /// private `rows × cols` slab. Tasks run in waves sized so the live slabs
    /// stay within `SLAB_BUDGET`; after each wave joins, its slabs are folded
    /// into the output in ascending index order on the calling thread. The
    /// result is bit-identical to [`Matrix::dot`] at every size.
    pub fn par_dot(&self, other: &Matrix) -> Result<Matrix> {
        self.check_dot(other)?;
        let k = self.cols();
        let cells = self.rows() * other.cols();
        let wave = (SLAB_BUDGET / cells).clamp(1, k);
        self.fan_out(other, wave)
    }

    fn fan_out(&self, other: &Matrix, wave: usize) -> Result<Matrix> {
        let (m, k, n) = (self.rows(), self.cols(), other.cols());
        let a = self.as_slice();
        let b = other.as_slice();
        trace!(m, k, n, wave, waves = k.div_ceil(wave), "par_dot fan-out");

        let mut out = vec![0.0; m * n];
        for start in (0..k).step_by(wave) {
            let slabs: Vec<Vec<f64>> = (start..(start + wave).min(k))
                .into_par_iter()
                .map(|i| {
                    let mut slab = vec![0.0; m * n];
                    let b_row = &b[i * n..(i + 1) * n];
                    for r in 0..m {
                        let a_ri = a[r * k + i];
                        for (s, &b_ic) in slab[r * n..(r + 1) * n].iter_mut().zip(b_row) {
                            *s = a_ri * b_ic;
                        }
                    }
                    slab
                })
                .collect();

            for slab in &slabs {
                for (o, &s) in out.iter_mut().zip(slab) {
                    *o += s;
                }
            }
        }
        Matrix::new(m, n, out)
    }
}
