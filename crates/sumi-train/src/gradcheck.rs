//! Central-difference gradients for checking hand-written backward passes.

use crate::Result;

/// Finite-difference step.
pub const H: f64 = 1e-4;

/// `(f(x + h·eᵢ) − f(x − h·eᵢ)) / 2h` for every coordinate of `x`.
///
/// `x` is perturbed in place and restored after each coordinate.
pub fn numerical_gradient(mut f: impl FnMut(&[f64]) -> Result<f64>, x: &mut [f64]) -> Result<Vec<f64>> {
    let mut grad = Vec::with_capacity(x.len());
    for i in 0..x.len() {
        let orig = x[i];
        x[i] = orig + H;
        let plus = f(x);
        x[i] = orig - H;
        let minus = f(x);
        x[i] = orig;
        grad.push((plus? - minus?) / (2.0 * H));
    }
    Ok(grad)
}

/// Largest absolute element-wise difference; `f64::INFINITY` on length mismatch.
pub fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}
