use sumi_la::{Error, Result};

/// Row-major strides for `dims`.
pub(crate) fn contiguous_strides<const N: usize>(dims: &[usize; N]) -> [usize; N] {
    let mut strides = [0usize; N];
    let mut acc = 1;
    for i in (0..N).rev() {
        strides[i] = acc;
        acc *= dims[i];
    }
    strides
}

pub(crate) fn check_nonzero(what: &'static str, dims: &[usize]) -> Result<()> {
    if dims.iter().any(|&d| d == 0) {
        return Err(Error::InvalidConstruction {
            what,
            dims: dims.to_vec(),
        });
    }
    Ok(())
}

/// Checks that `perm` names every axis exactly once.
pub(crate) fn check_permutation<const N: usize>(perm: &[usize; N]) -> Result<()> {
    let mut seen = [false; N];
    for &p in perm {
        if p >= N || seen[p] {
            return Err(Error::Configuration(format!(
                "{perm:?} is not a permutation of {N} axes"
            )));
        }
        seen[p] = true;
    }
    Ok(())
}

/// Spatial output size of a sliding window: `(input - filter + 2·pad) / stride + 1`.
///
/// Fails when the window does not fit or the division is not exact.
pub fn conv_output_size(input: usize, filter: usize, pad: usize, stride: usize) -> Result<usize> {
    if stride == 0 || filter == 0 {
        return Err(Error::Configuration(format!(
            "filter ({filter}) and stride ({stride}) must be positive"
        )));
    }
    let span = input + 2 * pad;
    if filter > span {
        return Err(Error::Configuration(format!(
            "filter {filter} larger than padded input {span}"
        )));
    }
    if (span - filter) % stride != 0 {
        return Err(Error::Configuration(format!(
            "(input {input} - filter {filter} + 2*pad {pad}) is not divisible by stride {stride}"
        )));
    }
    Ok((span - filter) / stride + 1)
}
