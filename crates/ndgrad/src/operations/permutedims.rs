//! Axis permutation.
//!
//! ```text
//! permutedims(tensor, perm)
//!     → validate permutation
//!     → allocate output with permuted shape
//!     → permutedims_into(output, tensor, perm)
//!
//! permutedims_into(dest, src, perm)
//!     → dispatch to backend (GenericBackend)
//! ```

use crate::backend::{GenericBackend, PermutationBackend};
use crate::error::TensorError;
use crate::profiling;
use crate::scalar::Element;
use crate::tensor::Tensor;

/// Permute the dimensions of a tensor, returning a new tensor.
///
/// `perm[i]` gives the source dimension for the i-th dimension of the result.
///
/// # Errors
///
/// Returns error if `perm` is not a valid permutation of `0..ndim`.
///
/// # Examples
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::permutedims;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let t2 = permutedims(&t, &[1, 0]).unwrap();
/// assert_eq!(t2.shape(), &[3, 2]);
/// assert_eq!(t.get(&[1, 0]), t2.get(&[0, 1]));
/// ```
pub fn permutedims<T: Element>(
    tensor: &Tensor<T>,
    perm: &[usize],
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("transpose");
    validate_permutation(perm, tensor.ndim())?;

    let new_shape: Vec<usize> = perm.iter().map(|&p| tensor.shape()[p]).collect();
    let mut result = Tensor::zeros(&new_shape);
    permutedims_into(&mut result, tensor, perm);
    Ok(result)
}

/// Permute dimensions into an existing output tensor.
///
/// `dest` must already have the permuted shape.
pub fn permutedims_into<T: Element>(dest: &mut Tensor<T>, src: &Tensor<T>, perm: &[usize]) {
    GenericBackend::permute_into(dest, src, perm);
}

/// Inverse of a permutation: `inverse[perm[i]] == i`.
///
/// ```
/// use ndgrad::operations::inverse_permutation;
///
/// assert_eq!(inverse_permutation(&[2, 0, 1]), vec![1, 2, 0]);
/// ```
pub fn inverse_permutation(perm: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; perm.len()];
    for (i, &p) in perm.iter().enumerate() {
        if p < inverse.len() {
            inverse[p] = i;
        }
    }
    inverse
}

/// Validate that perm is a valid permutation of 0..ndim.
pub(crate) fn validate_permutation(perm: &[usize], ndim: usize) -> Result<(), TensorError> {
    let invalid = || TensorError::InvalidPermutation {
        perm: perm.to_vec(),
        ndim,
    };
    if perm.len() != ndim {
        return Err(invalid());
    }
    let mut seen = vec![false; ndim];
    for &p in perm {
        if p >= ndim || seen[p] {
            return Err(invalid());
        }
        seen[p] = true;
    }
    Ok(())
}
