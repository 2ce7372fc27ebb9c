//! Permutation backend trait.

use crate::scalar::Element;
use crate::tensor::Tensor;

/// Backend trait for dense permutation kernels.
pub trait PermutationBackend {
    /// Write `src` with axes permuted into `dest`.
    ///
    /// `perm[i]` gives the source dimension for the i-th dimension of the
    /// result; `dest` must already have the permuted shape. Validation is the
    /// caller's job.
    fn permute_into<ElT: Element>(dest: &mut Tensor<ElT>, src: &Tensor<ElT>, perm: &[usize]);
}
