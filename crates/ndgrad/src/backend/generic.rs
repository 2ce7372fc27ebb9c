//! Generic (naive loop-based) backend implementation.

use crate::backend::PermutationBackend;
use crate::scalar::Element;
use crate::strides::next_index;
use crate::tensor::Tensor;

/// Generic backend using naive loop-based implementations.
pub struct GenericBackend;

impl PermutationBackend for GenericBackend {
    fn permute_into<ElT: Element>(dest: &mut Tensor<ElT>, src: &Tensor<ElT>, perm: &[usize]) {
        if dest.is_empty() {
            return;
        }
        // Walk the destination in order and read the source through permuted strides.
        let dest_shape = dest.shape().to_vec();
        let src_strides: Vec<usize> = perm.iter().map(|&p| src.strides()[p]).collect();
        let src_data = src.data();
        let out = dest.data_mut();

        let mut index = vec![0; dest_shape.len()];
        let mut offset = 0usize;
        let mut linear = 0usize;
        loop {
            out[linear] = src_data[offset];
            linear += 1;
            if !next_index(&mut index, &dest_shape) {
                break;
            }
            offset = index.iter().zip(&src_strides).map(|(&i, &s)| i * s).sum();
        }
    }
}
