//! Shape transforms: reshape, expand, tile.

use crate::error::TensorError;
use crate::operations::elementwise::broadcast_data;
use crate::profiling;
use crate::scalar::Element;
use crate::strides::{compute_strides, next_index};
use crate::tensor::Tensor;

/// Reshape without copying; the result shares storage with `x`.
///
/// # Errors
///
/// Returns `TensorError::ShapeMismatch` if the element counts differ.
pub fn reshape<T: Element>(x: &Tensor<T>, shape: &[usize]) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("reshape");
    x.reshape(shape)
}

/// Broadcast `x` to `shape`.
///
/// `x`'s dimensions are right-aligned against `shape`; each must equal the
/// target dimension or be 1.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::expand;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap();
/// let e = expand(&t, &[2, 3]).unwrap();
/// assert_eq!(e.data(), &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
/// ```
pub fn expand<T: Element>(x: &Tensor<T>, shape: &[usize]) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("expand");
    let incompatible = || TensorError::IncompatibleShapes {
        lhs: x.shape().to_vec(),
        rhs: shape.to_vec(),
    };
    if x.ndim() > shape.len() {
        return Err(incompatible());
    }
    let offset = shape.len() - x.ndim();
    for (axis, &dim) in x.shape().iter().enumerate() {
        if dim != shape[axis + offset] && dim != 1 {
            return Err(incompatible());
        }
    }
    Ok(Tensor::from_raw(broadcast_data(x, shape), shape))
}

/// Repeat `x` `repeat_times[i]` times along each axis.
///
/// When the lengths differ, the shorter of `x.shape()` and `repeat_times`
/// is padded with leading 1s.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::tile;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
/// let r = tile(&t, &[2, 2]).unwrap();
/// assert_eq!(r.shape(), &[2, 4]);
/// assert_eq!(r.data(), &[1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
/// ```
pub fn tile<T: Element>(x: &Tensor<T>, repeat_times: &[usize]) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("tile");
    let rank = x.ndim().max(repeat_times.len());
    let src_shape = left_pad(x.shape(), rank);
    let repeats = left_pad(repeat_times, rank);
    let out_shape: Vec<usize> = src_shape.iter().zip(&repeats).map(|(&d, &r)| d * r).collect();
    let src_strides = compute_strides(&src_shape);

    let len: usize = out_shape.iter().product();
    let src = x.data();
    let mut data = Vec::with_capacity(len);
    if len > 0 {
        let mut index = vec![0; rank];
        loop {
            let offset: usize = index
                .iter()
                .zip(&src_shape)
                .zip(&src_strides)
                .map(|((&i, &d), &s)| (i % d) * s)
                .sum();
            data.push(src[offset]);
            if !next_index(&mut index, &out_shape) {
                break;
            }
        }
    }
    Ok(Tensor::from_raw(data, &out_shape))
}

/// `shape` with leading 1s added up to `rank`.
pub(crate) fn left_pad(shape: &[usize], rank: usize) -> Vec<usize> {
    let mut padded = vec![1; rank.saturating_sub(shape.len())];
    padded.extend_from_slice(shape);
    padded
}
