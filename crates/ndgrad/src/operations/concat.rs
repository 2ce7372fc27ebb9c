//! Concatenation and splitting along one axis.

use crate::error::TensorError;
use crate::profiling;
use crate::scalar::Element;
use crate::tensor::Tensor;

/// (outer, axis size, inner) decomposition of `shape` around `axis`.
fn split_at_axis(shape: &[usize], axis: usize) -> (usize, usize, usize) {
    let outer = shape[..axis].iter().product();
    let inner = shape[axis + 1..].iter().product();
    (outer, shape[axis], inner)
}

/// Join tensors along `axis`. All other dimensions must agree.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::concat;
///
/// let a = Tensor::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap();
/// let b = Tensor::from_vec(vec![3.0, 4.0, 5.0, 6.0], &[2, 2]).unwrap();
/// let c = concat(&[&a, &b], 1).unwrap();
/// assert_eq!(c.data(), &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]);
/// ```
pub fn concat<T: Element>(tensors: &[&Tensor<T>], axis: usize) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("concat");
    let Some(first) = tensors.first() else {
        return Err(TensorError::InvalidOperation {
            message: "concat needs at least one tensor".to_string(),
        });
    };
    let ndim = first.ndim();
    if axis >= ndim {
        return Err(TensorError::InvalidAxis { axis, ndim });
    }
    for t in tensors {
        if t.ndim() != ndim {
            return Err(TensorError::RankMismatch {
                expected: ndim,
                actual: t.ndim(),
            });
        }
        let mismatched = (0..ndim).any(|d| d != axis && t.shape()[d] != first.shape()[d]);
        if mismatched {
            return Err(TensorError::IncompatibleShapes {
                lhs: first.shape().to_vec(),
                rhs: t.shape().to_vec(),
            });
        }
    }

    let mut out_shape = first.shape().to_vec();
    out_shape[axis] = tensors.iter().map(|t| t.shape()[axis]).sum();
    let (outer, _, _) = split_at_axis(&out_shape, axis);
    let mut data = Vec::with_capacity(out_shape.iter().product());
    for o in 0..outer {
        for t in tensors {
            let (_, size, inner) = split_at_axis(t.shape(), axis);
            let chunk = size * inner;
            data.extend_from_slice(&t.data()[o * chunk..(o + 1) * chunk]);
        }
    }
    Ok(Tensor::from_raw(data, &out_shape))
}

/// Partition `x` along `axis` into pieces of the given sizes.
///
/// # Errors
///
/// Returns an error if the sections do not add up to the axis size.
pub fn split<T: Element>(
    x: &Tensor<T>,
    sections: &[usize],
    axis: usize,
) -> Result<Vec<Tensor<T>>, TensorError> {
    profiling::primitive("split");
    if axis >= x.ndim() {
        return Err(TensorError::InvalidAxis { axis, ndim: x.ndim() });
    }
    let (outer, size, inner) = split_at_axis(x.shape(), axis);
    let total: usize = sections.iter().sum();
    if total != size {
        return Err(TensorError::InvalidOperation {
            message: format!("split sections {sections:?} do not cover axis {axis} of size {size}"),
        });
    }

    let mut pieces = Vec::with_capacity(sections.len());
    let mut start = 0;
    for &section in sections {
        let mut data = Vec::with_capacity(outer * section * inner);
        for o in 0..outer {
            let base = (o * size + start) * inner;
            data.extend_from_slice(&x.data()[base..base + section * inner]);
        }
        let mut shape = x.shape().to_vec();
        shape[axis] = section;
        pieces.push(Tensor::from_raw(data, &shape));
        start += section;
    }
    Ok(pieces)
}
