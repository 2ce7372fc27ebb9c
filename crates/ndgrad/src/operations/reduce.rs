//! Axis reductions and scans.

use crate::error::TensorError;
use crate::profiling;
use crate::scalar::{Element, Scalar};
use crate::strides::{cartesian_to_linear, compute_strides, next_index};
use crate::tensor::Tensor;

/// Per-axis flags marking the reduced axes. Duplicates are harmless.
fn axis_mask(axes: &[usize], ndim: usize) -> Result<Vec<bool>, TensorError> {
    let mut mask = vec![false; ndim];
    for &axis in axes {
        if axis >= ndim {
            return Err(TensorError::InvalidAxis { axis, ndim });
        }
        mask[axis] = true;
    }
    Ok(mask)
}

fn reduce_with<T: Element>(
    x: &Tensor<T>,
    axes: &[usize],
    keepdim: bool,
    init: T,
    combine: impl Fn(T, T) -> T,
) -> Result<Tensor<T>, TensorError> {
    let mask = axis_mask(axes, x.ndim())?;
    let kept_shape: Vec<usize> = x
        .shape()
        .iter()
        .zip(&mask)
        .map(|(&dim, &reduced)| if reduced { 1 } else { dim })
        .collect();
    let out_strides: Vec<usize> = compute_strides(&kept_shape)
        .into_iter()
        .zip(&mask)
        .map(|(stride, &reduced)| if reduced { 0 } else { stride })
        .collect();

    let mut out = vec![init; kept_shape.iter().product()];
    let mut index = vec![0; x.ndim()];
    for &value in x.data() {
        let offset = cartesian_to_linear(&index, &out_strides);
        out[offset] = combine(out[offset], value);
        next_index(&mut index, x.shape());
    }

    let shape: Vec<usize> = if keepdim {
        kept_shape
    } else {
        x.shape()
            .iter()
            .zip(&mask)
            .filter(|&(_, &reduced)| !reduced)
            .map(|(&dim, _)| dim)
            .collect()
    };
    Ok(Tensor::from_raw(out, &shape))
}

/// Sum over `axes`; with `keepdim` the reduced axes stay as size 1.
///
/// An empty axis list leaves the values unchanged.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::sum;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// assert_eq!(sum(&t, &[0], false).unwrap().data(), &[5.0, 7.0, 9.0]);
/// assert_eq!(sum(&t, &[1], true).unwrap().shape(), &[2, 1]);
/// assert_eq!(sum(&t, &[0, 1], false).unwrap().shape(), &[] as &[usize]);
/// ```
pub fn sum<T: Scalar>(
    x: &Tensor<T>,
    axes: &[usize],
    keepdim: bool,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("sum");
    reduce_with(x, axes, keepdim, T::zero(), |a, b| a + b)
}

/// Maximum over `axes`.
pub fn max<T: Scalar>(
    x: &Tensor<T>,
    axes: &[usize],
    keepdim: bool,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("max");
    reduce_with(x, axes, keepdim, T::neg_infinity(), |a, b| if b > a { b } else { a })
}

/// Product over `axes`.
pub fn prod<T: Scalar>(
    x: &Tensor<T>,
    axes: &[usize],
    keepdim: bool,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("prod");
    reduce_with(x, axes, keepdim, T::one(), |a, b| a * b)
}

/// Cumulative sum along `axis`, or over the flattened tensor when `axis` is `None`.
///
/// `exclusive` shifts the running total by one position (the first output
/// is zero); `reverse` accumulates from the end of the axis.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::cumsum;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
/// assert_eq!(cumsum(&t, Some(0), false, false).unwrap().data(), &[1.0, 3.0, 6.0]);
/// assert_eq!(cumsum(&t, Some(0), true, false).unwrap().data(), &[0.0, 1.0, 3.0]);
/// assert_eq!(cumsum(&t, Some(0), false, true).unwrap().data(), &[6.0, 5.0, 3.0]);
/// ```
pub fn cumsum<T: Scalar>(
    x: &Tensor<T>,
    axis: Option<usize>,
    exclusive: bool,
    reverse: bool,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("cumsum");
    let (shape, axis) = match axis {
        Some(axis) if axis < x.ndim() => (x.shape().to_vec(), axis),
        Some(axis) => return Err(TensorError::InvalidAxis { axis, ndim: x.ndim() }),
        None => (vec![x.len()], 0),
    };
    let size = shape[axis];
    let stride = compute_strides(&shape)[axis];
    let src = x.data();
    let mut out = vec![T::zero(); src.len()];

    for start in (0..src.len()).filter(|&p| size == 0 || (p / stride) % size == 0) {
        let mut total = T::zero();
        for step in 0..size {
            let k = if reverse { size - 1 - step } else { step };
            let offset = start + k * stride;
            if exclusive {
                out[offset] = total;
                total = total + src[offset];
            } else {
                total = total + src[offset];
                out[offset] = total;
            }
        }
    }
    Ok(Tensor::from_raw(out, &shape))
}
