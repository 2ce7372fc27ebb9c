//! Slicing, padding and rolling.

use std::ops::Range;

use crate::error::TensorError;
use crate::profiling;
use crate::scalar::Element;
use crate::strides::{cartesian_to_linear, next_index};
use crate::tensor::Tensor;

/// Extract a copy of the sub-tensor selected by one range per dimension.
///
/// # Errors
///
/// Returns error if:
/// - Number of ranges doesn't match tensor dimensions
/// - Any range is out of bounds or reversed
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::slice;
///
/// let t = Tensor::<f64>::ones(&[4, 5, 6]);
/// let s = slice(&t, &[1..3, 0..5, 2..4]).unwrap();
/// assert_eq!(s.shape(), &[2, 5, 2]);
/// ```
pub fn slice<T: Element>(x: &Tensor<T>, ranges: &[Range<usize>]) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("slice");
    slice_raw(x, ranges)
}

fn slice_raw<T: Element>(x: &Tensor<T>, ranges: &[Range<usize>]) -> Result<Tensor<T>, TensorError> {
    let shape = x.shape();
    if ranges.len() != x.ndim() {
        return Err(TensorError::WrongNumberOfIndices {
            expected: x.ndim(),
            actual: ranges.len(),
        });
    }

    let mut new_shape = Vec::with_capacity(ranges.len());
    for (dim, range) in ranges.iter().enumerate() {
        if range.start > range.end || range.end > shape[dim] {
            return Err(TensorError::SliceOutOfBounds {
                start: range.start,
                end: range.end,
                dim,
                size: shape[dim],
            });
        }
        new_shape.push(range.end - range.start);
    }

    let len: usize = new_shape.iter().product();
    let mut data = Vec::with_capacity(len);
    if len > 0 {
        let mut index = vec![0; new_shape.len()];
        let mut src_index = vec![0; new_shape.len()];
        loop {
            for ((s, &i), range) in src_index.iter_mut().zip(&index).zip(ranges) {
                *s = range.start + i;
            }
            data.push(x.data()[cartesian_to_linear(&src_index, x.strides())]);
            if !next_index(&mut index, &new_shape) {
                break;
            }
        }
    }
    Ok(Tensor::from_raw(data, &new_shape))
}

/// Surround `x` with `value`: `paddings[i] = (before, after)` for axis `i`.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::pad;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
/// assert_eq!(pad(&t, &[(1, 2)], 0.0).unwrap().data(), &[0.0, 1.0, 2.0, 0.0, 0.0]);
/// ```
pub fn pad<T: Element>(
    x: &Tensor<T>,
    paddings: &[(usize, usize)],
    value: f64,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("pad");
    if paddings.len() != x.ndim() {
        return Err(TensorError::WrongNumberOfIndices {
            expected: x.ndim(),
            actual: paddings.len(),
        });
    }
    let out_shape: Vec<usize> = x
        .shape()
        .iter()
        .zip(paddings)
        .map(|(&dim, &(before, after))| before + dim + after)
        .collect();
    let fill = vec![T::cast_from_f64(value); out_shape.iter().product()];
    let mut out = Tensor::from_raw(fill, &out_shape);
    if !x.is_empty() {
        let out_strides = out.strides().to_vec();
        let dest = out.data_mut();
        let mut index = vec![0; x.ndim()];
        let mut dest_index = vec![0; x.ndim()];
        for &v in x.data() {
            for ((d, &i), &(before, _)) in dest_index.iter_mut().zip(&index).zip(paddings) {
                *d = before + i;
            }
            dest[cartesian_to_linear(&dest_index, &out_strides)] = v;
            next_index(&mut index, x.shape());
        }
    }
    Ok(out)
}

/// Circularly shift elements: element `i` moves to `i + shift` along each axis.
///
/// With no `axes`, the tensor is rolled as if flattened and `shifts` must
/// hold a single value.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::roll;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[4]).unwrap();
/// assert_eq!(roll(&t, &[1], &[0]).unwrap().data(), &[4.0, 1.0, 2.0, 3.0]);
/// assert_eq!(roll(&t, &[-1], &[]).unwrap().data(), &[2.0, 3.0, 4.0, 1.0]);
/// ```
pub fn roll<T: Element>(
    x: &Tensor<T>,
    shifts: &[i64],
    axes: &[usize],
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("roll");
    if axes.is_empty() {
        let &[shift] = shifts else {
            return Err(TensorError::InvalidOperation {
                message: format!(
                    "roll over a flattened tensor takes one shift, got {}",
                    shifts.len()
                ),
            });
        };
        let flat = x.reshape(&[x.len()])?;
        return roll_axes(&flat, &[shift], &[0])?.reshape(x.shape());
    }
    if shifts.len() != axes.len() {
        return Err(TensorError::InvalidOperation {
            message: format!("roll got {} shifts for {} axes", shifts.len(), axes.len()),
        });
    }
    roll_axes(x, shifts, axes)
}

fn roll_axes<T: Element>(
    x: &Tensor<T>,
    shifts: &[i64],
    axes: &[usize],
) -> Result<Tensor<T>, TensorError> {
    let mut total = vec![0i64; x.ndim()];
    for (&shift, &axis) in shifts.iter().zip(axes) {
        if axis >= x.ndim() {
            return Err(TensorError::InvalidAxis { axis, ndim: x.ndim() });
        }
        total[axis] += shift;
    }
    let mut out = x.clone();
    if x.is_empty() {
        return Ok(out);
    }
    let strides = x.strides().to_vec();
    let dest = out.data_mut();
    let mut index = vec![0; x.ndim()];
    let mut dest_index = vec![0; x.ndim()];
    for &v in x.data() {
        for (axis, d) in dest_index.iter_mut().enumerate() {
            let size = x.shape()[axis] as i64;
            *d = (index[axis] as i64 + total[axis]).rem_euclid(size) as usize;
        }
        dest[cartesian_to_linear(&dest_index, &strides)] = v;
        next_index(&mut index, x.shape());
    }
    Ok(out)
}
