//! Index-driven reads and writes.
//!
//! Index tensors hold `i64` positions that must lie in `0..dim`.

use crate::error::TensorError;
use crate::profiling;
use crate::scalar::{Element, Scalar};
use crate::strides::{cartesian_to_linear, next_index};
use crate::tensor::Tensor;

fn checked_index(value: i64, dim_size: usize) -> Result<usize, TensorError> {
    if value < 0 || value as usize >= dim_size {
        return Err(TensorError::IndexOutOfBounds {
            index: value,
            dim_size,
        });
    }
    Ok(value as usize)
}

fn require_vector_index(index: &Tensor<i64>) -> Result<(), TensorError> {
    if index.ndim() > 1 {
        return Err(TensorError::RankMismatch {
            expected: 1,
            actual: index.ndim(),
        });
    }
    Ok(())
}

/// Select entries of `x` along `axis` at the positions in the 1-D `index`.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::gather;
///
/// let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
/// let index = Tensor::from_vec(vec![2i64, 0], &[2]).unwrap();
/// assert_eq!(gather(&x, &index, 1).unwrap().data(), &[3.0, 1.0, 6.0, 4.0]);
/// ```
pub fn gather<T: Element>(
    x: &Tensor<T>,
    index: &Tensor<i64>,
    axis: usize,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("gather");
    require_vector_index(index)?;
    if axis >= x.ndim() {
        return Err(TensorError::InvalidAxis { axis, ndim: x.ndim() });
    }
    let outer: usize = x.shape()[..axis].iter().product();
    let size = x.shape()[axis];
    let inner: usize = x.shape()[axis + 1..].iter().product();

    let mut out_shape = x.shape().to_vec();
    out_shape[axis] = index.len();
    let mut data = Vec::with_capacity(out_shape.iter().product());
    for o in 0..outer {
        for &i in index.data() {
            let base = (o * size + checked_index(i, size)?) * inner;
            data.extend_from_slice(&x.data()[base..base + inner]);
        }
    }
    Ok(Tensor::from_raw(data, &out_shape))
}

/// Write rows of `updates` into rows `index[i]` of `x` (axis 0).
///
/// With `overwrite`, later rows win on duplicate indices. Otherwise every
/// indexed row is first cleared and then receives the sum of all updates
/// aimed at it.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::scatter;
///
/// let x = Tensor::from_vec(vec![1.0, 1.0, 1.0], &[3]).unwrap();
/// let index = Tensor::from_vec(vec![0i64, 0], &[2]).unwrap();
/// let updates = Tensor::from_vec(vec![2.0, 3.0], &[2]).unwrap();
/// assert_eq!(scatter(&x, &index, &updates, true).unwrap().data(), &[3.0, 1.0, 1.0]);
/// assert_eq!(scatter(&x, &index, &updates, false).unwrap().data(), &[5.0, 1.0, 1.0]);
/// ```
pub fn scatter<T: Scalar>(
    x: &Tensor<T>,
    index: &Tensor<i64>,
    updates: &Tensor<T>,
    overwrite: bool,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("scatter");
    require_vector_index(index)?;
    let rows_match = x.ndim() >= 1
        && updates.ndim() == x.ndim()
        && updates.shape()[0] == index.len()
        && updates.shape()[1..] == x.shape()[1..];
    if !rows_match {
        return Err(TensorError::IncompatibleShapes {
            lhs: x.shape().to_vec(),
            rhs: updates.shape().to_vec(),
        });
    }
    let rows = x.shape()[0];
    let inner: usize = x.shape()[1..].iter().product();
    let mut out = x.to_vec();
    let targets = index
        .data()
        .iter()
        .map(|&i| checked_index(i, rows))
        .collect::<Result<Vec<_>, _>>()?;

    if !overwrite {
        for &row in &targets {
            out[row * inner..(row + 1) * inner].fill(T::zero());
        }
    }
    for (k, &row) in targets.iter().enumerate() {
        let src = &updates.data()[k * inner..(k + 1) * inner];
        let dest = &mut out[row * inner..(row + 1) * inner];
        if overwrite {
            dest.copy_from_slice(src);
        } else {
            for (d, &s) in dest.iter_mut().zip(src) {
                *d = *d + s;
            }
        }
    }
    Ok(Tensor::from_raw(out, x.shape()))
}

/// Element offsets addressed by the last axis of an n-d index tensor.
struct NdOffsets {
    offsets: Vec<usize>,
    /// Elements in the trailing block each offset selects.
    block_len: usize,
    /// `index.shape()[..-1] ++ x.shape()[k..]`.
    out_shape: Vec<usize>,
}

fn nd_offsets<T: Element>(x: &Tensor<T>, index: &Tensor<i64>) -> Result<NdOffsets, TensorError> {
    let Some((&depth, batch_shape)) = index.shape().split_last() else {
        return Err(TensorError::RankMismatch {
            expected: 1,
            actual: 0,
        });
    };
    if depth > x.ndim() {
        return Err(TensorError::WrongNumberOfIndices {
            expected: x.ndim(),
            actual: depth,
        });
    }
    let batch: usize = batch_shape.iter().product();
    let mut offsets = Vec::with_capacity(batch);
    for b in 0..batch {
        let row = &index.data()[b * depth..(b + 1) * depth];
        let mut offset = 0;
        for (axis, &i) in row.iter().enumerate() {
            offset += checked_index(i, x.shape()[axis])? * x.strides()[axis];
        }
        offsets.push(offset);
    }
    let mut out_shape = batch_shape.to_vec();
    out_shape.extend_from_slice(&x.shape()[depth..]);
    Ok(NdOffsets {
        offsets,
        block_len: x.shape()[depth..].iter().product(),
        out_shape,
    })
}

/// Gather blocks of `x` addressed by index tuples along `index`'s last axis.
///
/// The result has shape `index.shape()[..-1] ++ x.shape()[k..]` where `k`
/// is the tuple length.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::gather_nd;
///
/// let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
/// let index = Tensor::from_vec(vec![1i64, 0, 0, 1], &[2, 2]).unwrap();
/// assert_eq!(gather_nd(&x, &index).unwrap().data(), &[3.0, 2.0]);
/// ```
pub fn gather_nd<T: Element>(x: &Tensor<T>, index: &Tensor<i64>) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("gather_nd");
    let nd = nd_offsets(x, index)?;
    let mut data = Vec::with_capacity(nd.out_shape.iter().product());
    for offset in nd.offsets {
        data.extend_from_slice(&x.data()[offset..offset + nd.block_len]);
    }
    Ok(Tensor::from_raw(data, &nd.out_shape))
}

/// Add blocks of `updates` into `x` at the index tuples in `index`.
///
/// Duplicate tuples accumulate.
pub fn scatter_nd_add<T: Scalar>(
    x: &Tensor<T>,
    index: &Tensor<i64>,
    updates: &Tensor<T>,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("scatter_nd_add");
    let nd = nd_offsets(x, index)?;
    if updates.shape() != nd.out_shape.as_slice() {
        return Err(TensorError::IncompatibleShapes {
            lhs: nd.out_shape,
            rhs: updates.shape().to_vec(),
        });
    }
    let inner = nd.block_len;
    let mut out = x.to_vec();
    for (b, offset) in nd.offsets.into_iter().enumerate() {
        let src = &updates.data()[b * inner..(b + 1) * inner];
        for (d, &s) in out[offset..offset + inner].iter_mut().zip(src) {
            *d = *d + s;
        }
    }
    Ok(Tensor::from_raw(out, x.shape()))
}

fn check_along_axis<T: Element>(
    x: &Tensor<T>,
    indices: &Tensor<i64>,
    axis: usize,
) -> Result<(), TensorError> {
    if indices.ndim() != x.ndim() {
        return Err(TensorError::RankMismatch {
            expected: x.ndim(),
            actual: indices.ndim(),
        });
    }
    if axis >= x.ndim() {
        return Err(TensorError::InvalidAxis { axis, ndim: x.ndim() });
    }
    let fits = (0..x.ndim()).all(|d| d == axis || indices.shape()[d] <= x.shape()[d]);
    if !fits {
        return Err(TensorError::IncompatibleShapes {
            lhs: x.shape().to_vec(),
            rhs: indices.shape().to_vec(),
        });
    }
    Ok(())
}

/// Visit each position of `indices`, yielding its linear position and the
/// cartesian index into `x` with `axis` replaced by the stored index.
fn for_each_along_axis<T: Element>(
    x: &Tensor<T>,
    indices: &Tensor<i64>,
    axis: usize,
    mut visit: impl FnMut(usize, usize),
) -> Result<(), TensorError> {
    let mut index = vec![0; indices.ndim()];
    let mut target = vec![0; indices.ndim()];
    for (linear, &i) in indices.data().iter().enumerate() {
        target.copy_from_slice(&index);
        target[axis] = checked_index(i, x.shape()[axis])?;
        visit(linear, cartesian_to_linear(&target, x.strides()));
        next_index(&mut index, indices.shape());
    }
    Ok(())
}

/// Write `values[p]` into `x` at `p` with `axis` replaced by `indices[p]`.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::put_along_axis;
///
/// let x = Tensor::<f64>::zeros(&[2, 3]);
/// let indices = Tensor::from_vec(vec![2i64, 0], &[2, 1]).unwrap();
/// let values = Tensor::from_vec(vec![1.0, 2.0], &[2, 1]).unwrap();
/// let out = put_along_axis(&x, &indices, &values, 1).unwrap();
/// assert_eq!(out.data(), &[0.0, 0.0, 1.0, 2.0, 0.0, 0.0]);
/// ```
pub fn put_along_axis<T: Element>(
    x: &Tensor<T>,
    indices: &Tensor<i64>,
    values: &Tensor<T>,
    axis: usize,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("put_along_axis");
    check_along_axis(x, indices, axis)?;
    if values.shape() != indices.shape() {
        return Err(TensorError::IncompatibleShapes {
            lhs: indices.shape().to_vec(),
            rhs: values.shape().to_vec(),
        });
    }
    let mut out = x.to_vec();
    for_each_along_axis(x, indices, axis, |src, dest| out[dest] = values.data()[src])?;
    Ok(Tensor::from_raw(out, x.shape()))
}

/// Read `x` at `p` with `axis` replaced by `indices[p]`.
pub fn take_along_axis<T: Element>(
    x: &Tensor<T>,
    indices: &Tensor<i64>,
    axis: usize,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("take_along_axis");
    check_along_axis(x, indices, axis)?;
    let mut out = vec![T::default(); indices.len()];
    for_each_along_axis(x, indices, axis, |dest, src| out[dest] = x.data()[src])?;
    Ok(Tensor::from_raw(out, indices.shape()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_axis0_rows() {
        let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
        let index = Tensor::from_vec(vec![2i64, 2, 0], &[3]).unwrap();
        let g = gather(&x, &index, 0).unwrap();
        assert_eq!(g.shape(), &[3, 2]);
        assert_eq!(g.data(), &[5.0, 6.0, 5.0, 6.0, 1.0, 2.0]);
    }

    #[test]
    fn test_gather_out_of_range() {
        let x: Tensor<f64> = Tensor::zeros(&[2]);
        let index = Tensor::from_vec(vec![2i64], &[1]).unwrap();
        assert_eq!(
            gather(&x, &index, 0).unwrap_err(),
            TensorError::IndexOutOfBounds {
                index: 2,
                dim_size: 2
            }
        );
    }

    #[test]
    fn test_scatter_rows_additive_clears_target_rows() {
        let x = Tensor::from_vec(vec![1.0, 1.0, 2.0, 2.0], &[2, 2]).unwrap();
        let index = Tensor::from_vec(vec![1i64], &[1]).unwrap();
        let updates = Tensor::from_vec(vec![5.0, 6.0], &[1, 2]).unwrap();
        let out = scatter(&x, &index, &updates, false).unwrap();
        assert_eq!(out.data(), &[1.0, 1.0, 5.0, 6.0]);
    }

    #[test]
    fn test_gather_nd_partial_index() {
        let data: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let x = Tensor::from_vec(data, &[2, 3, 2]).unwrap();
        let index = Tensor::from_vec(vec![1i64, 2, 0, 0], &[2, 2]).unwrap();
        let g = gather_nd(&x, &index).unwrap();
        assert_eq!(g.shape(), &[2, 2]);
        assert_eq!(g.data(), &[10.0, 11.0, 0.0, 1.0]);
    }

    #[test]
    fn test_scatter_nd_add_accumulates_duplicates() {
        let x: Tensor<f64> = Tensor::zeros(&[3]);
        let index = Tensor::from_vec(vec![1i64, 1, 2], &[3, 1]).unwrap();
        let updates = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
        let out = scatter_nd_add(&x, &index, &updates).unwrap();
        assert_eq!(out.data(), &[0.0, 3.0, 3.0]);
    }

    #[test]
    fn test_take_and_put_along_axis() {
        let x = Tensor::from_vec(vec![3.0, 1.0, 2.0, 9.0, 7.0, 8.0], &[2, 3]).unwrap();
        let indices = Tensor::from_vec(vec![0i64, 2, 0, 2], &[2, 2]).unwrap();
        let taken = take_along_axis(&x, &indices, 1).unwrap();
        assert_eq!(taken.data(), &[3.0, 2.0, 9.0, 8.0]);

        let zeros: Tensor<f64> = Tensor::zeros(&[2, 3]);
        let put = put_along_axis(&zeros, &indices, &taken, 1).unwrap();
        assert_eq!(put.data(), &[3.0, 0.0, 2.0, 9.0, 0.0, 8.0]);
    }
}
