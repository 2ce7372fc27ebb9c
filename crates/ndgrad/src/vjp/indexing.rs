//! Gradients of gather, scatter and top-k.
//!
//! Gathers scatter their gradient back additively, so positions read more
//! than once accumulate every contribution.

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::vjp::broadcast::normalize_axis;
use crate::vjp::slot::GradSlot;

/// Scatter-add the gradient back to the gathered positions along `axis`.
///
/// The gather axis is moved to the front, scattered there, and moved back.
/// A 0-D index dropped the gather axis from the output, so it is restored
/// with size 1 before scattering. A rank-0 `x` takes the gradient as is.
pub fn gather_vjp<T: Scalar>(
    x: &Tensor<T>,
    index: &Tensor<i64>,
    grad_output: &Tensor<T>,
    axis: i64,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    if x.ndim() == 0 {
        grad_x.write(ops::reshape(grad_output, x.shape())?);
        return Ok(());
    }
    let axis = normalize_axis("gather_vjp", axis, x.ndim())?;
    let restored;
    let grad_output = if index.ndim() == 0 && grad_output.ndim() + 1 == x.ndim() {
        let mut shape = grad_output.shape().to_vec();
        shape.insert(axis, 1);
        restored = ops::reshape(grad_output, &shape)?;
        &restored
    } else {
        grad_output
    };
    let zeros_at = |shape: &[usize]| ops::full::<T>(shape, 0.0);
    if axis == 0 {
        grad_x.write(ops::scatter(&zeros_at(x.shape()), index, grad_output, false)?);
        return Ok(());
    }

    let perm: Vec<usize> = std::iter::once(axis)
        .chain((0..x.ndim()).filter(|&a| a != axis))
        .collect();
    let front_shape: Vec<usize> = perm.iter().map(|&a| x.shape()[a]).collect();
    let grad = ops::permutedims(grad_output, &perm)?;
    let grad = ops::scatter(&zeros_at(&front_shape), index, &grad, false)?;
    grad_x.write(ops::permutedims(&grad, &ops::inverse_permutation(&perm))?);
    Ok(())
}

/// Scatter-add the gradient back to the gathered blocks.
pub fn gather_nd_vjp<T: Scalar>(
    x: &Tensor<T>,
    index: &Tensor<i64>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let zeros = ops::zeros_like(x);
        grad_x.write(ops::scatter_nd_add(&zeros, index, grad_output)?);
    }
    Ok(())
}

/// Gradient of a row scatter along axis 0.
///
/// Rows of `x` that were written receive zero; `updates` reads its gradient
/// from the rows it was written to.
pub fn scatter_vjp<T: Scalar>(
    index: &Tensor<i64>,
    updates: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_updates: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let zeros = ops::zeros_like(updates);
        grad_x.write(ops::scatter(grad_output, index, &zeros, false)?);
    }
    if grad_updates.is_requested() {
        grad_updates.write(ops::gather(grad_output, index, 0)?);
    }
    Ok(())
}

/// `x` passes the gradient through unchanged; `updates` gathers its blocks.
pub fn scatter_nd_add_vjp<T: Scalar>(
    index: &Tensor<i64>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_updates: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(grad_output.clone());
    }
    if grad_updates.is_requested() {
        grad_updates.write(ops::gather_nd(grad_output, index)?);
    }
    Ok(())
}

/// Place the gradients of the selected values at their source positions.
///
/// `indices` are the positions returned by the forward top-k along `axis`.
pub fn topk_vjp<T: Scalar>(
    x: &Tensor<T>,
    indices: &Tensor<i64>,
    grad_output: &Tensor<T>,
    axis: i64,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    if x.ndim() == 0 {
        grad_x.write(grad_output.clone());
        return Ok(());
    }
    let axis = normalize_axis("topk_vjp", axis, x.ndim())?;
    let zeros = ops::zeros_like(x);
    grad_x.write(ops::put_along_axis(&zeros, indices, grad_output, axis)?);
    Ok(())
}
