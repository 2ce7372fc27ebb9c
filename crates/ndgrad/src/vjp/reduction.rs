//! Gradients of axis reductions and the cumulative sum.

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::vjp::attrs::{CumsumAttrs, ReduceAttrs};
use crate::vjp::broadcast::{normalize_axis, restore_reduced_axes};
use crate::vjp::slot::GradSlot;

/// Broadcast a reduced tensor back to `x_shape`.
///
/// Without `keepdim` the reduced axes are first reinserted as size 1. Rank 0
/// and rank 1 inputs broadcast directly.
fn expand_reduced<T: Scalar>(
    op: &'static str,
    reduced: &Tensor<T>,
    x_shape: &[usize],
    attrs: &ReduceAttrs,
) -> Result<Tensor<T>, VjpError> {
    let rank = x_shape.len();
    // Axis 0 (or -1) still names the lone axis of a rank-0 input.
    let axes = attrs.resolve(op, rank.max(1))?;
    let kept = if rank <= 1 || attrs.keepdim {
        reduced.clone()
    } else {
        ops::reshape(reduced, &restore_reduced_axes(&axes, reduced.shape()))?
    };
    Ok(ops::expand(&kept, x_shape)?)
}

/// Every input element receives the upstream gradient of its reduction.
pub fn sum_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    attrs: &ReduceAttrs,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(expand_reduced("sum_vjp", grad_output, x.shape(), attrs)?);
    }
    Ok(())
}

/// Route the gradient to every element equal to the maximum.
///
/// Tied maxima each receive the full upstream gradient.
pub fn max_vjp<T: Scalar>(
    x: &Tensor<T>,
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    attrs: &ReduceAttrs,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let grad = expand_reduced("max_vjp", grad_output, x.shape(), attrs)?;
    let out = expand_reduced("max_vjp", out, x.shape(), attrs)?;
    let mask = ops::equal(x, &out)?;
    grad_x.write(ops::where_cond(&mask, &grad, &ops::full(&[], 0.0))?);
    Ok(())
}

/// `grad_x = grad_output * out / x`.
///
/// Zeros in `x` produce non-finite gradients.
pub fn prod_vjp<T: Scalar>(
    x: &Tensor<T>,
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    attrs: &ReduceAttrs,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let grad = expand_reduced("prod_vjp", grad_output, x.shape(), attrs)?;
    let out = expand_reduced("prod_vjp", out, x.shape(), attrs)?;
    grad_x.write(ops::div(&ops::mul(&grad, &out)?, x)?);
    Ok(())
}

/// The adjoint of a cumulative sum is the cumulative sum in the opposite direction.
pub fn cumsum_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    attrs: &CumsumAttrs,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    // A rank-0 gradient has no axis to resolve; it scans as one element.
    let axis = match attrs.axis {
        Some(axis) if !attrs.flatten && grad_output.ndim() > 0 => {
            Some(normalize_axis("cumsum_vjp", axis, grad_output.ndim())?)
        }
        _ => None,
    };
    let grad = ops::cumsum(grad_output, axis, attrs.exclusive, !attrs.reverse)?;
    let grad = if grad.shape() == x.shape() {
        grad
    } else {
        ops::reshape(&grad, x.shape())?
    };
    grad_x.write(grad);
    Ok(())
}
