//! Gradients of broadcasting binary operations.
//!
//! Every rule computes its operand gradients at the broadcast result shape
//! and sums them back down with [`reduce_to_shape`], which aliases the
//! gradient when no reduction is needed.

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::vjp::broadcast::reduce_to_shape;
use crate::vjp::slot::{GradSlot, any_requested};

pub fn add_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(reduce_to_shape("add_vjp", grad_output.clone(), x.shape())?);
    }
    if grad_y.is_requested() {
        grad_y.write(reduce_to_shape("add_vjp", grad_output.clone(), y.shape())?);
    }
    Ok(())
}

pub fn subtract_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(reduce_to_shape("subtract_vjp", grad_output.clone(), x.shape())?);
    }
    if grad_y.is_requested() {
        grad_y.write(reduce_to_shape("subtract_vjp", ops::neg(grad_output), y.shape())?);
    }
    Ok(())
}

/// `grad_x = grad_output * y`, `grad_y = grad_output * x`.
pub fn multiply_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let grad = ops::mul(grad_output, y)?;
        grad_x.write(reduce_to_shape("multiply_vjp", grad, x.shape())?);
    }
    if grad_y.is_requested() {
        let grad = ops::mul(grad_output, x)?;
        grad_y.write(reduce_to_shape("multiply_vjp", grad, y.shape())?);
    }
    Ok(())
}

/// `grad_x = grad_output / y`, `grad_y = -grad_output * x / y^2`.
pub fn divide_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let grad = ops::div(grad_output, y)?;
        grad_x.write(reduce_to_shape("divide_vjp", grad, x.shape())?);
    }
    if grad_y.is_requested() {
        let local = ops::neg(&ops::div(x, &ops::mul(y, y)?)?);
        let grad = ops::mul(grad_output, &local)?;
        grad_y.write(reduce_to_shape("divide_vjp", grad, y.shape())?);
    }
    Ok(())
}

/// Gradient of `x^y` with a tensor exponent.
///
/// `grad_x = y * x^(y-1) * grad_output`, `grad_y = ln(x) * x^y * grad_output`.
pub fn elementwise_pow_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let local = ops::mul(y, &ops::pow(x, &ops::scale(y, 1.0, -1.0))?)?;
        let grad = ops::mul(grad_output, &local)?;
        grad_x.write(reduce_to_shape("elementwise_pow_vjp", grad, x.shape())?);
    }
    if grad_y.is_requested() {
        let local = ops::mul(&ops::log(x), &ops::pow(x, y)?)?;
        let grad = ops::mul(grad_output, &local)?;
        grad_y.write(reduce_to_shape("elementwise_pow_vjp", grad, y.shape())?);
    }
    Ok(())
}

/// Route `grad_output` to `x` where `x > y` and to `y` where `x <= y`.
///
/// Ties go to `y`.
pub fn maximum_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !any_requested(&[&*grad_x, &*grad_y]) {
        return Ok(());
    }
    let zero = ops::full(&[], 0.0);
    if grad_x.is_requested() {
        let grad = ops::where_cond(&ops::greater_than(x, y)?, grad_output, &zero)?;
        grad_x.write(reduce_to_shape("maximum_vjp", grad, x.shape())?);
    }
    if grad_y.is_requested() {
        let grad = ops::where_cond(&ops::less_equal(x, y)?, grad_output, &zero)?;
        grad_y.write(reduce_to_shape("maximum_vjp", grad, y.shape())?);
    }
    Ok(())
}

/// Route `grad_output` to `x` where `x < y` and to `y` where `x >= y`.
///
/// Ties go to `y`.
pub fn minimum_vjp<T: Scalar>(
    x: &Tensor<T>,
    y: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_y: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !any_requested(&[&*grad_x, &*grad_y]) {
        return Ok(());
    }
    let zero = ops::full(&[], 0.0);
    if grad_x.is_requested() {
        let grad = ops::where_cond(&ops::less_than(x, y)?, grad_output, &zero)?;
        grad_x.write(reduce_to_shape("minimum_vjp", grad, x.shape())?);
    }
    if grad_y.is_requested() {
        let grad = ops::where_cond(&ops::greater_equal(x, y)?, grad_output, &zero)?;
        grad_y.write(reduce_to_shape("minimum_vjp", grad, y.shape())?);
    }
    Ok(())
}
