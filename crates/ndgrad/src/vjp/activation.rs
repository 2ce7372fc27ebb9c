//! Gradients of activation functions and softmax.

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_2_SQRT_PI, SQRT_2};

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::vjp::broadcast::normalize_axis;
use crate::vjp::promote::with_promotion;
use crate::vjp::slot::GradSlot;

const GELU_KAPPA: f64 = 0.044715;

/// `grad_x = grad_output` where `out > 0`, else 0.
pub fn relu_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let zero = ops::full(&[], 0.0);
        let mask = ops::greater_than(out, &zero)?;
        grad_x.write(ops::where_cond(&mask, grad_output, &zero)?);
    }
    Ok(())
}

/// `grad_x = grad_output` where `out > 0`, else `negative_slope * grad_output`.
pub fn leaky_relu_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    negative_slope: f64,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let mask = ops::greater_than(out, &ops::full(&[], 0.0))?;
        let leaked = ops::scale(grad_output, negative_slope, 0.0);
        grad_x.write(ops::where_cond(&mask, grad_output, &leaked)?);
    }
    Ok(())
}

/// Piecewise: 0 below -3, `x/3 + 1/2` on `[-3, 3]`, 1 above 3.
pub fn hardswish_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let ramp = ops::mul(grad_output, &ops::scale(x, 1.0 / 3.0, 0.5))?;
        let upper = ops::less_equal(x, &ops::full(&[], 3.0))?;
        let grad = ops::where_cond(&upper, &ramp, grad_output)?;
        let lower = ops::less_than(x, &ops::full(&[], -3.0))?;
        grad_x.write(ops::where_cond(&lower, &ops::full(&[], 0.0), &grad)?);
    }
    Ok(())
}

/// `grad_x = grad_output * out * (1 - out)`.
pub fn sigmoid_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let local = ops::mul(out, &ops::scale(out, -1.0, 1.0))?;
        grad_x.write(ops::mul(grad_output, &local)?);
    }
    Ok(())
}

/// `grad_x = grad_output * sigmoid(x) * (1 + x - out)`, where `out = x * sigmoid(x)`.
pub fn silu_vjp<T: Scalar>(
    x: &Tensor<T>,
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let grad = with_promotion("silu_vjp", [x, out, grad_output], |[x, out, grad_output]| {
        let sig = ops::sigmoid(&x);
        let local = ops::mul(&sig, &ops::scale(&ops::sub(&x, &out)?, 1.0, 1.0))?;
        Ok(ops::mul(&grad_output, &local)?)
    })?;
    grad_x.write(grad);
    Ok(())
}

/// Gradient of GELU.
///
/// With `approximate` the tanh form
/// `0.5 x (1 + tanh(sqrt(2/pi) (x + 0.044715 x^3)))` is differentiated;
/// otherwise the exact `x * Phi(x)`, giving `Phi(x) + x * phi(x)`.
pub fn gelu_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    approximate: bool,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let grad = with_promotion("gelu_vjp", [x, grad_output], |[x, grad_output]| {
        let local = if approximate {
            gelu_tanh_derivative(&x)?
        } else {
            gelu_exact_derivative(&x)?
        };
        Ok(ops::mul(&grad_output, &local)?)
    })?;
    grad_x.write(grad);
    Ok(())
}

fn gelu_tanh_derivative<C: Scalar>(x: &Tensor<C>) -> Result<Tensor<C>, VjpError> {
    // sqrt(2 / pi)
    let beta = SQRT_2 * FRAC_2_SQRT_PI * 0.5;
    let x_sq = ops::mul(x, x)?;
    let x_cube = ops::mul(&x_sq, x)?;
    let inner = ops::scale(&ops::add(x, &ops::scale(&x_cube, GELU_KAPPA, 0.0))?, beta, 0.0);
    let t = ops::tanh(&inner);

    let left = ops::scale(x, 0.5, 0.0);
    let left_derivative = ops::scale(&t, 0.5, 0.5);
    let tanh_derivative = ops::scale(&ops::mul(&t, &t)?, -1.0, 1.0);
    let inner_derivative = ops::scale(&x_sq, beta * 3.0 * GELU_KAPPA, beta);
    let right_derivative = ops::mul(&ops::mul(&left, &tanh_derivative)?, &inner_derivative)?;
    Ok(ops::add(&left_derivative, &right_derivative)?)
}

fn gelu_exact_derivative<C: Scalar>(x: &Tensor<C>) -> Result<Tensor<C>, VjpError> {
    // 1 / sqrt(2 pi)
    let pdf_norm = FRAC_2_SQRT_PI * FRAC_1_SQRT_2 * 0.5;
    let cdf = ops::scale(&ops::erf(&ops::scale(x, FRAC_1_SQRT_2, 0.0)), 0.5, 0.5);
    let pdf = ops::scale(&ops::exp(&ops::scale(&ops::mul(x, x)?, -0.5, 0.0)), pdf_norm, 0.0);
    Ok(ops::add(&cdf, &ops::mul(x, &pdf)?)?)
}

/// `grad_x = out * (grad_output - sum(grad_output * out, axis))`.
///
/// A rank-0 softmax is constant 1, so its gradient is zero.
pub fn softmax_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    axis: i64,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    if grad_output.ndim() == 0 {
        grad_x.write(ops::scale(grad_output, 0.0, 0.0));
        return Ok(());
    }
    let axis = normalize_axis("softmax_vjp", axis, out.ndim())?;
    let dot = ops::sum(&ops::mul(grad_output, out)?, &[axis], true)?;
    grad_x.write(ops::mul(out, &ops::sub(grad_output, &dot)?)?);
    Ok(())
}
