//! Gradients of elementwise math functions.
//!
//! Each rule multiplies the upstream gradient by the local derivative,
//! written in terms of whichever of input or output is cheaper.

use std::f64::consts::FRAC_2_SQRT_PI;

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::{Element, Scalar};
use crate::tensor::Tensor;
use crate::vjp::promote::with_promotion;
use crate::vjp::slot::GradSlot;

/// `d|x| = sign(x) * grad_output`.
pub fn abs_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::mul(grad_output, &ops::sign(x))?);
    }
    Ok(())
}

pub fn sin_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::mul(&ops::cos(x), grad_output)?);
    }
    Ok(())
}

pub fn cos_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::mul(&ops::neg(&ops::sin(x)), grad_output)?);
    }
    Ok(())
}

/// `d exp(x) = out * grad_output`, computed in the promoted type.
pub fn exp_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let grad = with_promotion("exp_vjp", [out, grad_output], |[out, grad_output]| {
            Ok(ops::mul(&grad_output, &out)?)
        })?;
        grad_x.write(grad);
    }
    Ok(())
}

pub fn log_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::div(grad_output, x)?);
    }
    Ok(())
}

/// `d sqrt(x) = 0.5 / out * grad_output`.
pub fn sqrt_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::div(&ops::scale(grad_output, 0.5, 0.0), out)?);
    }
    Ok(())
}

/// `d tanh(x) = (1 - out^2) * grad_output`.
pub fn tanh_vjp<T: Scalar>(
    out: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let local = ops::scale(&ops::mul(out, out)?, -1.0, 1.0);
        grad_x.write(ops::mul(grad_output, &local)?);
    }
    Ok(())
}

/// `d erf(x) = 2/sqrt(pi) * exp(-x^2) * grad_output`.
pub fn erf_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        let local = ops::exp(&ops::scale(&ops::mul(x, x)?, -1.0, 0.0));
        grad_x.write(ops::mul(grad_output, &ops::scale(&local, FRAC_2_SQRT_PI, 0.0))?);
    }
    Ok(())
}

/// `floor` is piecewise constant; its gradient is zero.
pub fn floor_vjp<T: Scalar>(
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::zeros_like(grad_output));
    }
    Ok(())
}

/// Identity: the upstream gradient is passed through without a copy.
pub fn assign_vjp<T: Scalar>(
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(grad_output.clone());
    }
    Ok(())
}

/// Cast the upstream gradient back to the input's element type.
pub fn cast_vjp<T: Element, U: Element>(
    grad_output: &Tensor<U>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::cast(grad_output));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use half::f16;

    fn run<T: Scalar>(rule: impl FnOnce(&mut GradSlot<T>) -> Result<(), VjpError>) -> Tensor<T> {
        let mut slot = GradSlot::requested();
        rule(&mut slot).unwrap();
        slot.into_inner().unwrap()
    }

    #[test]
    fn test_sin_cos() {
        let x = Tensor::from_vec(vec![0.0, 1.0], &[2]).unwrap();
        let g = Tensor::from_vec(vec![2.0, 2.0], &[2]).unwrap();
        let ds = run(|s| sin_vjp(&x, &g, s));
        assert_relative_eq!(ds.data()[0], 2.0);
        assert_relative_eq!(ds.data()[1], 2.0 * 1.0f64.cos());
        let dc = run(|s| cos_vjp(&x, &g, s));
        assert_relative_eq!(dc.data()[1], -2.0 * 1.0f64.sin());
    }

    #[test]
    fn test_abs_at_zero_is_zero() {
        let x = Tensor::from_vec(vec![-2.0, 0.0, 3.0], &[3]).unwrap();
        let g = Tensor::ones(&[3]);
        assert_eq!(run(|s| abs_vjp(&x, &g, s)).data(), &[-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_exp_half_precision() {
        let out = Tensor::from_vec(vec![f16::from_f32(2.5)], &[1]).unwrap();
        let g = Tensor::from_vec(vec![f16::from_f32(2.0)], &[1]).unwrap();
        let dx = run(|s| exp_vjp(&out, &g, s));
        assert_eq!(dx.data(), &[f16::from_f32(5.0)]);
    }

    #[test]
    fn test_sqrt_tanh_log() {
        let g = Tensor::from_vec(vec![1.0], &[1]).unwrap();
        let out = Tensor::from_vec(vec![2.0], &[1]).unwrap();
        assert_relative_eq!(run(|s| sqrt_vjp(&out, &g, s)).data()[0], 0.25);
        let t = Tensor::from_vec(vec![0.5], &[1]).unwrap();
        assert_relative_eq!(run(|s| tanh_vjp(&t, &g, s)).data()[0], 0.75);
        let x = Tensor::from_vec(vec![4.0], &[1]).unwrap();
        assert_relative_eq!(run(|s| log_vjp(&x, &g, s)).data()[0], 0.25);
    }

    #[test]
    fn test_erf_at_zero() {
        let x = Tensor::from_vec(vec![0.0], &[1]).unwrap();
        let g = Tensor::from_vec(vec![1.0], &[1]).unwrap();
        assert_relative_eq!(run(|s| erf_vjp(&x, &g, s)).data()[0], FRAC_2_SQRT_PI);
    }

    #[test]
    fn test_floor_assign_cast() {
        let g = Tensor::from_vec(vec![1.5f32, -2.0], &[2]).unwrap();
        assert_eq!(run(|s| floor_vjp(&g, s)).data(), &[0.0, 0.0]);

        let passed = run(|s| assign_vjp(&g, s));
        assert!(passed.shares_storage_with(&g));

        let widened: Tensor<f64> = run(|s| cast_vjp(&g, s));
        assert_eq!(widened.data(), &[1.5, -2.0]);
    }

    #[test]
    fn test_skipped_slot_stays_empty() {
        let x = Tensor::from_vec(vec![1.0], &[1]).unwrap();
        let mut slot = GradSlot::skipped();
        sin_vjp(&x, &x, &mut slot).unwrap();
        assert!(!slot.is_written());
    }
}
