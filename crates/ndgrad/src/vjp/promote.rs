//! Precision promotion around rule bodies.
//!
//! Each [`Scalar`] names the type its gradients are computed in
//! (`Scalar::Compute`). Wrapping a body in [`with_promotion`] lifts the
//! inputs into that type, runs the body and lowers the result again; for
//! types that compute in themselves both steps are free.

use log::debug;

use crate::error::VjpError;
use crate::scalar::{Element, Scalar};
use crate::tensor::Tensor;

/// Lift a tensor into its compute type.
pub fn promote<T: Scalar>(tensor: &Tensor<T>) -> Tensor<T::Compute> {
    T::promote(tensor)
}

/// Lower a compute-type tensor back to `T`.
pub fn demote<T: Scalar>(tensor: Tensor<T::Compute>) -> Tensor<T> {
    T::demote(tensor)
}

pub(crate) fn note_promotion<T: Scalar>(op: &'static str) {
    if T::DTYPE.is_reduced_precision() {
        debug!("{op}: computing {} gradient in {}", T::DTYPE, <T::Compute as Element>::DTYPE);
    }
}

/// Run `body` on `inputs` lifted to `T::Compute` and lower the result to `T`.
///
/// # Example
///
/// ```
/// use half::f16;
/// use ndgrad::{Tensor, operations as ops};
/// use ndgrad::vjp::with_promotion;
///
/// let x = Tensor::from_vec(vec![f16::from_f32(2.0)], &[1]).unwrap();
/// let y = Tensor::from_vec(vec![f16::from_f32(3.0)], &[1]).unwrap();
/// let z = with_promotion("mul", [&x, &y], |[x, y]| Ok(ops::mul(&x, &y)?)).unwrap();
/// assert_eq!(z.data(), &[f16::from_f32(6.0)]);
/// ```
pub fn with_promotion<T, const N: usize, F>(
    op: &'static str,
    inputs: [&Tensor<T>; N],
    body: F,
) -> Result<Tensor<T>, VjpError>
where
    T: Scalar,
    F: FnOnce([Tensor<T::Compute>; N]) -> Result<Tensor<T::Compute>, VjpError>,
{
    note_promotion::<T>(op);
    let lifted = inputs.map(|t| T::promote(t));
    Ok(T::demote(body(lifted)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations as ops;
    use crate::profiling;
    use half::bf16;

    #[test]
    fn test_identity_promotion_is_free() {
        let x = Tensor::from_vec(vec![1.0f64, 2.0], &[2]).unwrap();
        let (out, tally) = profiling::record(|| with_promotion("id", [&x], |[x]| Ok(x)));
        let out = out.unwrap();
        assert!(out.shares_storage_with(&x));
        assert!(tally.is_empty());
    }

    #[test]
    fn test_reduced_precision_body_runs_in_f32() {
        let x = Tensor::from_vec(vec![bf16::from_f32(1.0)], &[1]).unwrap();
        let (out, tally) = profiling::record(|| {
            with_promotion("exp", [&x], |[x]| {
                assert_eq!(x.dtype(), crate::DType::F32);
                Ok(ops::exp(&x))
            })
        });
        assert_eq!(out.unwrap().dtype(), crate::DType::BF16);
        assert_eq!(tally.count("cast"), 2);
    }
}
