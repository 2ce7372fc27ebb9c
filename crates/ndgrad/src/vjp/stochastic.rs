//! Gradient of dropout.

use log::debug;

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::{Element, Scalar};
use crate::tensor::Tensor;
use crate::vjp::attrs::{DropoutAttrs, DropoutMode};
use crate::vjp::slot::GradSlot;

/// Gradient of dropout given the forward keep `mask` (nonzero = kept).
///
/// | mode                 | training                     | inference            |
/// |----------------------|------------------------------|----------------------|
/// | `UpscaleInTrain`     | `grad * mask / (1 - p)`      | `grad`               |
/// | `DowngradeInInfer`   | `grad * mask`                | `grad * (1 - p)`     |
///
/// With `p == 1` in upscale training every unit was dropped and the
/// gradient is zero.
pub fn dropout_vjp<T: Scalar, M: Element>(
    mask: &Tensor<M>,
    grad_output: &Tensor<T>,
    attrs: &DropoutAttrs,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let p = attrs.p;
    if !(0.0..=1.0).contains(&p) {
        return Err(VjpError::unsupported(
            "dropout_vjp",
            format!("drop probability {p} outside [0, 1]"),
        ));
    }
    let masked = || -> Result<Tensor<T>, VjpError> { Ok(ops::mul(grad_output, &ops::cast(mask))?) };
    let grad = match (attrs.mode, attrs.is_test) {
        (DropoutMode::UpscaleInTrain, true) => grad_output.clone(),
        (DropoutMode::DowngradeInInfer, true) => ops::scale(grad_output, 1.0 - p, 0.0),
        (DropoutMode::UpscaleInTrain, false) if p == 1.0 => {
            debug!("dropout_vjp: p = 1, every unit dropped");
            ops::scale(grad_output, 0.0, 0.0)
        }
        (DropoutMode::UpscaleInTrain, false) => ops::scale(&masked()?, 1.0 / (1.0 - p), 0.0),
        (DropoutMode::DowngradeInInfer, false) => masked()?,
    };
    grad_x.write(grad);
    Ok(())
}
