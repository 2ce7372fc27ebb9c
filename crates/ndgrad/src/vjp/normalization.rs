//! Gradients of layer and instance normalization.
//!
//! Both rules take the statistics saved by the forward pass and compute in
//! the promoted type of `T`.

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::vjp::attrs::LayerNormAttrs;
use crate::vjp::broadcast::normalize_axis;
use crate::vjp::promote::{demote, note_promotion, promote};
use crate::vjp::slot::{GradSlot, any_requested};

/// Promote `t` and view it with `shape`.
fn lift<T: Scalar>(
    op: &'static str,
    t: &Tensor<T>,
    shape: &[usize],
) -> Result<Tensor<T::Compute>, VjpError> {
    let len: usize = shape.iter().product();
    if t.len() != len {
        return Err(VjpError::ShapeMismatch {
            op,
            expected: shape.to_vec(),
            actual: t.shape().to_vec(),
        });
    }
    Ok(ops::reshape(&promote(t), shape)?)
}

/// Gradient of layer normalization.
///
/// `x` is viewed as `[batch, features]` split at `begin_norm_axis`; `mean`
/// and `variance` hold one value per batch row and `scale`/`bias` one value
/// per feature. With `xhat = (x - mean) / sqrt(variance + epsilon)`:
///
/// ```text
/// grad_x     = inv_std * (gs - mean(gs) - xhat * mean(gs * xhat))   gs = grad_output * scale
/// grad_scale = sum over batch of grad_output * xhat
/// grad_bias  = sum over batch of grad_output
/// ```
///
/// `grad_scale` and `grad_bias` are left unwritten when the matching
/// operand is absent.
#[allow(clippy::too_many_arguments)]
pub fn layer_norm_vjp<T: Scalar>(
    x: &Tensor<T>,
    mean: &Tensor<T>,
    variance: &Tensor<T>,
    scale: Option<&Tensor<T>>,
    bias: Option<&Tensor<T>>,
    grad_output: &Tensor<T>,
    attrs: &LayerNormAttrs,
    grad_x: &mut GradSlot<T>,
    grad_scale: &mut GradSlot<T>,
    grad_bias: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    const OP: &str = "layer_norm_vjp";
    if !any_requested(&[&*grad_x, &*grad_scale, &*grad_bias]) {
        return Ok(());
    }
    if grad_output.shape() != x.shape() {
        return Err(VjpError::ShapeMismatch {
            op: OP,
            expected: x.shape().to_vec(),
            actual: grad_output.shape().to_vec(),
        });
    }
    let begin = match attrs.begin_norm_axis {
        axis if axis == x.ndim() as i64 => x.ndim(),
        axis => normalize_axis(OP, axis, x.ndim())?,
    };
    let batch: usize = x.shape()[..begin].iter().product();
    let features: usize = x.shape()[begin..].iter().product();
    note_promotion::<T>(OP);

    let x_c = lift(OP, x, &[batch, features])?;
    let grad_c = lift(OP, grad_output, &[batch, features])?;
    let mean_c = lift(OP, mean, &[batch, 1])?;
    let var_c = lift(OP, variance, &[batch, 1])?;
    let inv_std = ops::powf(&ops::scale(&var_c, 1.0, attrs.epsilon), -0.5);
    let x_hat = ops::mul(&ops::sub(&x_c, &mean_c)?, &inv_std)?;

    if grad_x.is_requested() {
        let scaled = match scale {
            Some(s) => ops::mul(&grad_c, &lift(OP, s, &[1, features])?)?,
            None => grad_c.clone(),
        };
        let inv_n = 1.0 / features as f64;
        let mean_g = ops::scale(&ops::sum(&scaled, &[1], true)?, inv_n, 0.0);
        let mean_gx = ops::scale(&ops::sum(&ops::mul(&scaled, &x_hat)?, &[1], true)?, inv_n, 0.0);
        let centered = ops::sub(&ops::sub(&scaled, &mean_g)?, &ops::mul(&x_hat, &mean_gx)?)?;
        let dx = ops::mul(&inv_std, &centered)?;
        grad_x.write(demote::<T>(ops::reshape(&dx, x.shape())?));
    }
    if let Some(s) = scale.filter(|_| grad_scale.is_requested()) {
        let ds = ops::sum(&ops::mul(&grad_c, &x_hat)?, &[0], false)?;
        grad_scale.write(demote::<T>(ops::reshape(&ds, s.shape())?));
    }
    if let Some(b) = bias.filter(|_| grad_bias.is_requested()) {
        let db = ops::sum(&grad_c, &[0], false)?;
        grad_bias.write(demote::<T>(ops::reshape(&db, b.shape())?));
    }
    Ok(())
}

/// Gradient of instance normalization over an `[N, C, spatial...]` input.
///
/// `saved_mean` and `saved_inv_std` hold one value per `(n, c)` pair and are
/// tiled across the spatial axes. A missing `scale` acts as all ones. The
/// scale and bias gradients have shape `[C]` and are written whenever
/// requested. Unlike `layer_norm_vjp`, this includes a `None` scale.
#[allow(clippy::too_many_arguments)]
pub fn instance_norm_vjp<T: Scalar>(
    x: &Tensor<T>,
    scale: Option<&Tensor<T>>,
    saved_mean: &Tensor<T>,
    saved_inv_std: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
    grad_scale: &mut GradSlot<T>,
    grad_bias: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    const OP: &str = "instance_norm_vjp";
    if !any_requested(&[&*grad_x, &*grad_scale, &*grad_bias]) {
        return Ok(());
    }
    let rank = x.ndim();
    if rank < 2 || grad_output.shape() != x.shape() {
        return Err(VjpError::ShapeMismatch {
            op: OP,
            expected: x.shape().to_vec(),
            actual: grad_output.shape().to_vec(),
        });
    }
    let (n, c) = (x.shape()[0], x.shape()[1]);
    let spatial: usize = x.shape()[2..].iter().product();
    note_promotion::<T>(OP);

    // [n, c, 1, ..] statistics tiled by [1, 1, h, w, ..]
    let mut stat_shape = vec![1; rank];
    stat_shape[0] = n;
    stat_shape[1] = c;
    let mut spatial_repeats = x.shape().to_vec();
    spatial_repeats[0] = 1;
    spatial_repeats[1] = 1;
    let spatial_axes: Vec<usize> = (2..rank).collect();
    let outer_axes: Vec<usize> = std::iter::once(0).chain(2..rank).collect();

    let x_c = promote(x);
    let grad_c = promote(grad_output);
    let mean = ops::tile(&lift(OP, saved_mean, &stat_shape)?, &spatial_repeats)?;
    let inv_std = ops::tile(&lift(OP, saved_inv_std, &stat_shape)?, &spatial_repeats)?;
    let x_hat = ops::mul(&ops::sub(&x_c, &mean)?, &inv_std)?;

    if grad_x.is_requested() {
        let inv_n = 1.0 / spatial as f64;
        let mean_g = ops::scale(&ops::sum(&grad_c, &spatial_axes, true)?, inv_n, 0.0);
        let gx_sum = ops::sum(&ops::mul(&grad_c, &x_hat)?, &spatial_axes, true)?;
        let mean_gx = ops::scale(&gx_sum, inv_n, 0.0);
        let centered = ops::sub(&ops::sub(&grad_c, &mean_g)?, &ops::mul(&x_hat, &mean_gx)?)?;
        let mut dx = ops::mul(&inv_std, &centered)?;
        if let Some(s) = scale {
            let mut channel_shape = vec![1; rank];
            channel_shape[1] = c;
            let mut channel_repeats = x.shape().to_vec();
            channel_repeats[1] = 1;
            let s = ops::tile(&lift(OP, s, &channel_shape)?, &channel_repeats)?;
            dx = ops::mul(&dx, &s)?;
        }
        grad_x.write(demote::<T>(dx));
    }
    if grad_scale.is_requested() {
        let ds = ops::sum(&ops::mul(&grad_c, &x_hat)?, &outer_axes, false)?;
        grad_scale.write(demote::<T>(ds));
    }
    if grad_bias.is_requested() {
        let db = ops::sum(&grad_c, &outer_axes, false)?;
        grad_bias.write(demote::<T>(db));
    }
    Ok(())
}
