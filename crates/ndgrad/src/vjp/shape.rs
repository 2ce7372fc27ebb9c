//! Gradients of layout and shape operations.
//!
//! These rules only move or sum the upstream gradient; none of them needs
//! the forward input's values.

use std::ops::Range;

use crate::error::VjpError;
use crate::operations::{self as ops, left_pad};
use crate::scalar::Scalar;
use crate::tensor::Tensor;
use crate::vjp::attrs::SliceAttrs;
use crate::vjp::broadcast::{normalize_axes, normalize_axis, reduce_to_shape};
use crate::vjp::slot::GradSlot;

/// Reshape the gradient back to `x_shape` (a view, no copy).
pub fn reshape_vjp<T: Scalar>(
    x_shape: &[usize],
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(ops::reshape(grad_output, x_shape)?);
    }
    Ok(())
}

/// Permute the gradient by the inverse of `perm`.
pub fn transpose_vjp<T: Scalar>(
    grad_output: &Tensor<T>,
    perm: &[i64],
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let rank = grad_output.ndim();
    let resolved = perm
        .iter()
        .map(|&axis| normalize_axis("transpose_vjp", axis, rank))
        .collect::<Result<Vec<_>, _>>()?;
    if resolved.len() != rank || normalize_axes("transpose_vjp", perm, rank)?.len() != rank {
        return Err(VjpError::unsupported(
            "transpose_vjp",
            format!("{perm:?} is not a permutation of {rank} axes"),
        ));
    }
    grad_x.write(ops::permutedims(grad_output, &ops::inverse_permutation(&resolved))?);
    Ok(())
}

/// Sum the gradient over the broadcast axes.
pub fn expand_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if grad_x.is_requested() {
        grad_x.write(reduce_to_shape("expand_vjp", grad_output.clone(), x.shape())?);
    }
    Ok(())
}

/// Sum the gradient over the tile repetitions.
///
/// Each output axis of size `r * d` is split into `[r, d]` and the `r`
/// axes are summed away.
pub fn tile_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    repeat_times: &[usize],
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let rank = x.ndim().max(repeat_times.len());
    let dims = left_pad(x.shape(), rank);
    let repeats = left_pad(repeat_times, rank);
    let split: Vec<usize> = repeats.iter().zip(&dims).flat_map(|(&r, &d)| [r, d]).collect();
    let repeat_axes: Vec<usize> = (0..rank).map(|axis| 2 * axis).collect();

    let grad = ops::reshape(grad_output, &split)?;
    let grad = ops::sum(&grad, &repeat_axes, false)?;
    grad_x.write(ops::reshape(&grad, x.shape())?);
    Ok(())
}

/// Embed the gradient back into a zero tensor of the input's shape.
pub fn slice_vjp<T: Scalar>(
    x: &Tensor<T>,
    grad_output: &Tensor<T>,
    attrs: &SliceAttrs,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    const OP: &str = "slice_vjp";
    if !grad_x.is_requested() {
        return Ok(());
    }
    let in_dims = x.shape();
    let rank = in_dims.len();
    if attrs.axes.len() != attrs.starts.len() {
        return Err(VjpError::unsupported(
            OP,
            format!("{} axes but {} starts", attrs.axes.len(), attrs.starts.len()),
        ));
    }

    let grad = if attrs.decrease_axis.is_empty() {
        grad_output.clone()
    } else {
        let mut kept = grad_output.shape().to_vec();
        for axis in normalize_axes(OP, &attrs.decrease_axis, rank)? {
            kept.insert(axis.min(kept.len()), 1);
        }
        ops::reshape(grad_output, &kept)?
    };
    if grad.ndim() != rank {
        return Err(VjpError::ShapeMismatch {
            op: OP,
            expected: in_dims.to_vec(),
            actual: grad.shape().to_vec(),
        });
    }

    let mut offsets = vec![0usize; rank];
    for (&axis, &start) in attrs.axes.iter().zip(&attrs.starts) {
        let axis = normalize_axis(OP, axis, rank)?;
        let size = in_dims[axis] as i64;
        let start = if start < 0 { start + size } else { start };
        offsets[axis] = start.clamp(0, size) as usize;
    }

    let mut paddings = Vec::with_capacity(rank);
    for ((&dim, &out), &offset) in in_dims.iter().zip(grad.shape()).zip(&offsets) {
        let Some(after) = dim.checked_sub(out + offset) else {
            return Err(VjpError::ShapeMismatch {
                op: OP,
                expected: in_dims.to_vec(),
                actual: grad.shape().to_vec(),
            });
        };
        paddings.push((offset, after));
    }
    grad_x.write(ops::pad(&grad, &paddings, 0.0)?);
    Ok(())
}

/// Crop the padding off the gradient.
pub fn pad_vjp<T: Scalar>(
    grad_output: &Tensor<T>,
    paddings: &[(usize, usize)],
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    if paddings.len() != grad_output.ndim() {
        return Err(VjpError::unsupported(
            "pad_vjp",
            format!("{} paddings for rank {}", paddings.len(), grad_output.ndim()),
        ));
    }
    let mut ranges: Vec<Range<usize>> = Vec::with_capacity(paddings.len());
    for (&dim, &(before, after)) in grad_output.shape().iter().zip(paddings) {
        if before + after > dim {
            return Err(VjpError::unsupported(
                "pad_vjp",
                format!("padding ({before}, {after}) exceeds padded size {dim}"),
            ));
        }
        ranges.push(before..dim - after);
    }
    grad_x.write(ops::slice(grad_output, &ranges)?);
    Ok(())
}

/// Roll the gradient back by the negated shifts.
///
/// An empty `axes` rolls the flattened tensor.
pub fn roll_vjp<T: Scalar>(
    grad_output: &Tensor<T>,
    shifts: &[i64],
    axes: &[i64],
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let axes = axes
        .iter()
        .map(|&axis| normalize_axis("roll_vjp", axis, grad_output.ndim()))
        .collect::<Result<Vec<_>, _>>()?;
    let shifts: Vec<i64> = shifts.iter().map(|&s| -s).collect();
    grad_x.write(ops::roll(grad_output, &shifts, &axes)?);
    Ok(())
}

/// Concatenate the per-piece gradients of a split.
pub fn split_vjp<T: Scalar>(
    grad_outputs: &[Tensor<T>],
    axis: i64,
    grad_x: &mut GradSlot<T>,
) -> Result<(), VjpError> {
    if !grad_x.is_requested() {
        return Ok(());
    }
    let Some(first) = grad_outputs.first() else {
        return Err(VjpError::unsupported("split_vjp", "no output gradients"));
    };
    let axis = normalize_axis("split_vjp", axis, first.ndim())?;
    let pieces: Vec<&Tensor<T>> = grad_outputs.iter().collect();
    grad_x.write(ops::concat(&pieces, axis)?);
    Ok(())
}

/// Split the gradient of a concatenation back into one piece per input.
///
/// `grad_xs` must hold one slot per input, in input order.
pub fn concat_vjp<T: Scalar>(
    xs: &[&Tensor<T>],
    grad_output: &Tensor<T>,
    axis: i64,
    grad_xs: &mut [GradSlot<T>],
) -> Result<(), VjpError> {
    if grad_xs.len() != xs.len() {
        return Err(VjpError::unsupported(
            "concat_vjp",
            format!("{} inputs but {} gradient slots", xs.len(), grad_xs.len()),
        ));
    }
    if !grad_xs.iter().any(GradSlot::is_requested) {
        return Ok(());
    }
    let axis = normalize_axis("concat_vjp", axis, grad_output.ndim())?;
    let mut sections = Vec::with_capacity(xs.len());
    for x in xs {
        let Some(&size) = x.shape().get(axis) else {
            return Err(VjpError::ShapeMismatch {
                op: "concat_vjp",
                expected: grad_output.shape().to_vec(),
                actual: x.shape().to_vec(),
            });
        };
        sections.push(size);
    }
    let pieces = ops::split(grad_output, &sections, axis)?;
    for (slot, piece) in grad_xs.iter_mut().zip(pieces) {
        if slot.is_requested() {
            slot.write(piece);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiling;

    fn requested(rule: impl FnOnce(&mut GradSlot<f64>) -> Result<(), VjpError>) -> Tensor<f64> {
        let mut slot = GradSlot::requested();
        rule(&mut slot).unwrap();
        slot.into_inner().unwrap()
    }

    fn iota(shape: &[usize]) -> Tensor<f64> {
        let len = shape.iter().product();
        Tensor::from_vec((0..len).map(|v| v as f64).collect(), shape).unwrap()
    }

    #[test]
    fn test_reshape_is_a_view() {
        let g = iota(&[6]);
        let dx = requested(|s| reshape_vjp(&[2, 3], &g, s));
        assert_eq!(dx.shape(), &[2, 3]);
        assert!(dx.shares_storage_with(&g));
    }

    #[test]
    fn test_transpose_inverts_permutation() {
        // forward perm [1, 2, 0] maps (2, 3, 4) to (3, 4, 2)
        let g = iota(&[3, 4, 2]);
        let dx = requested(|s| transpose_vjp(&g, &[1, -1, 0], s));
        assert_eq!(dx.shape(), &[2, 3, 4]);
        assert_eq!(dx.get(&[1, 2, 3]), g.get(&[2, 3, 1]));
    }

    #[test]
    fn test_transpose_rejects_repeated_axes() {
        let g = iota(&[2, 2]);
        let mut slot = GradSlot::requested();
        assert!(transpose_vjp(&g, &[0, 0], &mut slot).is_err());
    }

    #[test]
    fn test_expand_sums_broadcast_axes() {
        let x = Tensor::<f64>::zeros(&[2, 1]);
        let g = iota(&[3, 2, 4]);
        let dx = requested(|s| expand_vjp(&x, &g, s));
        assert_eq!(dx.shape(), &[2, 1]);
        assert_eq!(dx.data(), &[114.0, 162.0]);
    }

    #[test]
    fn test_tile_accumulates_repeats() {
        let x = Tensor::<f64>::zeros(&[2]);
        let g = iota(&[2, 4]);
        // g = [[0 1 2 3] [4 5 6 7]], x repeated twice per row
        let dx = requested(|s| tile_vjp(&x, &g, &[2, 2], s));
        assert_eq!(dx.shape(), &[2]);
        assert_eq!(dx.data(), &[0.0 + 2.0 + 4.0 + 6.0, 1.0 + 3.0 + 5.0 + 7.0]);
    }

    #[test]
    fn test_slice_pads_back() {
        let x = Tensor::<f64>::zeros(&[4, 3]);
        let g = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
        let attrs = SliceAttrs {
            axes: vec![0, 1],
            starts: vec![1, -1],
            ends: vec![3, 3],
            decrease_axis: vec![1],
        };
        let dx = requested(|s| slice_vjp(&x, &g, &attrs, s));
        assert_eq!(dx.shape(), &[4, 3]);
        assert_eq!(dx.data(), &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pad_crops() {
        let g = iota(&[4, 3]);
        let dx = requested(|s| pad_vjp(&g, &[(1, 2), (0, 1)], s));
        assert_eq!(dx.shape(), &[1, 2]);
        assert_eq!(dx.data(), &[3.0, 4.0]);
    }

    #[test]
    fn test_roll_back() {
        let g = Tensor::from_vec(vec![3.0, 1.0, 2.0], &[3]).unwrap();
        assert_eq!(requested(|s| roll_vjp(&g, &[1], &[0], s)).data(), &[1.0, 2.0, 3.0]);
        assert_eq!(requested(|s| roll_vjp(&g, &[1], &[], s)).data(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_split_concatenates() {
        let pieces = vec![iota(&[2, 1]), Tensor::ones(&[2, 2])];
        let dx = requested(|s| split_vjp(&pieces, -1, s));
        assert_eq!(dx.data(), &[0.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_concat_fills_requested_slots_only() {
        let a = Tensor::<f64>::zeros(&[1, 2]);
        let b = Tensor::<f64>::zeros(&[2, 2]);
        let g = iota(&[3, 2]);
        let mut slots = vec![GradSlot::skipped(), GradSlot::requested()];
        concat_vjp(&[&a, &b], &g, 0, &mut slots).unwrap();
        assert!(!slots[0].is_written());
        assert_eq!(slots[1].get().unwrap().data(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_concat_slot_count_mismatch() {
        let a = Tensor::<f64>::zeros(&[1]);
        let g = Tensor::<f64>::zeros(&[1]);
        let mut slots = vec![GradSlot::requested(), GradSlot::requested()];
        let err = concat_vjp(&[&a], &g, 0, &mut slots).unwrap_err();
        assert!(matches!(err, VjpError::UnsupportedAttribute { .. }));
    }

    #[test]
    fn test_skipped_shape_rules_do_nothing() {
        let g = iota(&[2, 3]);
        let (_, tally) = profiling::record(|| {
            let mut slot = GradSlot::skipped();
            reshape_vjp(&[6], &g, &mut slot).unwrap();
            transpose_vjp(&g, &[1, 0], &mut slot).unwrap();
            pad_vjp(&g, &[(0, 0), (1, 1)], &mut slot).unwrap();
        });
        assert!(tally.is_empty());
    }
}
