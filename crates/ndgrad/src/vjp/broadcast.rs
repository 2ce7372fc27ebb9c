//! Broadcast-reduction algebra shared by the binary and reduction rules.
//!
//! A gradient computed at a broadcast result's shape must be summed over
//! the axes that broadcasting stretched before it matches an operand. All
//! axis indices here live in the index space of the larger shape.

use log::debug;
use smallvec::SmallVec;

use crate::error::VjpError;
use crate::operations as ops;
use crate::scalar::Scalar;
use crate::tensor::Tensor;

/// Set of axis indices, sorted ascending and free of duplicates.
pub type AxisSet = SmallVec<[usize; 4]>;

fn reduce_dims_for(
    op: &'static str,
    target: &[usize],
    smaller: &[usize],
) -> Result<AxisSet, VjpError> {
    let mismatch = || VjpError::ShapeMismatch {
        op,
        expected: smaller.to_vec(),
        actual: target.to_vec(),
    };
    if smaller.len() > target.len() {
        return Err(mismatch());
    }
    let offset = target.len() - smaller.len();
    let mut axes = AxisSet::new();
    for (axis, &size) in target.iter().enumerate() {
        if axis < offset {
            axes.push(axis);
            continue;
        }
        match smaller[axis - offset] {
            s if s == size => {}
            1 => axes.push(axis),
            _ => return Err(mismatch()),
        }
    }
    Ok(axes)
}

/// Axes of `target` to sum over so the result reshapes to `smaller`.
///
/// Shapes are right-aligned. An axis is reduced when `smaller` lacks it
/// (extra leading axes of `target`) or when `smaller` has size 1 there and
/// `target` does not. Equal sizes are never reduced.
///
/// # Errors
///
/// `VjpError::ShapeMismatch` if the shapes are not broadcast-compatible.
///
/// ```
/// use ndgrad::vjp::reduce_dims;
///
/// assert_eq!(reduce_dims(&[2, 3], &[3]).unwrap().as_slice(), &[0]);
/// assert_eq!(reduce_dims(&[4, 2, 3], &[2, 1]).unwrap().as_slice(), &[0, 2]);
/// assert!(reduce_dims(&[2, 3], &[2, 3]).unwrap().is_empty());
/// ```
pub fn reduce_dims(target: &[usize], smaller: &[usize]) -> Result<AxisSet, VjpError> {
    reduce_dims_for("reduce_dims", target, smaller)
}

/// [`reduce_dims`] for a gradient that lives at the elementwise result shape.
///
/// Used by rules whose unreduced gradient is built from the output (e.g.
/// `grad_output * y`) rather than from the other operand's shape.
pub fn reduce_dims_from_output(output: &[usize], operand: &[usize]) -> Result<AxisSet, VjpError> {
    reduce_dims_for("reduce_dims_from_output", output, operand)
}

/// Reinsert the size-1 dimensions removed by a `keepdim=false` reduction.
///
/// `axes` are positions in the pre-reduction shape; the result has size 1
/// exactly at those positions and `reduced_shape` elsewhere.
///
/// ```
/// use ndgrad::vjp::restore_reduced_axes;
///
/// assert_eq!(restore_reduced_axes(&[0, 2], &[5]), vec![1, 5, 1]);
/// assert_eq!(restore_reduced_axes(&[1], &[4, 6]), vec![4, 1, 6]);
/// ```
pub fn restore_reduced_axes(axes: &[usize], reduced_shape: &[usize]) -> Vec<usize> {
    let mut sorted: AxisSet = axes.iter().copied().collect();
    sorted.sort_unstable();
    sorted.dedup();
    let mut shape = reduced_shape.to_vec();
    for axis in sorted {
        shape.insert(axis.min(shape.len()), 1);
    }
    shape
}

/// Resolve a possibly negative axis against `rank`.
pub fn normalize_axis(op: &'static str, axis: i64, rank: usize) -> Result<usize, VjpError> {
    let resolved = if axis < 0 { axis + rank as i64 } else { axis };
    if resolved < 0 || resolved >= rank as i64 {
        return Err(VjpError::unsupported(
            op,
            format!("axis {axis} out of range for rank {rank}"),
        ));
    }
    Ok(resolved as usize)
}

/// Resolve, sort and deduplicate a list of possibly negative axes.
pub fn normalize_axes(op: &'static str, axes: &[i64], rank: usize) -> Result<AxisSet, VjpError> {
    let mut resolved = axes
        .iter()
        .map(|&axis| normalize_axis(op, axis, rank))
        .collect::<Result<AxisSet, _>>()?;
    resolved.sort_unstable();
    resolved.dedup();
    Ok(resolved)
}

/// Sum `grad` down to `target`'s shape.
///
/// Returns `grad` itself, without any primitive call, when the shapes
/// already match.
pub fn reduce_to_shape<T: Scalar>(
    op: &'static str,
    grad: Tensor<T>,
    target: &[usize],
) -> Result<Tensor<T>, VjpError> {
    if grad.shape() == target {
        debug!("{op}: gradient already has shape {target:?}, aliasing");
        return Ok(grad);
    }
    let axes = reduce_dims_for(op, grad.shape(), target)?;
    let reduced = if axes.is_empty() {
        grad
    } else {
        ops::sum(&grad, &axes, false)?
    };
    if reduced.shape() == target {
        Ok(reduced)
    } else {
        Ok(ops::reshape(&reduced, target)?)
    }
}
