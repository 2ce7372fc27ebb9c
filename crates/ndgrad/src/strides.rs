//! Stride computation utilities.
//!
//! Tensors are stored in row-major (C) order: the last axis is contiguous.

/// Compute row-major strides from shape.
///
/// For shape [d0, d1, d2], returns strides [d1*d2, d2, 1].
///
/// # Examples
///
/// ```
/// use ndgrad::strides::compute_strides;
///
/// assert_eq!(compute_strides(&[3, 4, 5]), vec![20, 5, 1]);
/// assert_eq!(compute_strides(&[2, 3]), vec![3, 1]);
/// assert_eq!(compute_strides(&[5]), vec![1]);
/// assert_eq!(compute_strides(&[]), Vec::<usize>::new());
/// ```
pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut stride = 1;
    for (axis, &dim) in shape.iter().enumerate().rev() {
        strides[axis] = stride;
        stride *= dim;
    }
    strides
}

/// Strides for reading a tensor of `shape` as if it were broadcast to `target`.
///
/// `shape` is right-aligned against `target`; missing leading axes and
/// size-1 axes that are stretched get stride 0. The caller guarantees the
/// shapes are broadcast-compatible.
///
/// ```
/// use ndgrad::strides::broadcast_strides;
///
/// assert_eq!(broadcast_strides(&[3], &[2, 3]), vec![0, 1]);
/// assert_eq!(broadcast_strides(&[2, 1], &[2, 4]), vec![1, 0]);
/// ```
pub fn broadcast_strides(shape: &[usize], target: &[usize]) -> Vec<usize> {
    let own = compute_strides(shape);
    let offset = target.len() - shape.len();
    target
        .iter()
        .enumerate()
        .map(|(axis, &size)| {
            if axis < offset {
                return 0;
            }
            let src = axis - offset;
            if shape[src] == 1 && size != 1 { 0 } else { own[src] }
        })
        .collect()
}

/// Convert cartesian indices to a linear offset.
#[inline]
pub fn cartesian_to_linear(indices: &[usize], strides: &[usize]) -> usize {
    indices
        .iter()
        .zip(strides.iter())
        .map(|(&idx, &stride)| idx * stride)
        .sum()
}

/// Convert a row-major linear index to cartesian indices.
pub fn linear_to_cartesian(mut linear: usize, shape: &[usize]) -> Vec<usize> {
    let mut indices = vec![0; shape.len()];
    for (axis, &dim) in shape.iter().enumerate().rev() {
        indices[axis] = linear % dim;
        linear /= dim;
    }
    indices
}

/// Advance `index` to the next position of `shape` in row-major order.
///
/// Returns `false` once every position has been visited.
#[inline]
pub fn next_index(index: &mut [usize], shape: &[usize]) -> bool {
    for axis in (0..shape.len()).rev() {
        index[axis] += 1;
        if index[axis] < shape[axis] {
            return true;
        }
        index[axis] = 0;
    }
    false
}
