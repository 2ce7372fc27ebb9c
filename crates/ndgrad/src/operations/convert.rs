//! Element-type conversion and constant construction.

use crate::operations::elementwise::map;
use crate::profiling;
use crate::scalar::Element;
use crate::tensor::Tensor;

/// Convert every element to `U` (rounding, truncating or testing `!= 0`
/// according to the target type).
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::cast;
///
/// let mask = Tensor::from_vec(vec![true, false], &[2]).unwrap();
/// let m: Tensor<f32> = cast(&mask);
/// assert_eq!(m.data(), &[1.0, 0.0]);
/// ```
pub fn cast<T: Element, U: Element>(x: &Tensor<T>) -> Tensor<U> {
    profiling::primitive("cast");
    map(x, |v: T| U::cast_from_f64(v.cast_to_f64()))
}

/// A tensor of `shape` filled with `value`.
pub fn full<T: Element>(shape: &[usize], value: f64) -> Tensor<T> {
    profiling::primitive("full");
    Tensor::from_raw(vec![T::cast_from_f64(value); shape.iter().product()], shape)
}

/// Zeros with the shape of `x`.
pub fn zeros_like<T: Element>(x: &Tensor<T>) -> Tensor<T> {
    full(x.shape(), 0.0)
}

/// `value` with the shape of `x`.
pub fn full_like<T: Element>(x: &Tensor<T>, value: f64) -> Tensor<T> {
    full(x.shape(), value)
}
