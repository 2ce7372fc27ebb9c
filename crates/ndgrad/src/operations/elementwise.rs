//! Element-wise tensor operations.
//!
//! Binary operations follow numpy broadcasting: shapes are right-aligned and
//! a dimension of size 1 (or a missing leading dimension) is stretched.

use crate::error::TensorError;
use crate::profiling;
use crate::scalar::{Element, Scalar};
use crate::strides::{broadcast_strides, cartesian_to_linear, next_index};
use crate::tensor::Tensor;

/// Apply `f` to every element, producing a tensor of the same shape.
pub(crate) fn map<T: Element, U: Element>(x: &Tensor<T>, f: impl Fn(T) -> U) -> Tensor<U> {
    let data = x.data().iter().map(|&v| f(v)).collect();
    Tensor::from_raw(data, x.shape())
}

/// Shape obtained by broadcasting `lhs` against `rhs`.
///
/// # Errors
///
/// Returns `TensorError::IncompatibleShapes` when an aligned pair of
/// dimensions differs and neither is 1.
///
/// ```
/// use ndgrad::operations::broadcast_shape;
///
/// assert_eq!(broadcast_shape(&[2, 3], &[3]).unwrap(), vec![2, 3]);
/// assert_eq!(broadcast_shape(&[4, 1], &[1, 5]).unwrap(), vec![4, 5]);
/// assert!(broadcast_shape(&[2, 3], &[2]).is_err());
/// ```
pub fn broadcast_shape(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>, TensorError> {
    let rank = lhs.len().max(rhs.len());
    let aligned = |shape: &[usize], axis: usize| {
        let offset = rank - shape.len();
        if axis < offset { 1 } else { shape[axis - offset] }
    };
    (0..rank)
        .map(|axis| match (aligned(lhs, axis), aligned(rhs, axis)) {
            (l, r) if l == r => Ok(l),
            (1, r) => Ok(r),
            (l, 1) => Ok(l),
            _ => Err(TensorError::IncompatibleShapes {
                lhs: lhs.to_vec(),
                rhs: rhs.to_vec(),
            }),
        })
        .collect()
}

/// Read `x` as if broadcast to `shape`, in row-major order.
///
/// The caller guarantees `x.shape()` broadcasts to `shape`.
pub(crate) fn broadcast_data<T: Element>(x: &Tensor<T>, shape: &[usize]) -> Vec<T> {
    if x.shape() == shape {
        return x.to_vec();
    }
    let len: usize = shape.iter().product();
    let strides = broadcast_strides(x.shape(), shape);
    let src = x.data();
    let mut data = Vec::with_capacity(len);
    if len > 0 {
        let mut index = vec![0; shape.len()];
        loop {
            data.push(src[cartesian_to_linear(&index, &strides)]);
            if !next_index(&mut index, shape) {
                break;
            }
        }
    }
    data
}

/// Combine two tensors element-wise under broadcasting.
pub(crate) fn zip_with<A: Element, B: Element, U: Element>(
    lhs: &Tensor<A>,
    rhs: &Tensor<B>,
    f: impl Fn(A, B) -> U,
) -> Result<Tensor<U>, TensorError> {
    if lhs.shape() == rhs.shape() {
        let data = lhs.data().iter().zip(rhs.data()).map(|(&a, &b)| f(a, b)).collect();
        return Ok(Tensor::from_raw(data, lhs.shape()));
    }
    let shape = broadcast_shape(lhs.shape(), rhs.shape())?;
    let data = broadcast_data(lhs, &shape)
        .into_iter()
        .zip(broadcast_data(rhs, &shape))
        .map(|(a, b)| f(a, b))
        .collect();
    Ok(Tensor::from_raw(data, &shape))
}

macro_rules! unary_op {
    ($(#[$doc:meta])* $name:ident, |$v:ident| $body:expr) => {
        $(#[$doc])*
        pub fn $name<T: Scalar>(x: &Tensor<T>) -> Tensor<T> {
            profiling::primitive(stringify!($name));
            map(x, |$v: T| $body)
        }
    };
}

unary_op!(
    /// Element-wise negation.
    neg, |v| -v
);
unary_op!(abs, |v| v.abs());
unary_op!(
    /// Element-wise sign: -1, 0 or 1 (NaN stays NaN).
    sign, |v| {
        if v > T::zero() {
            T::one()
        } else if v < T::zero() {
            -T::one()
        } else {
            v
        }
    }
);
unary_op!(floor, |v| v.floor());
unary_op!(exp, |v| v.exp());
unary_op!(
    /// Natural logarithm.
    log, |v| v.ln()
);
unary_op!(sqrt, |v| v.sqrt());
unary_op!(sin, |v| v.sin());
unary_op!(cos, |v| v.cos());
unary_op!(tanh, |v| v.tanh());
unary_op!(
    /// Logistic function `1 / (1 + exp(-x))`.
    sigmoid, |v| T::one() / (T::one() + (-v).exp())
);
unary_op!(erf, |v| Scalar::erf(v));

/// Compute `x * factor + bias` element-wise.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::scale;
///
/// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
/// assert_eq!(scale(&t, 2.0, 1.0).data(), &[3.0, 5.0, 7.0]);
/// ```
pub fn scale<T: Scalar>(x: &Tensor<T>, factor: f64, bias: f64) -> Tensor<T> {
    profiling::primitive("scale");
    let factor = T::cast_from_f64(factor);
    let bias = T::cast_from_f64(bias);
    map(x, |v: T| v * factor + bias)
}

/// Raise every element to a constant power.
pub fn powf<T: Scalar>(x: &Tensor<T>, exponent: f64) -> Tensor<T> {
    profiling::primitive("powf");
    let exponent = T::cast_from_f64(exponent);
    map(x, |v: T| v.powf(exponent))
}

macro_rules! binary_op {
    ($(#[$doc:meta])* $name:ident, |$a:ident, $b:ident| $body:expr) => {
        $(#[$doc])*
        ///
        /// # Errors
        ///
        /// Returns `TensorError::IncompatibleShapes` if the operands do not broadcast.
        pub fn $name<T: Scalar>(
            lhs: &Tensor<T>,
            rhs: &Tensor<T>,
        ) -> Result<Tensor<T>, TensorError> {
            profiling::primitive(stringify!($name));
            zip_with(lhs, rhs, |$a: T, $b: T| $body)
        }
    };
}

binary_op!(
    /// Broadcasting element-wise addition.
    add, |a, b| a + b
);
binary_op!(
    /// Broadcasting element-wise subtraction.
    sub, |a, b| a - b
);
binary_op!(
    /// Broadcasting element-wise multiplication.
    mul, |a, b| a * b
);
binary_op!(
    /// Broadcasting element-wise division.
    div, |a, b| a / b
);
binary_op!(
    /// Broadcasting element-wise power `lhs ^ rhs`.
    pow, |a, b| a.powf(b)
);
binary_op!(
    /// Broadcasting element-wise maximum.
    maximum, |a, b| if a >= b { a } else { b }
);
binary_op!(
    /// Broadcasting element-wise minimum.
    minimum, |a, b| if a <= b { a } else { b }
);
