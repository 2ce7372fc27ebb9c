//! Element-wise comparisons and selection.

use crate::error::TensorError;
use crate::operations::elementwise::{broadcast_data, broadcast_shape, zip_with};
use crate::profiling;
use crate::scalar::{Element, Scalar};
use crate::tensor::Tensor;

macro_rules! compare_op {
    ($(#[$doc:meta])* $name:ident, $op:tt) => {
        $(#[$doc])*
        pub fn $name<T: Scalar>(
            lhs: &Tensor<T>,
            rhs: &Tensor<T>,
        ) -> Result<Tensor<bool>, TensorError> {
            profiling::primitive(stringify!($name));
            zip_with(lhs, rhs, |a: T, b: T| a $op b)
        }
    };
}

compare_op!(
    /// Broadcasting `lhs > rhs`.
    greater_than, >
);
compare_op!(
    /// Broadcasting `lhs >= rhs`.
    greater_equal, >=
);
compare_op!(
    /// Broadcasting `lhs < rhs`.
    less_than, <
);
compare_op!(
    /// Broadcasting `lhs <= rhs`.
    less_equal, <=
);
compare_op!(
    /// Broadcasting `lhs == rhs`.
    equal, ==
);

/// Pick `on_true` where `cond` holds and `on_false` elsewhere.
///
/// All three operands broadcast to a common shape.
///
/// # Example
///
/// ```
/// use ndgrad::Tensor;
/// use ndgrad::operations::where_cond;
///
/// let cond = Tensor::from_vec(vec![true, false, true], &[3]).unwrap();
/// let a = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3]).unwrap();
/// let zero = Tensor::scalar(0.0);
/// assert_eq!(where_cond(&cond, &a, &zero).unwrap().data(), &[1.0, 0.0, 3.0]);
/// ```
pub fn where_cond<T: Element>(
    cond: &Tensor<bool>,
    on_true: &Tensor<T>,
    on_false: &Tensor<T>,
) -> Result<Tensor<T>, TensorError> {
    profiling::primitive("where");
    let shape = broadcast_shape(cond.shape(), on_true.shape())?;
    let shape = broadcast_shape(&shape, on_false.shape())?;
    let data = broadcast_data(cond, &shape)
        .into_iter()
        .zip(broadcast_data(on_true, &shape))
        .zip(broadcast_data(on_false, &shape))
        .map(|((c, t), f)| if c { t } else { f })
        .collect();
    Ok(Tensor::from_raw(data, &shape))
}
