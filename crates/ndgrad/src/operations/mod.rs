//! Tensor primitives.
//!
//! The gradient rules in [`crate::vjp`] are written exclusively against this
//! surface. Every public function records itself in [`crate::profiling`].
//!
//! ```text
//! elementwise   neg abs sign floor exp log sqrt sin cos tanh sigmoid erf
//!               scale powf | add sub mul div pow maximum minimum
//! compare       greater_than greater_equal less_than less_equal equal where_cond
//! reduce        sum max prod cumsum
//! shape         reshape expand tile permutedims
//! slice         slice pad roll
//! concat        concat split
//! indexing      gather scatter gather_nd scatter_nd_add put_along_axis take_along_axis
//! convert       cast full zeros_like full_like
//! ```

mod compare;
mod concat;
mod convert;
mod elementwise;
mod indexing;
mod permutedims;
mod reduce;
mod shape;
mod slice;

pub use compare::{equal, greater_equal, greater_than, less_equal, less_than, where_cond};
pub use concat::{concat, split};
pub use convert::{cast, full, full_like, zeros_like};
pub use elementwise::{
    abs, add, broadcast_shape, cos, div, erf, exp, floor, log, maximum, minimum, mul, neg, pow,
    powf, scale, sigmoid, sign, sin, sqrt, sub, tanh,
};
pub use indexing::{gather, gather_nd, put_along_axis, scatter, scatter_nd_add, take_along_axis};
pub use permutedims::{inverse_permutation, permutedims, permutedims_into};
pub use reduce::{cumsum, max, prod, sum};
pub use shape::{expand, reshape, tile};
pub(crate) use shape::left_pad;
pub use slice::{pad, roll, slice};

