//! Reverse-mode gradient rules.
//!
//! A rule takes the forward inputs and/or outputs an operation saved, the
//! upstream gradient `grad_output`, the operation's attributes, and one
//! [`GradSlot`] per differentiable input. It writes each requested slot and
//! computes nothing for skipped ones.
//!
//! ```text
//! elementwise    abs sin cos exp log sqrt tanh erf floor assign cast
//! activation     relu leaky_relu hardswish sigmoid silu gelu softmax
//! binary         add subtract multiply divide elementwise_pow maximum minimum
//! reduction      sum max prod cumsum
//! shape          reshape transpose expand tile slice pad roll split concat
//! indexing       gather gather_nd scatter scatter_nd_add topk
//! normalization  layer_norm instance_norm
//! stochastic     dropout
//! ```
//!
//! Rules are pure functions of their arguments and only call the
//! primitives in [`crate::operations`]; choosing which rule to run for a
//! forward op is left to the caller.

mod activation;
mod attrs;
mod binary;
mod broadcast;
mod elementwise;
mod indexing;
mod normalization;
mod promote;
mod reduction;
mod shape;
mod slot;
mod stochastic;

pub use activation::{
    gelu_vjp, hardswish_vjp, leaky_relu_vjp, relu_vjp, sigmoid_vjp, silu_vjp, softmax_vjp,
};
pub use attrs::{CumsumAttrs, DropoutAttrs, DropoutMode, LayerNormAttrs, ReduceAttrs, SliceAttrs};
pub use binary::{
    add_vjp, divide_vjp, elementwise_pow_vjp, maximum_vjp, minimum_vjp, multiply_vjp, subtract_vjp,
};
pub use broadcast::{
    AxisSet, normalize_axes, normalize_axis, reduce_dims, reduce_dims_from_output, reduce_to_shape,
    restore_reduced_axes,
};
pub use elementwise::{
    abs_vjp, assign_vjp, cast_vjp, cos_vjp, erf_vjp, exp_vjp, floor_vjp, log_vjp, sin_vjp, sqrt_vjp,
    tanh_vjp,
};
pub use indexing::{gather_nd_vjp, gather_vjp, scatter_nd_add_vjp, scatter_vjp, topk_vjp};
pub use normalization::{instance_norm_vjp, layer_norm_vjp};
pub use promote::{demote, promote, with_promotion};
pub use reduction::{cumsum_vjp, max_vjp, prod_vjp, sum_vjp};
pub use shape::{
    concat_vjp, expand_vjp, pad_vjp, reshape_vjp, roll_vjp, slice_vjp, split_vjp, tile_vjp,
    transpose_vjp,
};
pub use slot::GradSlot;
pub use stochastic::dropout_vjp;
