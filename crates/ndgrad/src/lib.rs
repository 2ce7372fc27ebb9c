//! ndgrad - reverse-mode gradient rules for dense tensors
//!
//! This crate provides the vector-Jacobian products (VJPs) of common tensor
//! operations, written against a small set of tensor primitives.
//!
//! # Architecture
//!
//! ```text
//! Level 1: Gradient rules (vjp module)
//!     → add_vjp, softmax_vjp, layer_norm_vjp, ...
//!
//! Level 2: Tensor primitives (operations module)
//!     → elementwise, reduce, reshape/expand/tile, slice/pad, gather/scatter
//!
//! Level 3: Storage and layout (tensor, storage, strides, backend)
//!     → row-major dense tensors with shared copy-on-write storage
//! ```
//!
//! Half-precision element types ([`f16`], [`bf16`]) compute their gradients
//! in `f32` and round the result back.
//!
//! # Example
//!
//! ```
//! use ndgrad::{GradSlot, Tensor};
//! use ndgrad::vjp::add_vjp;
//!
//! let x = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
//! let y = Tensor::from_vec(vec![10.0, 20.0, 30.0], &[3]).unwrap();
//! let grad_output = Tensor::ones(&[2, 3]);
//!
//! let mut grad_x = GradSlot::requested();
//! let mut grad_y = GradSlot::requested();
//! add_vjp(&x, &y, &grad_output, &mut grad_x, &mut grad_y).unwrap();
//!
//! assert_eq!(grad_x.get().unwrap().shape(), &[2, 3]);
//! assert_eq!(grad_y.get().unwrap().data(), &[2.0, 2.0, 2.0]);
//! ```

pub mod backend;
pub mod error;
pub mod operations;
pub mod profiling;
pub mod random;
pub mod scalar;
pub mod storage;
pub mod strides;
pub mod tensor;
pub mod vjp;

pub use error::{TensorError, VjpError};
pub use half::{bf16, f16};
pub use scalar::{DType, Element, Scalar};
pub use storage::Dense;
pub use tensor::Tensor;
pub use vjp::GradSlot;
