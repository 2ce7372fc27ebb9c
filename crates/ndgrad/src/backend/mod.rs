//! Backend abstraction for data-movement kernels.
//!
//! - `GenericBackend`: loop-based implementation (always available)

mod generic;
mod permutation;

pub use generic::GenericBackend;
pub use permutation::PermutationBackend;
