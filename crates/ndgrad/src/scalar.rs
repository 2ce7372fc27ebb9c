//! Element and scalar traits, and the static precision-promotion table.

use std::fmt::{self, Debug};

use half::{bf16, f16};
use num_traits::Float;

use crate::operations::cast;
use crate::tensor::Tensor;

/// Runtime tag for an element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    U8,
    I64,
    F16,
    BF16,
    F32,
    F64,
}

impl DType {
    /// Returns true for the 16-bit float formats that compute in `f32`.
    pub fn is_reduced_precision(self) -> bool {
        matches!(self, DType::F16 | DType::BF16)
    }

    pub fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::BF16 | DType::F32 | DType::F64)
    }

    pub fn name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::U8 => "uint8",
            DType::I64 => "int64",
            DType::F16 => "float16",
            DType::BF16 => "bfloat16",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Any value that can be stored in a tensor.
///
/// The f64 conversions back `cast` and constant fill. They round for narrow
/// floats, truncate for integers and map booleans through `!= 0`.
pub trait Element: Copy + Debug + Default + PartialEq + Send + Sync + 'static {
    const DTYPE: DType;

    fn cast_to_f64(self) -> f64;

    fn cast_from_f64(value: f64) -> Self;
}

/// Differentiable floating-point element.
///
/// `Compute` is the type rule bodies run in. The implementations below are
/// the promotion table: `f16` and `bf16` compute in `f32`, `f32` and `f64`
/// compute in themselves.
pub trait Scalar: Element + Float {
    type Compute: Scalar;

    /// Error function.
    fn erf(self) -> Self;

    /// Convert a tensor into the compute type. Identity promotions share storage.
    fn promote(tensor: &Tensor<Self>) -> Tensor<Self::Compute>;

    /// Convert a compute-type tensor back into this type.
    fn demote(tensor: Tensor<Self::Compute>) -> Tensor<Self>;
}

impl Element for bool {
    const DTYPE: DType = DType::Bool;

    fn cast_to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }

    fn cast_from_f64(value: f64) -> Self {
        value != 0.0
    }
}

macro_rules! impl_primitive_element {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn cast_to_f64(self) -> f64 {
                    self as f64
                }

                fn cast_from_f64(value: f64) -> Self {
                    value as $ty
                }
            }
        )*
    };
}

impl_primitive_element!(u8 => DType::U8, i64 => DType::I64, f32 => DType::F32, f64 => DType::F64);

macro_rules! impl_half_element {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Element for $ty {
                const DTYPE: DType = $dtype;

                fn cast_to_f64(self) -> f64 {
                    self.to_f64()
                }

                fn cast_from_f64(value: f64) -> Self {
                    <$ty>::from_f64(value)
                }
            }

            impl Scalar for $ty {
                type Compute = f32;

                fn erf(self) -> Self {
                    <$ty>::from_f32(libm::erff(self.to_f32()))
                }

                fn promote(tensor: &Tensor<Self>) -> Tensor<f32> {
                    cast(tensor)
                }

                fn demote(tensor: Tensor<f32>) -> Tensor<Self> {
                    cast(&tensor)
                }
            }
        )*
    };
}

impl_half_element!(f16 => DType::F16, bf16 => DType::BF16);

impl Scalar for f32 {
    type Compute = f32;

    fn erf(self) -> Self {
        libm::erff(self)
    }

    fn promote(tensor: &Tensor<Self>) -> Tensor<f32> {
        tensor.clone()
    }

    fn demote(tensor: Tensor<f32>) -> Tensor<Self> {
        tensor
    }
}

impl Scalar for f64 {
    type Compute = f64;

    fn erf(self) -> Self {
        libm::erf(self)
    }

    fn promote(tensor: &Tensor<Self>) -> Tensor<f64> {
        tensor.clone()
    }

    fn demote(tensor: Tensor<f64>) -> Tensor<Self> {
        tensor
    }
}
