//! Attribute bundles mirrored from forward operations.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::VjpError;
use crate::vjp::broadcast::{AxisSet, normalize_axes};

/// Axis attributes shared by `sum`, `max` and `prod`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReduceAttrs {
    /// Reduced axes; negative values count from the end.
    pub axis: Vec<i64>,
    pub keepdim: bool,
    /// Reduce over every axis regardless of `axis`.
    pub reduce_all: bool,
}

impl ReduceAttrs {
    pub fn new(axis: impl Into<Vec<i64>>, keepdim: bool) -> Self {
        Self {
            axis: axis.into(),
            keepdim,
            reduce_all: false,
        }
    }

    /// Concrete reduced axes for an input of `rank`.
    ///
    /// An empty axis list or `reduce_all` means "every axis".
    pub fn resolve(&self, op: &'static str, rank: usize) -> Result<AxisSet, VjpError> {
        if self.reduce_all || self.axis.is_empty() {
            return Ok((0..rank).collect());
        }
        normalize_axes(op, &self.axis, rank)
    }
}

/// Attributes of `slice`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceAttrs {
    pub axes: Vec<i64>,
    pub starts: Vec<i64>,
    pub ends: Vec<i64>,
    /// Axes the forward op dropped after slicing them to size 1.
    pub decrease_axis: Vec<i64>,
}

/// Attributes of `cumsum`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CumsumAttrs {
    /// Scan axis; `None` scans the flattened input.
    pub axis: Option<i64>,
    pub flatten: bool,
    pub exclusive: bool,
    pub reverse: bool,
}

/// Attributes of `layer_norm`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerNormAttrs {
    pub epsilon: f64,
    /// First normalized axis; everything before it is the batch.
    pub begin_norm_axis: i64,
}

impl Default for LayerNormAttrs {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            begin_norm_axis: 1,
        }
    }
}

/// Scaling convention of `dropout`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropoutMode {
    /// Scale kept units by `1 / (1 - p)` while training; identity at inference.
    #[default]
    UpscaleInTrain,
    /// Keep units unscaled while training; scale by `1 - p` at inference.
    DowngradeInInfer,
}

impl DropoutMode {
    pub fn as_str(self) -> &'static str {
        match self {
            DropoutMode::UpscaleInTrain => "upscale_in_train",
            DropoutMode::DowngradeInInfer => "downgrade_in_infer",
        }
    }
}

impl fmt::Display for DropoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every string other than `"upscale_in_train"` selects `DowngradeInInfer`.
impl FromStr for DropoutMode {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "upscale_in_train" => DropoutMode::UpscaleInTrain,
            _ => DropoutMode::DowngradeInInfer,
        })
    }
}

/// Attributes of `dropout`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DropoutAttrs {
    /// Drop probability.
    pub p: f64,
    pub is_test: bool,
    pub mode: DropoutMode,
}

impl Default for DropoutAttrs {
    fn default() -> Self {
        Self {
            p: 0.5,
            is_test: false,
            mode: DropoutMode::UpscaleInTrain,
        }
    }
}
