//! Caller-owned destinations for input gradients.

use crate::scalar::Element;
use crate::tensor::Tensor;

/// Destination for one input gradient.
///
/// A slot is either *requested* (the caller will consume the gradient) or
/// *skipped*. Rules compute nothing for skipped slots, and may leave a
/// requested slot unwritten when the gradient is structurally undefined
/// (e.g. the scale gradient of a normalization that had no scale operand).
///
/// # Example
///
/// ```
/// use ndgrad::{GradSlot, Tensor};
/// use ndgrad::vjp::relu_vjp;
///
/// let out = Tensor::from_vec(vec![0.0, 2.0], &[2]).unwrap();
/// let grad_output = Tensor::from_vec(vec![1.0, 1.0], &[2]).unwrap();
///
/// let mut grad_x = GradSlot::requested();
/// relu_vjp(&out, &grad_output, &mut grad_x).unwrap();
/// assert_eq!(grad_x.get().unwrap().data(), &[0.0, 1.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GradSlot<T: Element> {
    requested: bool,
    grad: Option<Tensor<T>>,
}

impl<T: Element> GradSlot<T> {
    /// A slot whose gradient the caller will consume.
    pub fn requested() -> Self {
        Self {
            requested: true,
            grad: None,
        }
    }

    /// A slot whose gradient is not needed.
    pub fn skipped() -> Self {
        Self {
            requested: false,
            grad: None,
        }
    }

    pub fn new(requested: bool) -> Self {
        if requested { Self::requested() } else { Self::skipped() }
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.requested
    }

    #[inline]
    pub fn is_written(&self) -> bool {
        self.grad.is_some()
    }

    /// Store a gradient. Writes to a skipped slot are dropped.
    pub(crate) fn write(&mut self, grad: Tensor<T>) {
        debug_assert!(self.requested, "gradient written to a skipped slot");
        if self.requested {
            self.grad = Some(grad);
        }
    }

    pub fn get(&self) -> Option<&Tensor<T>> {
        self.grad.as_ref()
    }

    pub fn take(&mut self) -> Option<Tensor<T>> {
        self.grad.take()
    }

    pub fn into_inner(self) -> Option<Tensor<T>> {
        self.grad
    }
}

impl<T: Element> Default for GradSlot<T> {
    fn default() -> Self {
        Self::skipped()
    }
}

/// Returns true if at least one slot is requested.
pub(crate) fn any_requested<T: Element>(slots: &[&GradSlot<T>]) -> bool {
    slots.iter().any(|slot| slot.is_requested())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_slot_lifecycle() {
        let mut slot = GradSlot::requested();
        assert!(slot.is_requested());
        assert!(!slot.is_written());
        slot.write(Tensor::scalar(1.0f32));
        assert!(slot.is_written());
        assert_eq!(slot.take(), Some(Tensor::scalar(1.0)));
        assert!(!slot.is_written());
    }

    #[test]
    fn test_default_is_skipped() {
        let slot: GradSlot<f64> = GradSlot::default();
        assert!(!slot.is_requested());
        assert_eq!(slot.into_inner(), None);
    }

    #[test]
    fn test_any_requested() {
        let a: GradSlot<f64> = GradSlot::skipped();
        let b: GradSlot<f64> = GradSlot::new(true);
        assert!(!any_requested(&[&a]));
        assert!(any_requested(&[&a, &b]));
    }
}
