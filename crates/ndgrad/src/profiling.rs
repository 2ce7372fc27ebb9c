//! Per-thread tally of primitive calls.
//!
//! Every primitive in [`crate::operations`] reports itself here. The tally
//! never influences results; it exists so callers and tests can observe how
//! much primitive work a gradient rule performed.

use std::cell::RefCell;
use std::collections::BTreeMap;

use log::trace;

/// Number of primitive invocations, keyed by primitive name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PrimitiveTally {
    calls: BTreeMap<&'static str, u64>,
}

impl PrimitiveTally {
    /// Total number of primitive calls.
    pub fn total(&self) -> u64 {
        self.calls.values().sum()
    }

    /// Calls made to the primitive named `name`.
    pub fn count(&self, name: &str) -> u64 {
        self.calls.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        self.calls.iter().map(|(&name, &count)| (name, count))
    }

    fn merge(&mut self, other: &PrimitiveTally) {
        for (name, count) in other.iter() {
            *self.calls.entry(name).or_default() += count;
        }
    }
}

thread_local! {
    static TALLY: RefCell<PrimitiveTally> = RefCell::new(PrimitiveTally::default());
}

/// Note one call to primitive `name`.
pub(crate) fn primitive(name: &'static str) {
    trace!("primitive {name}");
    TALLY.with(|tally| *tally.borrow_mut().calls.entry(name).or_default() += 1);
}

/// Run `f` and return its result together with the primitives it called.
///
/// Nested recordings are supported: the inner tally is also added to the
/// enclosing one.
///
/// ```
/// use ndgrad::{Tensor, operations, profiling};
///
/// let x = Tensor::from_vec(vec![1.0, 2.0], &[2]).unwrap();
/// let (_, tally) = profiling::record(|| operations::exp(&x));
/// assert_eq!(tally.count("exp"), 1);
/// ```
pub fn record<R>(f: impl FnOnce() -> R) -> (R, PrimitiveTally) {
    let outer = TALLY.with(|tally| std::mem::take(&mut *tally.borrow_mut()));
    let result = f();
    let inner = TALLY.with(|tally| {
        let mut slot = tally.borrow_mut();
        let inner = std::mem::replace(&mut *slot, outer);
        slot.merge(&inner);
        inner
    });
    (result, inner)
}
