//! Dense storage for tensor data.

use std::sync::Arc;

use crate::scalar::Element;

/// Contiguous row-major elements behind a shared, copy-on-write buffer.
///
/// Cloning is O(1) and yields a view of the same buffer; the first mutation
/// through a shared handle copies the buffer so other views never change.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense<ElT: Element> {
    data: Arc<Vec<ElT>>,
}

impl<ElT: Element> Dense<ElT> {
    /// Create dense storage with given length, default-initialized.
    pub fn zeros(len: usize) -> Self {
        Self::from_vec(vec![ElT::default(); len])
    }

    /// Create dense storage from existing vector (takes ownership).
    pub fn from_vec(data: Vec<ElT>) -> Self {
        Self {
            data: Arc::new(data),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[ElT] {
        &self.data
    }

    /// Mutable access; copies the buffer first if it is shared.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [ElT] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Create a view of the same underlying data.
    #[inline]
    pub fn view(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }

    /// Returns true if both handles point at the same buffer.
    #[inline]
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Returns true if another handle references this buffer.
    #[inline]
    pub fn is_shared(&self) -> bool {
        Arc::strong_count(&self.data) > 1
    }

    /// Take the elements out, copying only if the buffer is shared.
    pub fn into_vec(self) -> Vec<ElT> {
        Arc::try_unwrap(self.data).unwrap_or_else(|shared| shared.as_ref().clone())
    }
}

impl<ElT: Element> std::ops::Index<usize> for Dense<ElT> {
    type Output = ElT;

    #[inline]
    fn index(&self, i: usize) -> &ElT {
        &self.data[i]
    }
}
