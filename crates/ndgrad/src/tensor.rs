//! N-dimensional dense tensor value.

use crate::error::TensorError;
use crate::scalar::{DType, Element};
use crate::storage::Dense;
use crate::strides::{cartesian_to_linear, compute_strides};

/// A row-major n-dimensional tensor.
///
/// Tensors behave as immutable values: `clone` and [`Tensor::reshape`] share
/// the underlying buffer, and writes through [`Tensor::data_mut`] copy it
/// first when it is shared.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<ElT: Element> {
    storage: Dense<ElT>,
    shape: Vec<usize>,
    strides: Vec<usize>,
}

impl<ElT: Element> Tensor<ElT> {
    /// Create a new tensor with the given shape, zero-initialized.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::zeros(&[2, 3, 4]);
    /// assert_eq!(t.shape(), &[2, 3, 4]);
    /// assert_eq!(t.len(), 24);
    ///
    /// let s: Tensor<f64> = Tensor::zeros(&[]);
    /// assert_eq!(s.len(), 1);
    /// ```
    pub fn zeros(shape: &[usize]) -> Self {
        Self::from_raw(vec![ElT::default(); shape.iter().product()], shape)
    }

    /// Create a tensor filled with ones.
    pub fn ones(shape: &[usize]) -> Self {
        Self::from_raw(vec![ElT::cast_from_f64(1.0); shape.iter().product()], shape)
    }

    /// Create tensor from row-major data and shape.
    ///
    /// # Errors
    ///
    /// Returns `TensorError::ShapeMismatch` if data length doesn't match shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// assert_eq!(t.get(&[0, 1]), Some(&2.0));
    /// assert_eq!(t.get(&[1, 0]), Some(&4.0));
    /// ```
    pub fn from_vec(data: Vec<ElT>, shape: &[usize]) -> Result<Self, TensorError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(TensorError::ShapeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self::from_raw(data, shape))
    }

    /// Create a rank-0 tensor.
    pub fn scalar(value: ElT) -> Self {
        Self::from_raw(vec![value], &[])
    }

    /// Build a tensor whose length is already known to match `shape`.
    pub(crate) fn from_raw(data: Vec<ElT>, shape: &[usize]) -> Self {
        debug_assert_eq!(data.len(), shape.iter().product::<usize>());
        Self {
            storage: Dense::from_vec(data),
            shape: shape.to_vec(),
            strides: compute_strides(shape),
        }
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Get the rank (number of dimensions).
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Get total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[inline]
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        ElT::DTYPE
    }

    /// Row-major element slice.
    #[inline]
    pub fn data(&self) -> &[ElT] {
        self.storage.as_slice()
    }

    /// Mutable row-major element slice (copy-on-write).
    #[inline]
    pub fn data_mut(&mut self) -> &mut [ElT] {
        self.storage.as_mut_slice()
    }

    pub fn to_vec(&self) -> Vec<ElT> {
        self.data().to_vec()
    }

    pub fn into_vec(self) -> Vec<ElT> {
        self.storage.into_vec()
    }

    #[inline]
    pub fn get_linear(&self, index: usize) -> Option<&ElT> {
        self.data().get(index)
    }

    /// Element at cartesian `indices`, or `None` when out of range.
    pub fn get(&self, indices: &[usize]) -> Option<&ElT> {
        if indices.len() != self.ndim() || indices.iter().zip(&self.shape).any(|(&i, &d)| i >= d) {
            return None;
        }
        self.get_linear(cartesian_to_linear(indices, &self.strides))
    }

    /// Set element at cartesian `indices`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of indices or any index is out of range.
    pub fn set(&mut self, indices: &[usize], value: ElT) -> Result<(), TensorError> {
        if indices.len() != self.ndim() {
            return Err(TensorError::WrongNumberOfIndices {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        for (&index, &dim_size) in indices.iter().zip(&self.shape) {
            if index >= dim_size {
                return Err(TensorError::IndexOutOfBounds {
                    index: index as i64,
                    dim_size,
                });
            }
        }
        let linear = cartesian_to_linear(indices, &self.strides);
        self.data_mut()[linear] = value;
        Ok(())
    }

    pub fn fill(&mut self, value: ElT) {
        self.data_mut().fill(value);
    }

    /// Reshape the tensor, returning a view of the same data.
    ///
    /// # Errors
    ///
    /// Returns an error if the total number of elements doesn't match.
    ///
    /// # Example
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let t3x2 = t.reshape(&[3, 2]).unwrap();
    /// assert_eq!(t3x2.shape(), &[3, 2]);
    /// assert!(t.shares_storage_with(&t3x2));
    /// ```
    pub fn reshape(&self, new_shape: &[usize]) -> Result<Self, TensorError> {
        let new_len: usize = new_shape.iter().product();
        if self.len() != new_len {
            return Err(TensorError::ShapeMismatch {
                expected: self.len(),
                actual: new_len,
            });
        }
        Ok(Self {
            storage: self.storage.view(),
            shape: new_shape.to_vec(),
            strides: compute_strides(new_shape),
        })
    }

    /// Returns `true` if both tensors point to the same underlying data.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        self.storage.shares_storage_with(&other.storage)
    }

    /// Returns `true` if there are other views of this tensor's data.
    pub fn is_view(&self) -> bool {
        self.storage.is_shared()
    }

    /// Permute the dimensions of the tensor.
    ///
    /// `perm[i]` gives the source dimension for the i-th dimension of the result.
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    /// let t2 = t.permutedims(&[1, 0]).unwrap();
    /// assert_eq!(t2.shape(), &[3, 2]);
    /// assert_eq!(t.get(&[0, 2]), t2.get(&[2, 0]));
    /// ```
    pub fn permutedims(&self, perm: &[usize]) -> Result<Self, TensorError> {
        crate::operations::permutedims(self, perm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use half::f16;

    #[test]
    fn test_from_vec_length_mismatch() {
        let err = Tensor::from_vec(vec![1.0, 2.0], &[3]).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_zero_sized_dimension() {
        let t: Tensor<f32> = Tensor::zeros(&[2, 0]);
        assert!(t.is_empty());
        assert_eq!(t.get(&[0, 0]), None);
    }

    #[test]
    fn test_scalar() {
        let s = Tensor::scalar(3.5f64);
        assert_eq!(s.ndim(), 0);
        assert_eq!(s.get(&[]), Some(&3.5));
    }

    #[test]
    fn test_set_and_get() {
        let mut t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        t.set(&[1, 2], 7.0).unwrap();
        assert_eq!(t.get(&[1, 2]), Some(&7.0));
        assert_eq!(t.data()[5], 7.0);
        assert!(t.set(&[2, 0], 1.0).is_err());
        assert!(t.set(&[0], 1.0).is_err());
    }

    #[test]
    fn test_reshape_is_view_and_write_detaches() {
        let t = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
        let mut flat = t.reshape(&[4]).unwrap();
        assert!(flat.is_view());
        flat.fill(0.0);
        assert_eq!(t.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert!(!flat.shares_storage_with(&t));
    }

    #[test]
    fn test_reshape_mismatch() {
        let t: Tensor<f64> = Tensor::zeros(&[2, 3]);
        assert!(t.reshape(&[4]).is_err());
    }

    #[test]
    fn test_ones_and_dtype() {
        let t: Tensor<f16> = Tensor::ones(&[3]);
        assert_eq!(t.dtype(), DType::F16);
        assert!(t.data().iter().all(|&v| v == f16::ONE));
    }
}
