//! Random tensor construction.
//!
//! Samples are drawn in `f64` and rounded into the element type, so every
//! floating element type (including `f16`/`bf16`) shares one code path.

use rand::Rng;
use rand::distr::{StandardUniform, Uniform};
use rand_distr::StandardNormal;

use crate::scalar::Scalar;
use crate::tensor::Tensor;

impl<ElT: Scalar> Tensor<ElT> {
    /// Create a tensor with uniform random values in [0, 1).
    ///
    /// ```
    /// use ndgrad::Tensor;
    ///
    /// let t: Tensor<f64> = Tensor::random(&[2, 3]);
    /// assert!(t.data().iter().all(|v| (0.0..1.0).contains(v)));
    /// ```
    pub fn random(shape: &[usize]) -> Self {
        Self::random_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with uniform random values using a specific RNG.
    ///
    /// ```
    /// use ndgrad::Tensor;
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let t1: Tensor<f64> = Tensor::random_with_rng(&[2, 3], &mut StdRng::seed_from_u64(42));
    /// let t2: Tensor<f64> = Tensor::random_with_rng(&[2, 3], &mut StdRng::seed_from_u64(42));
    /// assert_eq!(t1.data(), t2.data());
    /// ```
    pub fn random_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let len: usize = shape.iter().product();
        let data = (0..len)
            .map(|_| ElT::cast_from_f64(rng.sample::<f64, _>(StandardUniform)))
            .collect();
        Self::from_raw(data, shape)
    }

    /// Create a tensor with uniform random values in `[low, high)`.
    ///
    /// Finite-difference checks use this to keep sample points away from
    /// kinks and domain boundaries. An empty or non-finite range yields
    /// `low` everywhere.
    pub fn random_range_with_rng<R: Rng>(
        shape: &[usize],
        low: f64,
        high: f64,
        rng: &mut R,
    ) -> Self {
        let len: usize = shape.iter().product();
        let data = match Uniform::new(low, high) {
            Ok(dist) => (0..len).map(|_| ElT::cast_from_f64(rng.sample(&dist))).collect(),
            Err(_) => vec![ElT::cast_from_f64(low); len],
        };
        Self::from_raw(data, shape)
    }

    /// Create a tensor with standard normal random values.
    pub fn randn(shape: &[usize]) -> Self {
        Self::randn_with_rng(shape, &mut rand::rng())
    }

    /// Create a tensor with standard normal random values using a specific RNG.
    pub fn randn_with_rng<R: Rng>(shape: &[usize], rng: &mut R) -> Self {
        let len: usize = shape.iter().product();
        let data = (0..len)
            .map(|_| ElT::cast_from_f64(rng.sample::<f64, _>(StandardNormal)))
            .collect();
        Self::from_raw(data, shape)
    }
}
