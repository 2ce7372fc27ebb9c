//! Behavioural contracts shared by every gradient rule: the reference
//! scenarios, zero-copy aliasing, null-slot short-circuiting, determinism
//! and reduced-precision accuracy.

use approx::assert_relative_eq;
use half::{bf16, f16};
use ndgrad::operations as ops;
use ndgrad::profiling;
use ndgrad::vjp::{
    self, DropoutAttrs, DropoutMode, GradSlot, LayerNormAttrs, ReduceAttrs, SliceAttrs,
};
use ndgrad::{Tensor, VjpError};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn vector(data: &[f64]) -> Tensor<f64> {
    Tensor::from_vec(data.to_vec(), &[data.len()]).unwrap()
}

#[test]
fn test_scenario_add_broadcast() {
    let x = Tensor::<f64>::zeros(&[2, 3]);
    let y = Tensor::<f64>::zeros(&[3]);
    let grad_output = Tensor::ones(&[2, 3]);
    let mut grad_x = GradSlot::requested();
    let mut grad_y = GradSlot::requested();
    vjp::add_vjp(&x, &y, &grad_output, &mut grad_x, &mut grad_y).unwrap();

    let dx = grad_x.into_inner().unwrap();
    assert!(dx.shares_storage_with(&grad_output));
    assert_eq!(dx.data(), &[1.0; 6]);
    let dy = grad_y.into_inner().unwrap();
    assert_eq!(dy.shape(), &[3]);
    assert_eq!(dy.data(), &[2.0, 2.0, 2.0]);
}

#[test]
fn test_scenario_relu() {
    let out = vector(&[0.0, 2.0, 0.0, 0.0]);
    let grad_output = vector(&[1.0, 1.0, 1.0, 1.0]);
    let mut grad_x = GradSlot::requested();
    vjp::relu_vjp(&out, &grad_output, &mut grad_x).unwrap();
    assert_eq!(grad_x.get().unwrap().data(), &[0.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_scenario_softmax() {
    let out = vector(&[0.5, 0.5]);
    let grad_output = vector(&[1.0, 0.0]);
    let mut grad_x = GradSlot::requested();
    vjp::softmax_vjp(&out, &grad_output, -1, &mut grad_x).unwrap();
    let dx = grad_x.into_inner().unwrap();
    assert_relative_eq!(dx.data()[0], 0.25);
    assert_relative_eq!(dx.data()[1], -0.25);
}

#[test]
fn test_scenario_dropout() {
    let mode: DropoutMode = "upscale_in_train".parse().unwrap();
    let attrs = DropoutAttrs { p: 0.5, is_test: false, mode };
    let mask = Tensor::from_vec(vec![1u8, 0, 1, 0], &[4]).unwrap();
    let grad_output = vector(&[1.0, 1.0, 1.0, 1.0]);
    let mut grad_x = GradSlot::requested();
    vjp::dropout_vjp(&mask, &grad_output, &attrs, &mut grad_x).unwrap();
    assert_eq!(grad_x.get().unwrap().data(), &[2.0, 0.0, 2.0, 0.0]);
}

#[test]
fn test_unrecognized_dropout_mode_downgrades() {
    let mode: DropoutMode = "upscale".parse().unwrap();
    let attrs = DropoutAttrs { p: 0.25, is_test: true, mode };
    let mask = Tensor::from_vec(vec![1u8, 0], &[2]).unwrap();
    let grad_output = vector(&[4.0, 8.0]);
    let mut grad_x = GradSlot::requested();
    vjp::dropout_vjp(&mask, &grad_output, &attrs, &mut grad_x).unwrap();
    assert_eq!(grad_x.get().unwrap().data(), &[3.0, 6.0]);
}

#[test]
fn test_scenario_layer_norm_single_row() {
    let row = [0.2, -1.3, 0.7, 2.1, -0.4];
    let n = row.len() as f64;
    let mean = row.iter().sum::<f64>() / n;
    let var = row.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let weights = [0.5, -1.0, 2.0, 0.3, 1.1];
    let attrs = LayerNormAttrs {
        begin_norm_axis: 1,
        ..Default::default()
    };

    let loss = |x: &[f64]| {
        let m = x.iter().sum::<f64>() / n;
        let v = x.iter().map(|p| (p - m) * (p - m)).sum::<f64>() / n;
        x.iter()
            .zip(&weights)
            .map(|(p, w)| (p - m) / (v + attrs.epsilon).sqrt() * w)
            .sum::<f64>()
    };

    let x = Tensor::from_vec(row.to_vec(), &[1, 5]).unwrap();
    let g = Tensor::from_vec(weights.to_vec(), &[1, 5]).unwrap();
    let mut grad_x = GradSlot::requested();
    vjp::layer_norm_vjp(
        &x,
        &vector(&[mean]),
        &vector(&[var]),
        None,
        None,
        &g,
        &attrs,
        &mut grad_x,
        &mut GradSlot::skipped(),
        &mut GradSlot::skipped(),
    )
    .unwrap();

    let eps = 1e-6;
    for (i, analytic) in grad_x.get().unwrap().data().iter().enumerate() {
        let mut plus = row;
        let mut minus = row;
        plus[i] += eps;
        minus[i] -= eps;
        let numeric = (loss(&plus) - loss(&minus)) / (2.0 * eps);
        assert_relative_eq!(*analytic, numeric, epsilon = 1e-6, max_relative = 1e-5);
    }
}

#[test]
fn test_binary_rules_alias_matching_shapes() {
    let x = vector(&[1.0, 2.0, 3.0]);
    let y = vector(&[4.0, 5.0, 6.0]);
    let g = vector(&[1.0, 1.0, 1.0]);

    let (_, tally) = profiling::record(|| {
        let mut grad_x = GradSlot::requested();
        let mut grad_y = GradSlot::requested();
        vjp::add_vjp(&x, &y, &g, &mut grad_x, &mut grad_y).unwrap();
        assert!(grad_x.get().unwrap().shares_storage_with(&g));
        assert!(grad_y.get().unwrap().shares_storage_with(&g));
    });
    assert!(tally.is_empty());

    let (_, tally) = profiling::record(|| {
        let mut grad_x = GradSlot::requested();
        let mut grad_y = GradSlot::requested();
        vjp::multiply_vjp(&x, &y, &g, &mut grad_x, &mut grad_y).unwrap();
    });
    assert_eq!(tally.count("sum"), 0);
    assert_eq!(tally.count("mul"), 2);
}

#[test]
fn test_broadcast_reduction_reduces_only_stretched_axes() {
    let x = Tensor::<f64>::zeros(&[4, 1, 3]);
    let y = Tensor::<f64>::zeros(&[2, 1]);
    let g = Tensor::<f64>::ones(&[4, 2, 3]);
    let mut grad_x = GradSlot::requested();
    let mut grad_y = GradSlot::requested();
    let ((), tally) =
        profiling::record(|| vjp::subtract_vjp(&x, &y, &g, &mut grad_x, &mut grad_y).unwrap());

    assert_eq!(tally.count("sum"), 2);
    assert_eq!(grad_x.get().unwrap().shape(), &[4, 1, 3]);
    assert_eq!(grad_x.get().unwrap().data(), &[2.0; 12]);
    assert_eq!(grad_y.get().unwrap().shape(), &[2, 1]);
    assert_eq!(grad_y.get().unwrap().data(), &[-12.0, -12.0]);
}

#[test]
fn test_reduce_dims_and_restore_are_consistent() {
    let cases: &[(&[usize], &[usize])] = &[
        (&[2, 3], &[3]),
        (&[2, 3], &[1, 3]),
        (&[5, 4, 3], &[4, 1]),
        (&[5, 4, 3], &[5, 4, 3]),
        (&[7], &[]),
    ];
    for &(large, small) in cases {
        let axes = vjp::reduce_dims(large, small).unwrap();
        assert_eq!(axes.is_empty(), large == small);
        assert_eq!(axes, vjp::reduce_dims_from_output(large, small).unwrap());

        let t = Tensor::<f64>::ones(large);
        let reduced = ops::sum(&t, &axes, false).unwrap();
        assert_eq!(reduced.len(), small.iter().product::<usize>());
        assert_eq!(ops::reshape(&reduced, small).unwrap().shape(), small);

        let restored = vjp::restore_reduced_axes(&axes, reduced.shape());
        assert_eq!(restored.len(), large.len());
        for (axis, &dim) in restored.iter().enumerate() {
            if axes.contains(&axis) {
                assert_eq!(dim, 1);
            } else {
                assert_eq!(dim, large[axis]);
            }
        }
    }
}

#[test]
fn test_incompatible_shapes_are_rejected() {
    let err = vjp::reduce_dims(&[2, 3], &[2]).unwrap_err();
    assert!(matches!(err, VjpError::ShapeMismatch { .. }));
    let err = vjp::reduce_dims(&[3], &[2, 3]).unwrap_err();
    assert!(matches!(err, VjpError::ShapeMismatch { .. }));
}

/// Run `f` and assert it invoked no primitive.
fn assert_no_primitives(name: &str, f: impl FnOnce() -> Result<(), VjpError>) {
    let (result, tally) = profiling::record(f);
    result.unwrap_or_else(|e| panic!("{name}: {e}"));
    assert!(tally.is_empty(), "{name} ran primitives for skipped slots: {tally:?}");
}

#[test]
fn test_skipped_slots_run_no_primitives() {
    let x = Tensor::<f64>::ones(&[2, 3]);
    let y = Tensor::<f64>::ones(&[3]);
    let index = Tensor::from_vec(vec![0i64, 1], &[2]).unwrap();
    let index_nd = Tensor::from_vec(vec![0i64, 1], &[2, 1]).unwrap();
    let mask = Tensor::from_vec(vec![true; 6], &[2, 3]).unwrap();
    let skip = GradSlot::<f64>::skipped;

    assert_no_primitives("abs", || vjp::abs_vjp(&x, &x, &mut skip()));
    assert_no_primitives("sin", || vjp::sin_vjp(&x, &x, &mut skip()));
    assert_no_primitives("cos", || vjp::cos_vjp(&x, &x, &mut skip()));
    assert_no_primitives("exp", || vjp::exp_vjp(&x, &x, &mut skip()));
    assert_no_primitives("log", || vjp::log_vjp(&x, &x, &mut skip()));
    assert_no_primitives("sqrt", || vjp::sqrt_vjp(&x, &x, &mut skip()));
    assert_no_primitives("tanh", || vjp::tanh_vjp(&x, &x, &mut skip()));
    assert_no_primitives("erf", || vjp::erf_vjp(&x, &x, &mut skip()));
    assert_no_primitives("floor", || vjp::floor_vjp(&x, &mut skip()));
    assert_no_primitives("assign", || vjp::assign_vjp(&x, &mut skip()));
    assert_no_primitives("cast", || vjp::cast_vjp(&x, &mut GradSlot::<f32>::skipped()));

    assert_no_primitives("relu", || vjp::relu_vjp(&x, &x, &mut skip()));
    assert_no_primitives("leaky_relu", || vjp::leaky_relu_vjp(&x, &x, 0.1, &mut skip()));
    assert_no_primitives("hardswish", || vjp::hardswish_vjp(&x, &x, &mut skip()));
    assert_no_primitives("sigmoid", || vjp::sigmoid_vjp(&x, &x, &mut skip()));
    assert_no_primitives("silu", || vjp::silu_vjp(&x, &x, &x, &mut skip()));
    assert_no_primitives("gelu", || vjp::gelu_vjp(&x, &x, true, &mut skip()));
    assert_no_primitives("softmax", || vjp::softmax_vjp(&x, &x, -1, &mut skip()));

    assert_no_primitives("add", || vjp::add_vjp(&x, &y, &x, &mut skip(), &mut skip()));
    assert_no_primitives("subtract", || vjp::subtract_vjp(&x, &y, &x, &mut skip(), &mut skip()));
    assert_no_primitives("multiply", || vjp::multiply_vjp(&x, &y, &x, &mut skip(), &mut skip()));
    assert_no_primitives("divide", || vjp::divide_vjp(&x, &y, &x, &mut skip(), &mut skip()));
    assert_no_primitives("pow", || vjp::elementwise_pow_vjp(&x, &y, &x, &mut skip(), &mut skip()));
    assert_no_primitives("maximum", || vjp::maximum_vjp(&x, &y, &x, &mut skip(), &mut skip()));
    assert_no_primitives("minimum", || vjp::minimum_vjp(&x, &y, &x, &mut skip(), &mut skip()));

    let reduce = ReduceAttrs::new(vec![1], false);
    assert_no_primitives("sum", || vjp::sum_vjp(&x, &y, &reduce, &mut skip()));
    assert_no_primitives("max", || vjp::max_vjp(&x, &y, &y, &reduce, &mut skip()));
    assert_no_primitives("prod", || vjp::prod_vjp(&x, &y, &y, &reduce, &mut skip()));
    assert_no_primitives("cumsum", || vjp::cumsum_vjp(&x, &x, &Default::default(), &mut skip()));

    assert_no_primitives("reshape", || vjp::reshape_vjp(&[6], &x, &mut skip()));
    assert_no_primitives("transpose", || vjp::transpose_vjp(&x, &[1, 0], &mut skip()));
    assert_no_primitives("expand", || vjp::expand_vjp(&y, &x, &mut skip()));
    assert_no_primitives("tile", || vjp::tile_vjp(&y, &x, &[2, 1], &mut skip()));
    assert_no_primitives("slice", || vjp::slice_vjp(&x, &x, &SliceAttrs::default(), &mut skip()));
    assert_no_primitives("pad", || vjp::pad_vjp(&x, &[(0, 0), (0, 0)], &mut skip()));
    assert_no_primitives("roll", || vjp::roll_vjp(&x, &[1], &[], &mut skip()));
    assert_no_primitives("split", || vjp::split_vjp(&[x.clone()], 0, &mut skip()));
    assert_no_primitives("concat", || vjp::concat_vjp(&[&x], &x, 0, &mut [skip()]));

    assert_no_primitives("gather", || vjp::gather_vjp(&x, &index, &x, 0, &mut skip()));
    assert_no_primitives("gather_nd", || vjp::gather_nd_vjp(&x, &index_nd, &x, &mut skip()));
    assert_no_primitives("scatter", || vjp::scatter_vjp(&index, &x, &x, &mut skip(), &mut skip()));
    assert_no_primitives("scatter_nd_add", || {
        vjp::scatter_nd_add_vjp(&index_nd, &x, &mut skip(), &mut skip())
    });
    assert_no_primitives("topk", || vjp::topk_vjp(&x, &index_nd, &x, -1, &mut skip()));

    let stats = Tensor::<f64>::ones(&[2]);
    assert_no_primitives("layer_norm", || {
        vjp::layer_norm_vjp(
            &x,
            &stats,
            &stats,
            Some(&y),
            Some(&y),
            &x,
            &LayerNormAttrs::default(),
            &mut skip(),
            &mut skip(),
            &mut skip(),
        )
    });
    assert_no_primitives("instance_norm", || {
        vjp::instance_norm_vjp(&x, None, &x, &x, &x, &mut skip(), &mut skip(), &mut skip())
    });
    assert_no_primitives("dropout", || {
        vjp::dropout_vjp(&mask, &x, &DropoutAttrs::default(), &mut skip())
    });
}

#[test]
fn test_rules_are_deterministic() {
    let mut rng = StdRng::seed_from_u64(7);
    let x: Tensor<f64> = Tensor::randn_with_rng(&[3, 4], &mut rng);
    let g: Tensor<f64> = Tensor::randn_with_rng(&[3, 4], &mut rng);
    let run = || {
        let mut slot = GradSlot::requested();
        vjp::gelu_vjp(&x, &g, false, &mut slot).unwrap();
        slot.into_inner().unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_written_gradients_match_input_type_and_shape() {
    let x = Tensor::from_vec(vec![bf16::from_f32(0.5); 6], &[2, 3]).unwrap();
    let y = Tensor::from_vec(vec![bf16::from_f32(2.0); 3], &[3]).unwrap();
    let g = Tensor::from_vec(vec![bf16::from_f32(1.0); 6], &[2, 3]).unwrap();
    let mut grad_x = GradSlot::requested();
    let mut grad_y = GradSlot::requested();
    vjp::divide_vjp(&x, &y, &g, &mut grad_x, &mut grad_y).unwrap();
    assert_eq!(grad_x.get().unwrap().dtype(), x.dtype());
    assert_eq!(grad_x.get().unwrap().shape(), x.shape());
    assert_eq!(grad_y.get().unwrap().dtype(), y.dtype());
    assert_eq!(grad_y.get().unwrap().shape(), y.shape());
}

#[test]
fn test_half_precision_tracks_double_reference() {
    let mut rng = StdRng::seed_from_u64(11);
    let x64: Tensor<f64> = Tensor::random_range_with_rng(&[16], -3.0, 3.0, &mut rng);
    let g64: Tensor<f64> = Tensor::randn_with_rng(&[16], &mut rng);
    let x16: Tensor<f16> = ops::cast(&x64);
    let g16: Tensor<f16> = ops::cast(&g64);

    let mut reference = GradSlot::<f64>::requested();
    // evaluate the reference at the rounded sample points
    vjp::gelu_vjp(&ops::cast(&x16), &ops::cast(&g16), true, &mut reference).unwrap();
    let mut reduced = GradSlot::requested();
    vjp::gelu_vjp(&x16, &g16, true, &mut reduced).unwrap();

    for (r, h) in reference.get().unwrap().data().iter().zip(reduced.get().unwrap().data()) {
        assert_relative_eq!(*r, h.to_f64(), epsilon = 1e-2, max_relative = 1e-2);
    }
}
