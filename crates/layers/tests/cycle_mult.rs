// Copyright 2025 Irreducible Inc.

use brew_layer_test_utils::{gaussian_blob, GradientChecker};
use brew_layers::{CycleMultLayer, Layer};
use brew_tensor::Blob;
use proptest::prelude::*;

#[test]
fn test_gradient_per_channel() {
	let mut layer = CycleMultLayer::<f64>::new();
	GradientChecker::new(1e-4, 1e-3).check_gradient_exhaustive(
		&mut layer,
		&mut [
			gaussian_blob::<f64>([2, 3, 2, 2], 0),
			gaussian_blob([1, 3, 1, 1], 1),
		],
		&mut [Blob::empty()],
		None,
	);
}

#[test]
fn test_gradient_data_only() {
	let mut layer = CycleMultLayer::<f64>::new();
	GradientChecker::default().check_gradient(
		&mut layer,
		&mut [
			gaussian_blob::<f64>([3, 4, 3, 2], 2),
			gaussian_blob([1, 6, 1, 1], 3),
		],
		&mut [Blob::empty()],
		Some(0),
	);
}

proptest! {
	#[test]
	fn test_forward_matches_reference(
		num in 1usize..4,
		cycle in 1usize..5,
		interval in 1usize..6,
		seed in any::<u64>(),
	) {
		let data = gaussian_blob::<f64>([num, cycle * interval], seed);
		let mult = gaussian_blob::<f64>([1, cycle, 1, 1], seed.wrapping_add(1));
		let mut top = Blob::empty();
		let mut layer = CycleMultLayer::<f64>::new();
		layer.setup(&[&data, &mult], &mut [&mut top]).unwrap();
		layer.forward(&[&data, &mult], &mut [&mut top]).unwrap();
		prop_assert_eq!(layer.interval(), interval);

		let dim = cycle * interval;
		for n in 0..num {
			for i in 0..dim {
				let expected = data.data()[n * dim + i] * mult.data()[i / interval];
				prop_assert_eq!(top.data()[n * dim + i], expected);
			}
		}
	}
}
