// Copyright 2025 Irreducible Inc.

use std::mem;

use brew_layer_test_utils::gaussian_blob;
use brew_layers::{CycleMultLayer, Layer};
use brew_tensor::Blob;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bench_cycle_mult(c: &mut Criterion) {
	let mut group = c.benchmark_group("CycleMult");
	for batch in [1, 8, 32] {
		let data = gaussian_blob::<f32>([batch, 256, 32, 32], 0);
		let mult = gaussian_blob::<f32>([1, 256, 1, 1], 1);
		let mut top = Blob::empty();
		let mut layer = CycleMultLayer::<f32>::new();
		layer.setup(&[&data, &mult], &mut [&mut top]).unwrap();

		group.throughput(Throughput::Bytes((data.count() * mem::size_of::<f32>()) as u64));
		group.bench_with_input(BenchmarkId::new("forward", batch), &batch, |b, _| {
			b.iter(|| layer.forward(&[&data, &mult], &mut [&mut top]).unwrap())
		});

		top.copy_data_to_diff();
		let (mut data_grad, mut mult_grad) = (data.clone(), mult.clone());
		group.bench_with_input(BenchmarkId::new("backward", batch), &batch, |b, _| {
			b.iter(|| {
				layer
					.backward(&[&top], &[true, true], &mut [&mut data_grad, &mut mult_grad])
					.unwrap()
			})
		});
	}
	group.finish();
}

criterion_group!(cycle_mult, bench_cycle_mult);
criterion_main!(cycle_mult);
