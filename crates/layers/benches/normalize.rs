// Copyright 2025 Irreducible Inc.

use std::mem;

use brew_layer_test_utils::gaussian_blob;
use brew_layers::{Layer, NormalizeLayer, NormalizeParameter};
use brew_tensor::Blob;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const SHAPES: [[usize; 4]; 3] = [[1, 64, 38, 38], [8, 64, 38, 38], [8, 512, 19, 19]];

fn bench_normalize(c: &mut Criterion) {
	for (name, across_spatial) in [("across_spatial", true), ("per_spatial_location", false)] {
		let mut group = c.benchmark_group(format!("Normalize {name}"));
		for shape in SHAPES {
			let bottom = gaussian_blob::<f32>(shape, 0);
			let mut bottom_grad = bottom.clone();
			let mut top = Blob::empty();
			let mut layer = NormalizeLayer::<f32>::new(NormalizeParameter {
				across_spatial,
				channel_shared: false,
				..Default::default()
			});
			layer.setup(&[&bottom], &mut [&mut top]).unwrap();
			let id = format!("{shape:?}");

			group.throughput(Throughput::Bytes((bottom.count() * mem::size_of::<f32>()) as u64));
			group.bench_function(BenchmarkId::new("forward", &id), |b| {
				b.iter(|| layer.forward(&[&bottom], &mut [&mut top]).unwrap())
			});

			top.copy_data_to_diff();
			group.bench_function(BenchmarkId::new("backward", &id), |b| {
				b.iter(|| {
					layer
						.backward(&[&top], &[true], &mut [&mut bottom_grad])
						.unwrap()
				})
			});
		}
		group.finish();
	}
}

criterion_group!(normalize, bench_normalize);
criterion_main!(normalize);
