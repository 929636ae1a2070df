// Copyright 2025 Irreducible Inc.

use anyhow::Result;
use brew_layers::{
	filler::{get_filler_with_rng, FillerParameter},
	Layer, NormalizeLayer, NormalizeParameter,
};
use brew_hal::make_backend;
use brew_tensor::Blob;
use brew_utils::{rayon::adjust_thread_pool, tracing::init_tracing};
use clap::{value_parser, Parser};
use rand::{rngs::StdRng, SeedableRng};

#[derive(Debug, Parser)]
struct Args {
	#[arg(long, default_value_t = 8)]
	batch: usize,
	#[arg(long, default_value_t = 512)]
	channels: usize,
	#[arg(long, default_value_t = 38)]
	height: usize,
	#[arg(long, default_value_t = 38)]
	width: usize,
	/// Normalize each spatial position over the channel axis instead of the whole sample.
	#[arg(long)]
	per_spatial_location: bool,
	/// Learn one scale per channel instead of a single shared one.
	#[arg(long)]
	per_channel_scale: bool,
	#[arg(long, default_value_t = 1e-10)]
	eps: f64,
	/// The number of forward and backward passes to run.
	#[arg(short, long, default_value_t = 10, value_parser = value_parser!(u32).range(1..))]
	iterations: u32,
}

fn main() -> Result<()> {
	adjust_thread_pool()
		.as_ref()
		.expect("failed to init thread pool");

	let args = Args::parse();

	init_tracing();

	let shape = [args.batch, args.channels, args.height, args.width];
	println!("Normalizing {} samples of shape {:?}", args.batch, &shape[1..]);

	let mut bottom = Blob::<f32>::new(shape);
	let mut gaussian = get_filler_with_rng::<f32>(
		&FillerParameter::Gaussian {
			mean: 0.0,
			std: 1.0,
		},
		StdRng::seed_from_u64(0),
	)?;
	gaussian.fill(bottom.data_mut())?;

	let mut layer = NormalizeLayer::<f32, _>::with_backend(
		NormalizeParameter {
			across_spatial: !args.per_spatial_location,
			channel_shared: !args.per_channel_scale,
			eps: args.eps,
			scale_filler: Some(FillerParameter::Constant { value: 20.0 }),
		},
		make_backend(),
	);
	let mut top = Blob::empty();
	layer.setup(&[&bottom], &mut [&mut top])?;

	for _ in 0..args.iterations {
		let _scope = tracing::info_span!("iteration").entered();
		{
			let _scope = tracing::info_span!("forward").entered();
			layer.forward(&[&bottom], &mut [&mut top])?;
		}
		gaussian.fill(top.diff_mut())?;
		bottom.set_diff(0.0);
		{
			let _scope = tracing::info_span!("backward").entered();
			layer.backward(&[&top], &[true], &mut [&mut bottom])?;
		}
	}

	let norm = layer.norm().data();
	let mean_norm = norm.iter().sum::<f32>() / norm.len() as f32;
	tracing::info!(mean_norm, "finished");
	Ok(())
}
