// Copyright 2025 Irreducible Inc.

use anyhow::Result;
use brew_layers::{
	filler::{get_filler_with_rng, FillerParameter},
	CycleMultLayer, Layer,
};
use brew_hal::make_backend;
use brew_tensor::Blob;
use brew_utils::{rayon::adjust_thread_pool, tracing::init_tracing};
use clap::{value_parser, Parser};
use rand::{rngs::StdRng, SeedableRng};

#[derive(Debug, Parser)]
struct Args {
	#[arg(long, default_value_t = 32)]
	batch: usize,
	#[arg(long, default_value_t = 256)]
	channels: usize,
	#[arg(long, default_value_t = 32)]
	height: usize,
	#[arg(long, default_value_t = 32)]
	width: usize,
	/// The number of multipliers. Must divide channels * height * width.
	#[arg(long)]
	cycle: Option<usize>,
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

	let cycle = args.cycle.unwrap_or(args.channels);
	let shape = [args.batch, args.channels, args.height, args.width];
	println!("Multiplying {} samples by a cycle of {cycle}", args.batch);

	let mut uniform = get_filler_with_rng::<f32>(
		&FillerParameter::Uniform {
			min: -1.0,
			max: 1.0,
		},
		StdRng::seed_from_u64(0),
	)?;
	let mut data = Blob::new(shape);
	let mut mult = Blob::new([1, cycle, 1, 1]);
	uniform.fill(data.data_mut())?;
	uniform.fill(mult.data_mut())?;

	let mut layer = CycleMultLayer::<f32, _>::with_backend(make_backend());
	let mut top = Blob::empty();
	layer.setup(&[&data, &mult], &mut [&mut top])?;

	for _ in 0..args.iterations {
		let _scope = tracing::info_span!("iteration").entered();
		layer.forward(&[&data, &mult], &mut [&mut top])?;
		uniform.fill(top.diff_mut())?;
		data.set_diff(0.0);
		mult.set_diff(0.0);
		layer.backward(&[&top], &[true, true], &mut [&mut data, &mut mult])?;
	}

	let mult_grad_norm = mult.diff().iter().map(|g| g * g).sum::<f32>().sqrt();
	tracing::info!(interval = layer.interval(), mult_grad_norm, "finished");
	Ok(())
}
