// Copyright 2025 Irreducible Inc.

use std::marker::PhantomData;

use brew_hal::{ComputeBackend, CpuBackend};
use brew_tensor::{Blob, Real};
use brew_utils::{bail, checked_arithmetics::exact_div, rayon::min_chunk_len};
use itertools::izip;
use rayon::prelude::*;
use tracing::instrument;

use crate::{layer::check_propagate_down, Error, Layer};

/// Multiplies each sample by a short vector repeated cyclically.
///
/// Bottom 0 is the data, bottom 1 holds `K` multipliers (typically shaped `(1, K, 1, 1)`). The
/// per-sample count `D` of the data must be a multiple of `K`; multiplier `k` applies to the
/// contiguous run `[k * D / K, (k + 1) * D / K)` of every sample. For `(N, C, H, W)` data with
/// `K = C` this is a per-channel scale.
#[derive(Debug)]
pub struct CycleMultLayer<T: Real, B: ComputeBackend = CpuBackend> {
	/// Length of the run each multiplier covers, set by reshape.
	interval: usize,
	backend: B,
	_marker: PhantomData<T>,
}

impl<T: Real> Default for CycleMultLayer<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Real> CycleMultLayer<T> {
	pub fn new() -> Self {
		Self::with_backend(CpuBackend)
	}
}

impl<T: Real, B: ComputeBackend> CycleMultLayer<T, B> {
	pub fn with_backend(backend: B) -> Self {
		Self {
			interval: 0,
			backend,
			_marker: PhantomData,
		}
	}

	pub fn interval(&self) -> usize {
		self.interval
	}
}

impl<T: Real, B: ComputeBackend> Layer<T> for CycleMultLayer<T, B> {
	fn type_name(&self) -> &'static str {
		"CycleMult"
	}

	fn exact_num_bottom_blobs(&self) -> Option<usize> {
		Some(2)
	}

	fn exact_num_top_blobs(&self) -> Option<usize> {
		Some(1)
	}

	fn reshape(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		let (data, mult) = (bottom[0], bottom[1]);
		let count = data.shape().count_from(1)?;
		let cycle = mult.count();
		let Some(interval) = exact_div(count, cycle) else {
			bail!(Error::IndivisibleCycle { count, cycle });
		};
		self.interval = interval;
		top[0].reshape_like(data);
		Ok(())
	}

	#[instrument(skip_all, name = "CycleMultLayer::forward", level = "debug")]
	fn forward(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		let (data, mult) = (bottom[0], bottom[1]);
		let top = &mut *top[0];
		let dim = mult.count() * self.interval;
		if dim == 0 {
			return Ok(());
		}

		let backend = &self.backend;
		let interval = self.interval;
		top.data_mut()
			.par_chunks_mut(dim)
			.zip(data.data().par_chunks(dim))
			.with_min_len(min_chunk_len(dim))
			.try_for_each(|(top_data, bottom_data)| -> Result<(), Error> {
				backend.scale(T::one(), bottom_data, top_data)?;
				backend.mul_broadcast_channels(mult.data(), interval, top_data)?;
				Ok(())
			})
	}

	#[instrument(skip_all, name = "CycleMultLayer::backward", level = "debug")]
	fn backward(
		&mut self,
		top: &[&Blob<T>],
		propagate_down: &[bool],
		bottom: &mut [&mut Blob<T>],
	) -> Result<(), Error> {
		check_propagate_down(propagate_down, bottom.len())?;
		let top = top[0];
		let n_bottom = bottom.len();
		let [data, mult] = bottom else {
			bail!(Error::IncorrectBlobCount {
				layer: "CycleMult",
				role: "bottom",
				expected: 2,
				actual: n_bottom,
			});
		};
		let interval = self.interval;
		let dim = mult.count() * interval;
		if dim == 0 {
			return Ok(());
		}
		let backend = &self.backend;

		if propagate_down[1] {
			let mult_diff = mult.diff_mut();
			for (top_diff, bottom_data) in
				izip!(top.diff().chunks_exact(dim), data.data().chunks_exact(dim))
			{
				for (mult_diff_k, top_diff_k, bottom_data_k) in izip!(
					mult_diff.iter_mut(),
					top_diff.chunks_exact(interval),
					bottom_data.chunks_exact(interval)
				) {
					*mult_diff_k = *mult_diff_k + backend.dot(top_diff_k, bottom_data_k)?;
				}
			}
		}

		if propagate_down[0] {
			let mult_data = mult.data();
			data.diff_mut()
				.par_chunks_mut(dim)
				.zip(top.diff().par_chunks(dim))
				.with_min_len(min_chunk_len(dim))
				.try_for_each(|(bottom_diff, top_diff)| -> Result<(), Error> {
					for (&m, top_diff_k, bottom_diff_k) in izip!(
						mult_data,
						top_diff.chunks_exact(interval),
						bottom_diff.chunks_exact_mut(interval)
					) {
						backend.axpby(m, top_diff_k, T::one(), bottom_diff_k)?;
					}
					Ok(())
				})?;
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	#[test]
	fn test_indivisible_cycle_is_rejected() {
		let mut layer = CycleMultLayer::<f32>::new();
		let data = Blob::new([2, 3, 4, 5]);
		let mult = Blob::new([1, 7, 1, 1]);
		let mut top = Blob::empty();
		assert_matches!(
			layer.setup(&[&data, &mult], &mut [&mut top]),
			Err(Error::IndivisibleCycle { count: 60, cycle: 7 })
		);
	}

	#[test]
	fn test_wrong_bottom_count_is_rejected() {
		let mut layer = CycleMultLayer::<f32>::new();
		let data = Blob::new([2, 3, 4, 5]);
		let mut top = Blob::empty();
		assert_matches!(
			layer.setup(&[&data], &mut [&mut top]),
			Err(Error::IncorrectBlobCount {
				role: "bottom",
				expected: 2,
				actual: 1,
				..
			})
		);
	}

	#[test]
	fn test_forward_small() {
		let mut layer = CycleMultLayer::<f64>::new();
		let data = Blob::from_vec([1, 4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
		let mult = Blob::from_vec([1, 2, 1, 1], vec![10.0, -1.0]).unwrap();
		let mut top = Blob::empty();
		layer.setup(&[&data, &mult], &mut [&mut top]).unwrap();
		assert_eq!(layer.interval(), 2);

		layer.forward(&[&data, &mult], &mut [&mut top]).unwrap();
		assert_eq!(top.data(), &[10.0, 20.0, -3.0, -4.0]);
	}
}
