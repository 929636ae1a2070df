// Copyright 2025 Irreducible Inc.

use brew_tensor::Real;
use brew_utils::ensure;
use itertools::izip;

use crate::{ComputeBackend, Error};

/// Implementation of [`ComputeBackend`] that runs every kernel on the calling thread.
///
/// The kernels are plain loops written for readability; they are the numerical reference that
/// accelerated backends are tested against.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

fn check_len(arg: &str, len: usize, expected: usize) -> Result<(), Error> {
	ensure!(
		len == expected,
		Error::IncorrectArgumentLength {
			arg: arg.into(),
			expected,
		}
	);
	Ok(())
}

/// Checks that `len` splits into rows of `row_len`; an empty row length only admits an empty
/// slice.
fn check_rows(arg: &str, len: usize, row_len: usize) -> Result<(), Error> {
	let divisible = match row_len {
		0 => len == 0,
		_ => len % row_len == 0,
	};
	ensure!(
		divisible,
		Error::IndivisibleArgumentLength {
			arg: arg.into(),
			len,
			divisor: row_len,
		}
	);
	Ok(())
}

impl ComputeBackend for CpuBackend {
	fn sqr<T: Real>(&self, x: &[T], y: &mut [T]) -> Result<(), Error> {
		check_len("y", y.len(), x.len())?;
		for (y_i, &x_i) in izip!(y.iter_mut(), x) {
			*y_i = x_i * x_i;
		}
		Ok(())
	}

	fn asum<T: Real>(&self, x: &[T]) -> Result<T, Error> {
		Ok(x.iter().fold(T::zero(), |acc, x_i| acc + x_i.abs()))
	}

	fn dot<T: Real>(&self, x: &[T], y: &[T]) -> Result<T, Error> {
		check_len("y", y.len(), x.len())?;
		Ok(izip!(x, y).fold(T::zero(), |acc, (&x_i, &y_i)| acc + x_i * y_i))
	}

	fn scale<T: Real>(&self, alpha: T, x: &[T], y: &mut [T]) -> Result<(), Error> {
		check_len("y", y.len(), x.len())?;
		for (y_i, &x_i) in izip!(y.iter_mut(), x) {
			*y_i = alpha * x_i;
		}
		Ok(())
	}

	fn scal<T: Real>(&self, alpha: T, y: &mut [T]) -> Result<(), Error> {
		for y_i in y.iter_mut() {
			*y_i = *y_i * alpha;
		}
		Ok(())
	}

	fn axpby<T: Real>(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) -> Result<(), Error> {
		check_len("y", y.len(), x.len())?;
		for (y_i, &x_i) in izip!(y.iter_mut(), x) {
			*y_i = alpha * x_i + beta * *y_i;
		}
		Ok(())
	}

	fn mul<T: Real>(&self, a: &[T], b: &[T], y: &mut [T]) -> Result<(), Error> {
		check_len("b", b.len(), a.len())?;
		check_len("y", y.len(), a.len())?;
		for (y_i, &a_i, &b_i) in izip!(y.iter_mut(), a, b) {
			*y_i = a_i * b_i;
		}
		Ok(())
	}

	fn div_assign<T: Real>(&self, x: &[T], y: &mut [T]) -> Result<(), Error> {
		check_len("y", y.len(), x.len())?;
		for (y_i, &x_i) in izip!(y.iter_mut(), x) {
			*y_i = *y_i / x_i;
		}
		Ok(())
	}

	fn add_assign<T: Real>(&self, x: &[T], y: &mut [T]) -> Result<(), Error> {
		check_len("y", y.len(), x.len())?;
		for (y_i, &x_i) in izip!(y.iter_mut(), x) {
			*y_i = *y_i + x_i;
		}
		Ok(())
	}

	fn powx<T: Real>(&self, x: &[T], p: T, y: &mut [T]) -> Result<(), Error> {
		check_len("y", y.len(), x.len())?;
		for (y_i, &x_i) in izip!(y.iter_mut(), x) {
			*y_i = x_i.powf(p);
		}
		Ok(())
	}

	fn powx_assign<T: Real>(&self, p: T, y: &mut [T]) -> Result<(), Error> {
		for y_i in y.iter_mut() {
			*y_i = y_i.powf(p);
		}
		Ok(())
	}

	fn add_channel_sums<T: Real>(
		&self,
		x: &[T],
		spatial_dim: usize,
		out: &mut [T],
	) -> Result<(), Error> {
		check_len("out", out.len(), spatial_dim)?;
		check_rows("x", x.len(), spatial_dim)?;
		if spatial_dim == 0 {
			return Ok(());
		}
		for channel in x.chunks_exact(spatial_dim) {
			for (out_p, &x_cp) in izip!(out.iter_mut(), channel) {
				*out_p = *out_p + x_cp;
			}
		}
		Ok(())
	}

	fn add_spatial_sums<T: Real>(
		&self,
		x: &[T],
		spatial_dim: usize,
		out: &mut [T],
	) -> Result<(), Error> {
		check_len("x", x.len(), out.len() * spatial_dim)?;
		if spatial_dim == 0 {
			return Ok(());
		}
		for (out_c, channel) in izip!(out.iter_mut(), x.chunks_exact(spatial_dim)) {
			*out_c = channel.iter().fold(*out_c, |acc, &x_cp| acc + x_cp);
		}
		Ok(())
	}

	fn mul_broadcast_channels<T: Real>(
		&self,
		per_channel: &[T],
		spatial_dim: usize,
		y: &mut [T],
	) -> Result<(), Error> {
		check_len("y", y.len(), per_channel.len() * spatial_dim)?;
		if spatial_dim == 0 {
			return Ok(());
		}
		for (&factor, channel) in izip!(per_channel, y.chunks_exact_mut(spatial_dim)) {
			for y_cp in channel.iter_mut() {
				*y_cp = *y_cp * factor;
			}
		}
		Ok(())
	}

	fn mul_broadcast_spatial<T: Real>(&self, per_position: &[T], y: &mut [T]) -> Result<(), Error> {
		check_rows("y", y.len(), per_position.len())?;
		if per_position.is_empty() {
			return Ok(());
		}
		for channel in y.chunks_exact_mut(per_position.len()) {
			for (y_cp, &factor) in izip!(channel.iter_mut(), per_position) {
				*y_cp = *y_cp * factor;
			}
		}
		Ok(())
	}

	fn div_broadcast_spatial<T: Real>(&self, per_position: &[T], y: &mut [T]) -> Result<(), Error> {
		check_rows("y", y.len(), per_position.len())?;
		if per_position.is_empty() {
			return Ok(());
		}
		for channel in y.chunks_exact_mut(per_position.len()) {
			for (y_cp, &divisor) in izip!(channel.iter_mut(), per_position) {
				*y_cp = *y_cp / divisor;
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	// (channels = 2, spatial_dim = 3)
	const X: [f64; 6] = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

	#[test]
	fn test_reductions() {
		let backend = CpuBackend;
		assert_eq!(backend.asum(&[-1.0, 2.0, -3.0]).unwrap(), 6.0);
		assert_eq!(backend.dot(&X, &X).unwrap(), 91.0);
		assert_matches!(
			backend.dot(&X, &X[..5]),
			Err(Error::IncorrectArgumentLength { .. })
		);
	}

	#[test]
	fn test_channel_and_spatial_sums_accumulate() {
		let backend = CpuBackend;

		let mut per_position = [1.0; 3];
		backend.add_channel_sums(&X, 3, &mut per_position).unwrap();
		assert_eq!(per_position, [6.0, 8.0, 10.0]);

		let mut per_channel = [0.5; 2];
		backend.add_spatial_sums(&X, 3, &mut per_channel).unwrap();
		assert_eq!(per_channel, [6.5, 15.5]);

		assert_matches!(
			backend.add_channel_sums(&X[..5], 3, &mut per_position),
			Err(Error::IndivisibleArgumentLength { .. })
		);
		assert_matches!(
			backend.add_spatial_sums(&X, 2, &mut per_channel),
			Err(Error::IncorrectArgumentLength { .. })
		);
	}

	#[test]
	fn test_broadcasts() {
		let backend = CpuBackend;

		let mut y = X;
		backend
			.mul_broadcast_channels(&[2.0, -1.0], 3, &mut y)
			.unwrap();
		assert_eq!(y, [2.0, 4.0, 6.0, -4.0, -5.0, -6.0]);

		let mut y = X;
		backend
			.mul_broadcast_spatial(&[1.0, 0.0, 2.0], &mut y)
			.unwrap();
		assert_eq!(y, [1.0, 0.0, 6.0, 4.0, 0.0, 12.0]);

		let mut y = X;
		backend
			.div_broadcast_spatial(&[1.0, 2.0, 3.0], &mut y)
			.unwrap();
		assert_eq!(y, [1.0, 1.0, 1.0, 4.0, 2.5, 2.0]);
	}

	#[test]
	fn test_elementwise() {
		let backend = CpuBackend;

		let mut y = [0.0; 6];
		backend.sqr(&X, &mut y).unwrap();
		assert_eq!(y, [1.0, 4.0, 9.0, 16.0, 25.0, 36.0]);

		backend.powx_assign(0.5, &mut y).unwrap();
		for (&y_i, &x_i) in izip!(&y, &X) {
			assert!((y_i - x_i).abs() < 1e-12);
		}

		let mut y = [1.0; 6];
		backend.axpby(2.0, &X, -1.0, &mut y).unwrap();
		assert_eq!(y, [1.0, 3.0, 5.0, 7.0, 9.0, 11.0]);

		let mut acc = [1.0; 6];
		backend.add_assign(&X, &mut acc).unwrap();
		assert_eq!(acc, [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);

		backend.div_assign(&[2.0, 3.0, 4.0, 5.0, 6.0, 7.0], &mut acc).unwrap();
		assert_eq!(acc, [1.0; 6]);
	}

	#[test]
	fn test_empty_spatial_dim() {
		let backend = CpuBackend;
		let mut out: [f32; 0] = [];
		backend.add_channel_sums(&[], 0, &mut out).unwrap();
		backend.mul_broadcast_spatial(&[], &mut out).unwrap();
	}
}
