// Copyright 2025 Irreducible Inc.

use std::fmt::Debug;

use auto_impl::auto_impl;
use brew_tensor::Real;

use crate::Error;

/// An abstraction to interface with acceleration hardware to perform the dense kernels of a
/// layer pass.
///
/// All slices are row-major. Where a method takes a `spatial_dim`, its tensor arguments are
/// single samples laid out as `(channels, spatial_dim)`, with channel `c` at
/// `[c * spatial_dim..(c + 1) * spatial_dim]`; the channel count is implied by the lengths.
///
/// Output slices never alias inputs. Length mismatches are reported as
/// [`Error::IncorrectArgumentLength`] or [`Error::IndivisibleArgumentLength`] before any output is
/// written.
#[auto_impl(&, Arc)]
pub trait ComputeBackend: Debug + Send + Sync {
	/// `y[i] = x[i]^2`.
	fn sqr<T: Real>(&self, x: &[T], y: &mut [T]) -> Result<(), Error>;

	/// Sum of absolute values.
	fn asum<T: Real>(&self, x: &[T]) -> Result<T, Error>;

	/// Inner product of two equal-length vectors.
	fn dot<T: Real>(&self, x: &[T], y: &[T]) -> Result<T, Error>;

	/// `y = alpha * x`.
	fn scale<T: Real>(&self, alpha: T, x: &[T], y: &mut [T]) -> Result<(), Error>;

	/// `y *= alpha`.
	fn scal<T: Real>(&self, alpha: T, y: &mut [T]) -> Result<(), Error>;

	/// `y = alpha * x + beta * y`.
	fn axpby<T: Real>(&self, alpha: T, x: &[T], beta: T, y: &mut [T]) -> Result<(), Error>;

	/// `y[i] = a[i] * b[i]`.
	fn mul<T: Real>(&self, a: &[T], b: &[T], y: &mut [T]) -> Result<(), Error>;

	/// `y[i] /= x[i]`.
	fn div_assign<T: Real>(&self, x: &[T], y: &mut [T]) -> Result<(), Error>;

	/// `y[i] += x[i]`.
	fn add_assign<T: Real>(&self, x: &[T], y: &mut [T]) -> Result<(), Error>;

	/// `y[i] = x[i]^p`.
	fn powx<T: Real>(&self, x: &[T], p: T, y: &mut [T]) -> Result<(), Error>;

	/// `y[i] = y[i]^p`.
	fn powx_assign<T: Real>(&self, p: T, y: &mut [T]) -> Result<(), Error>;

	/// Reduces over the channel axis: `out[p] += sum_c x[c, p]`.
	///
	/// ## Preconditions
	///
	/// * `out.len() == spatial_dim`
	/// * `x.len()` is a multiple of `spatial_dim`
	fn add_channel_sums<T: Real>(
		&self,
		x: &[T],
		spatial_dim: usize,
		out: &mut [T],
	) -> Result<(), Error>;

	/// Reduces over the spatial axis: `out[c] += sum_p x[c, p]`.
	///
	/// ## Preconditions
	///
	/// * `x.len() == out.len() * spatial_dim`
	fn add_spatial_sums<T: Real>(
		&self,
		x: &[T],
		spatial_dim: usize,
		out: &mut [T],
	) -> Result<(), Error>;

	/// Replicates a per-channel vector across spatial positions and multiplies:
	/// `y[c, p] *= per_channel[c]`.
	///
	/// ## Preconditions
	///
	/// * `y.len() == per_channel.len() * spatial_dim`
	fn mul_broadcast_channels<T: Real>(
		&self,
		per_channel: &[T],
		spatial_dim: usize,
		y: &mut [T],
	) -> Result<(), Error>;

	/// Replicates a per-position map across channels and multiplies:
	/// `y[c, p] *= per_position[p]`.
	///
	/// ## Preconditions
	///
	/// * `y.len()` is a multiple of `per_position.len()`
	fn mul_broadcast_spatial<T: Real>(&self, per_position: &[T], y: &mut [T]) -> Result<(), Error>;

	/// Replicates a per-position map across channels and divides:
	/// `y[c, p] /= per_position[p]`.
	///
	/// ## Preconditions
	///
	/// * `y.len()` is a multiple of `per_position.len()`
	fn div_broadcast_spatial<T: Real>(&self, per_position: &[T], y: &mut [T]) -> Result<(), Error>;
}
