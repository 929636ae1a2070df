// Copyright 2025 Irreducible Inc.

use brew_tensor::{Blob, Real};
use brew_utils::ensure;

use crate::Error;

/// The forward/backward protocol shared by all layers.
///
/// Bottom blobs are the layer's inputs and top blobs its outputs. The executor owns every blob;
/// a layer only keeps its learnable parameters and whatever it caches between a forward pass
/// and the matching backward pass.
///
/// A layer instance is not reentrant: forward and backward calls on one instance must be
/// serialized by the caller, and each backward call refers to the most recent forward call.
pub trait Layer<T: Real> {
	fn type_name(&self) -> &'static str;

	/// Number of bottom blobs the layer requires, if fixed.
	fn exact_num_bottom_blobs(&self) -> Option<usize> {
		None
	}

	/// Number of top blobs the layer produces, if fixed.
	fn exact_num_top_blobs(&self) -> Option<usize> {
		None
	}

	/// Validates the blob counts, then runs [`Self::layer_setup`] and [`Self::reshape`].
	fn setup(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		check_blob_counts::<T, Self>(self, bottom.len(), top.len())?;
		self.layer_setup(bottom, top)?;
		self.reshape(bottom, top)
	}

	/// One-time initialisation: reads the layer parameters and creates learnable parameters.
	fn layer_setup(&mut self, _bottom: &[&Blob<T>], _top: &mut [&mut Blob<T>]) -> Result<(), Error> {
		Ok(())
	}

	/// Adjusts top blobs and internal buffers to the bottom shapes.
	///
	/// Calling it again with unchanged bottom shapes has no effect.
	fn reshape(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error>;

	/// Computes the top values from the bottom values.
	fn forward(&mut self, bottom: &[&Blob<T>], top: &mut [&mut Blob<T>]) -> Result<(), Error>;

	/// Propagates the top gradients into the bottom gradients (where `propagate_down` is set)
	/// and into the parameter gradients (where [`Self::param_propagate_down`] is set).
	///
	/// Gradients are added to the existing contents of the diff buffers; the caller zeroes them
	/// beforehand when a fresh gradient is wanted.
	fn backward(
		&mut self,
		top: &[&Blob<T>],
		propagate_down: &[bool],
		bottom: &mut [&mut Blob<T>],
	) -> Result<(), Error>;

	/// The learnable parameters, in a fixed order.
	fn learnable_params(&self) -> Vec<&Blob<T>> {
		Vec::new()
	}

	fn learnable_params_mut(&mut self) -> Vec<&mut Blob<T>> {
		Vec::new()
	}

	/// Whether backward accumulates a gradient into parameter `param_id`.
	fn param_propagate_down(&self, _param_id: usize) -> bool {
		false
	}

	fn set_param_propagate_down(&mut self, _param_id: usize, _value: bool) {}
}

fn check_blob_counts<T: Real, L: Layer<T> + ?Sized>(
	layer: &L,
	n_bottom: usize,
	n_top: usize,
) -> Result<(), Error> {
	if let Some(expected) = layer.exact_num_bottom_blobs() {
		ensure!(
			n_bottom == expected,
			Error::IncorrectBlobCount {
				layer: layer.type_name(),
				role: "bottom",
				expected,
				actual: n_bottom,
			}
		);
	}
	if let Some(expected) = layer.exact_num_top_blobs() {
		ensure!(
			n_top == expected,
			Error::IncorrectBlobCount {
				layer: layer.type_name(),
				role: "top",
				expected,
				actual: n_top,
			}
		);
	}
	Ok(())
}

/// Checks that `propagate_down` has one flag per bottom blob.
pub(crate) fn check_propagate_down(propagate_down: &[bool], n_bottom: usize) -> Result<(), Error> {
	ensure!(
		propagate_down.len() == n_bottom,
		Error::IncorrectPropagateDownLength {
			expected: n_bottom,
			actual: propagate_down.len(),
		}
	);
	Ok(())
}

/// Checks the `(num, channels, height, width)` addressing constraints on a bottom blob.
pub(crate) fn check_rank<T: Real>(blob: &Blob<T>, min: usize) -> Result<(), Error> {
	let num_axes = blob.shape().num_axes();
	ensure!(num_axes >= min, Error::RankTooLow { num_axes, min });
	ensure!(num_axes <= 4, Error::RankTooHigh { num_axes });
	Ok(())
}
