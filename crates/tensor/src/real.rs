// Copyright 2025 Irreducible Inc.

use std::fmt::{Debug, Display};

use bytemuck::Pod;
use num_traits::{Float, FromPrimitive};

/// Floating-point element type of a blob.
///
/// The layers are written once against this trait and instantiated for `f32` and `f64`.
pub trait Real: Float + FromPrimitive + Pod + Debug + Display + Default + Send + Sync + 'static {
	/// Converts an `f64` literal or parameter into the element type.
	fn from_f64_lossy(value: f64) -> Self;

	fn to_f64_lossy(self) -> f64;
}

impl Real for f32 {
	fn from_f64_lossy(value: f64) -> Self {
		value as f32
	}

	fn to_f64_lossy(self) -> f64 {
		self as f64
	}
}

impl Real for f64 {
	fn from_f64_lossy(value: f64) -> Self {
		value
	}

	fn to_f64_lossy(self) -> f64 {
		self
	}
}
