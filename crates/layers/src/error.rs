// Copyright 2025 Irreducible Inc.

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("number of axes of bottom blob must be >= {min}, got {num_axes}")]
	RankTooLow { num_axes: usize, min: usize },
	#[error("(num, channels, height, width) addressing supports at most 4 axes, got {num_axes}")]
	RankTooHigh { num_axes: usize },
	#[error("scale size {actual} is inconsistent with the layer config, expected {expected}")]
	ScaleSizeMismatch { expected: usize, actual: usize },
	#[error("eps must be a non-negative number, got {0}")]
	InvalidEpsilon(f64),
	#[error("scale component {index} is zero, the scale gradient is undefined")]
	ZeroScale { index: usize },
	#[error("{layer} layer takes {expected} {role} blob(s), got {actual}")]
	IncorrectBlobCount {
		layer: &'static str,
		role: &'static str,
		expected: usize,
		actual: usize,
	},
	#[error("propagate_down has {actual} entries, expected one per bottom blob ({expected})")]
	IncorrectPropagateDownLength { expected: usize, actual: usize },
	#[error("per-sample count {count} is not a multiple of the cycle length {cycle}")]
	IndivisibleCycle { count: usize, cycle: usize },
	#[error("{0} layer used before setup")]
	NotSetUp(&'static str),
	#[error("{0} layer blobs changed shape since the last reshape")]
	NotReshaped(&'static str),
	#[error("invalid filler parameter: {0}")]
	InvalidFiller(String),
	#[error("{0}")]
	TensorError(#[from] brew_tensor::Error),
	#[error("{0}")]
	BackendError(#[from] brew_hal::Error),
}
