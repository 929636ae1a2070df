// Copyright 2025 Irreducible Inc.

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("data has length {actual}, expected {expected} for the given shape")]
	IncorrectDataLength { expected: usize, actual: usize },
	#[error("axis {axis} is out of range for a shape with {num_axes} axes")]
	AxisOutOfRange { axis: usize, num_axes: usize },
	#[error("serialization: {0}")]
	Serialization(#[from] crate::SerializationError),
}
