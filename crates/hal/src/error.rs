// Copyright 2025 Irreducible Inc.

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// Generic variant to represent errors from concrete compute backends.
	#[error("Backend error: {0}")]
	BackendError(Box<dyn std::error::Error + Send + Sync>),
	#[error("argument {arg} does not have expected length {expected}")]
	IncorrectArgumentLength { arg: String, expected: usize },
	#[error("argument {arg} has length {len}, which is not a multiple of {divisor}")]
	IndivisibleArgumentLength {
		arg: String,
		len: usize,
		divisor: usize,
	},
}
