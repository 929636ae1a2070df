// Copyright 2025 Irreducible Inc.

//! Hardware abstraction for the dense kernels the layers are built from.
//!
//! Layers never loop over tensor elements themselves; they describe each pass as a sequence of
//! [`ComputeBackend`] calls on per-sample slices. [`CpuBackend`] is the reference implementation.
//! An accelerator backend implements the same trait and reports device failures through
//! [`Error::BackendError`].

mod backend;
mod cpu;
mod error;

pub use backend::*;
pub use cpu::CpuBackend;
pub use error::*;

/// Create the default backend that will use the CPU for all computations.
pub fn make_backend() -> CpuBackend {
	CpuBackend
}
