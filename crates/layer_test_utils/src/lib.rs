// Copyright 2025 Irreducible Inc.

//! Helpers shared by the layer test suites: seeded random blobs and a finite-difference
//! gradient checker that works with any [`Layer`](brew_layers::Layer).

mod gradient_check;

pub use gradient_check::*;

use brew_layers::filler::{Filler, GaussianFiller};
use brew_tensor::{Blob, Real, Shape};
use rand::{rngs::StdRng, SeedableRng};

/// A blob with standard-normal values drawn from a seeded rng.
pub fn gaussian_blob<T: Real>(shape: impl Into<Shape>, seed: u64) -> Blob<T> {
	let mut blob = Blob::new(shape);
	GaussianFiller::new(0.0, 1.0, StdRng::seed_from_u64(seed))
		.expect("standard normal is a valid distribution")
		.fill(blob.data_mut())
		.expect("gaussian filling does not fail");
	blob
}
