// Copyright 2025 Irreducible Inc.

//! Parameter fillers: strategies for initialising a freshly created parameter blob.

use std::fmt::Debug;

use auto_impl::auto_impl;
use brew_tensor::Real;
use brew_utils::ensure;
use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
use rand_distr::Normal;

use crate::Error;

/// How to fill a parameter blob, as read from a layer configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum FillerParameter {
	Constant { value: f64 },
	/// Uniform on the closed interval `[min, max]`.
	Uniform { min: f64, max: f64 },
	Gaussian { mean: f64, std: f64 },
}

impl Default for FillerParameter {
	fn default() -> Self {
		Self::Constant { value: 0.0 }
	}
}

#[auto_impl(&mut, Box)]
pub trait Filler<T: Real>: Debug {
	/// Overwrites every element of `data`.
	fn fill(&mut self, data: &mut [T]) -> Result<(), Error>;
}

/// Fills with a single value.
#[derive(Debug, Clone, Copy)]
pub struct ConstantFiller {
	value: f64,
}

impl ConstantFiller {
	pub fn new(value: f64) -> Self {
		Self { value }
	}
}

impl<T: Real> Filler<T> for ConstantFiller {
	fn fill(&mut self, data: &mut [T]) -> Result<(), Error> {
		data.fill(T::from_f64_lossy(self.value));
		Ok(())
	}
}

#[derive(Debug, Clone)]
pub struct UniformFiller {
	distribution: Uniform<f64>,
	rng: StdRng,
}

impl UniformFiller {
	pub fn new(min: f64, max: f64, rng: StdRng) -> Result<Self, Error> {
		ensure!(
			min <= max && (max - min).is_finite(),
			Error::InvalidFiller(format!(
				"uniform bounds [{min}, {max}] do not form a finite interval"
			))
		);
		Ok(Self {
			distribution: Uniform::new_inclusive(min, max),
			rng,
		})
	}
}

impl<T: Real> Filler<T> for UniformFiller {
	fn fill(&mut self, data: &mut [T]) -> Result<(), Error> {
		for x in data.iter_mut() {
			*x = T::from_f64_lossy(self.rng.sample(self.distribution));
		}
		Ok(())
	}
}

#[derive(Debug, Clone)]
pub struct GaussianFiller {
	distribution: Normal<f64>,
	rng: StdRng,
}

impl GaussianFiller {
	pub fn new(mean: f64, std: f64, rng: StdRng) -> Result<Self, Error> {
		let distribution = Normal::new(mean, std).map_err(|err| {
			Error::InvalidFiller(format!("gaussian(mean = {mean}, std = {std}): {err}"))
		})?;
		Ok(Self { distribution, rng })
	}
}

impl<T: Real> Filler<T> for GaussianFiller {
	fn fill(&mut self, data: &mut [T]) -> Result<(), Error> {
		for x in data.iter_mut() {
			*x = T::from_f64_lossy(self.rng.sample(self.distribution));
		}
		Ok(())
	}
}

/// Builds the filler described by `param`, seeding random fillers from the OS.
pub fn get_filler<T: Real>(param: &FillerParameter) -> Result<Box<dyn Filler<T>>, Error> {
	get_filler_with_rng(param, StdRng::from_entropy())
}

/// Builds the filler described by `param` around the given rng.
pub fn get_filler_with_rng<T: Real>(
	param: &FillerParameter,
	rng: StdRng,
) -> Result<Box<dyn Filler<T>>, Error> {
	let filler: Box<dyn Filler<T>> = match *param {
		FillerParameter::Constant { value } => Box::new(ConstantFiller::new(value)),
		FillerParameter::Uniform { min, max } => Box::new(UniformFiller::new(min, max, rng)?),
		FillerParameter::Gaussian { mean, std } => Box::new(GaussianFiller::new(mean, std, rng)?),
	};
	Ok(filler)
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	#[test]
	fn test_constant_filler() {
		let mut data = [0.0f32; 5];
		get_filler(&FillerParameter::Constant { value: 1.5 })
			.unwrap()
			.fill(&mut data)
			.unwrap();
		assert_eq!(data, [1.5; 5]);
	}

	#[test]
	fn test_uniform_filler_stays_in_bounds() {
		let mut data = vec![0.0f64; 1000];
		let param = FillerParameter::Uniform { min: -0.5, max: 2.0 };
		get_filler_with_rng(&param, StdRng::seed_from_u64(0))
			.unwrap()
			.fill(&mut data)
			.unwrap();
		assert!(data.iter().all(|&x| (-0.5..=2.0).contains(&x)));
		assert!(data.iter().any(|&x| x != data[0]));
	}

	#[test]
	fn test_gaussian_filler_moments() {
		let mut data = vec![0.0f64; 20000];
		let param = FillerParameter::Gaussian { mean: 1.0, std: 2.0 };
		get_filler_with_rng(&param, StdRng::seed_from_u64(0))
			.unwrap()
			.fill(&mut data)
			.unwrap();
		let n = data.len() as f64;
		let mean = data.iter().sum::<f64>() / n;
		let var = data.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
		assert!((mean - 1.0).abs() < 0.1, "mean = {mean}");
		assert!((var.sqrt() - 2.0).abs() < 0.1, "std = {}", var.sqrt());
	}

	#[test]
	fn test_seeded_fillers_are_reproducible() {
		let param = FillerParameter::Gaussian { mean: 0.0, std: 1.0 };
		let mut a = [0.0f32; 16];
		let mut b = [0.0f32; 16];
		get_filler_with_rng(&param, StdRng::seed_from_u64(7))
			.unwrap()
			.fill(&mut a)
			.unwrap();
		get_filler_with_rng(&param, StdRng::seed_from_u64(7))
			.unwrap()
			.fill(&mut b)
			.unwrap();
		assert_eq!(a, b);
	}

	#[test]
	fn test_invalid_parameters() {
		assert_matches!(
			get_filler::<f32>(&FillerParameter::Uniform { min: 1.0, max: 0.0 }),
			Err(Error::InvalidFiller(_))
		);
		assert_matches!(
			get_filler::<f32>(&FillerParameter::Gaussian {
				mean: 0.0,
				std: -1.0
			}),
			Err(Error::InvalidFiller(_))
		);
	}
}
