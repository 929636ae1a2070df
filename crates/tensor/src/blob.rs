// Copyright 2025 Irreducible Inc.

use brew_utils::ensure;

use crate::{Error, Real, Shape};

/// A dense tensor together with the gradient of some scalar loss with respect to it.
///
/// `data` and `diff` always have `shape.count()` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob<T> {
	shape: Shape,
	data: Vec<T>,
	diff: Vec<T>,
}

impl<T: Real> Blob<T> {
	/// Creates a zero-filled blob.
	pub fn new(shape: impl Into<Shape>) -> Self {
		let shape = shape.into();
		let count = shape.count();
		Self {
			shape,
			data: vec![T::zero(); count],
			diff: vec![T::zero(); count],
		}
	}

	/// An empty `(0)` blob, typically a top blob that the layer reshapes during setup.
	pub fn empty() -> Self {
		Self::new([0])
	}

	/// Creates a blob holding `data` with a zeroed gradient.
	pub fn from_vec(shape: impl Into<Shape>, data: Vec<T>) -> Result<Self, Error> {
		let shape = shape.into();
		ensure!(
			data.len() == shape.count(),
			Error::IncorrectDataLength {
				expected: shape.count(),
				actual: data.len(),
			}
		);
		let diff = vec![T::zero(); data.len()];
		Ok(Self { shape, data, diff })
	}

	pub fn shape(&self) -> &Shape {
		&self.shape
	}

	pub fn count(&self) -> usize {
		self.data.len()
	}

	pub fn num(&self) -> usize {
		self.shape.num()
	}

	pub fn channels(&self) -> usize {
		self.shape.channels()
	}

	pub fn height(&self) -> usize {
		self.shape.height()
	}

	pub fn width(&self) -> usize {
		self.shape.width()
	}

	/// Changes the shape, resizing both buffers in place.
	///
	/// Reshaping to the current shape leaves the contents untouched. Otherwise elements that
	/// survive keep their values and new elements are zero.
	pub fn reshape(&mut self, shape: impl Into<Shape>) {
		let shape = shape.into();
		if shape == self.shape {
			return;
		}
		let count = shape.count();
		self.data.resize(count, T::zero());
		self.diff.resize(count, T::zero());
		self.shape = shape;
	}

	pub fn reshape_like(&mut self, other: &Blob<T>) {
		self.reshape(other.shape.clone());
	}

	pub fn data(&self) -> &[T] {
		&self.data
	}

	pub fn data_mut(&mut self) -> &mut [T] {
		&mut self.data
	}

	pub fn diff(&self) -> &[T] {
		&self.diff
	}

	pub fn diff_mut(&mut self) -> &mut [T] {
		&mut self.diff
	}

	/// Borrows the values immutably and the gradient mutably at the same time.
	pub fn data_and_diff_mut(&mut self) -> (&[T], &mut [T]) {
		(&self.data, &mut self.diff)
	}

	pub fn set_data(&mut self, value: T) {
		self.data.fill(value);
	}

	pub fn set_diff(&mut self, value: T) {
		self.diff.fill(value);
	}

	/// Overwrites the gradient with the values.
	pub fn copy_data_to_diff(&mut self) {
		self.diff.copy_from_slice(&self.data);
	}

	/// Per-sample slice of the values, i.e. `data[n * count(1..) .. (n + 1) * count(1..)]`.
	pub fn sample(&self, n: usize) -> &[T] {
		let dim = self.sample_dim();
		&self.data[n * dim..(n + 1) * dim]
	}

	fn sample_dim(&self) -> usize {
		match self.shape.num() {
			0 => 0,
			num => self.count() / num,
		}
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	#[test]
	fn test_reshape_same_shape_is_noop() {
		let mut blob = Blob::<f32>::from_vec([1, 2, 1, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
		blob.diff_mut()[1] = 7.0;
		blob.reshape([1, 2, 1, 2]);
		assert_eq!(blob.data(), &[1.0, 2.0, 3.0, 4.0]);
		assert_eq!(blob.diff(), &[0.0, 7.0, 0.0, 0.0]);
	}

	#[test]
	fn test_reshape_resizes_both_buffers() {
		let mut blob = Blob::<f64>::new([2, 3]);
		blob.reshape([2, 3, 4, 5]);
		assert_eq!(blob.count(), 120);
		assert_eq!(blob.diff().len(), 120);
		assert_eq!(blob.shape(), &Shape::nchw(2, 3, 4, 5));
	}

	#[test]
	fn test_from_vec_checks_length() {
		assert_matches!(
			Blob::<f32>::from_vec([2, 2], vec![0.0; 3]),
			Err(Error::IncorrectDataLength {
				expected: 4,
				actual: 3
			})
		);
	}

	#[test]
	fn test_copy_data_to_diff() {
		let mut blob = Blob::<f64>::from_vec([1, 3], vec![1.0, -2.0, 0.5]).unwrap();
		blob.copy_data_to_diff();
		assert_eq!(blob.diff(), blob.data());
	}

	#[test]
	fn test_sample_slices() {
		let blob = Blob::<f32>::from_vec([2, 3], (0..6).map(|x| x as f32).collect()).unwrap();
		assert_eq!(blob.sample(1), &[3.0, 4.0, 5.0]);
	}

	#[test]
	fn test_scalar_blob_has_one_element() {
		let blob = Blob::<f32>::new(Shape::scalar());
		assert_eq!(blob.count(), 1);
		assert_eq!(blob.num(), 1);
	}
}
