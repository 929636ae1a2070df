// Copyright 2025 Irreducible Inc.

use std::fmt;

use crate::Error;

/// Extents of the axes of a blob, outermost first.
///
/// Layers address 4-D `(num, channels, height, width)` data; shapes with fewer axes report 1 for
/// the missing trailing ones, so an `(N, C)` blob is treated as `(N, C, 1, 1)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Shape(Vec<usize>);

impl Shape {
	pub fn new(dims: impl Into<Vec<usize>>) -> Self {
		Self(dims.into())
	}

	pub fn nchw(num: usize, channels: usize, height: usize, width: usize) -> Self {
		Self(vec![num, channels, height, width])
	}

	/// A rank-0 shape, holding a single element.
	pub fn scalar() -> Self {
		Self(Vec::new())
	}

	pub fn dims(&self) -> &[usize] {
		&self.0
	}

	pub fn num_axes(&self) -> usize {
		self.0.len()
	}

	/// Total number of elements. A rank-0 shape holds one element.
	pub fn count(&self) -> usize {
		self.0.iter().product()
	}

	/// Number of elements spanned by axes `start..end`.
	pub fn count_range(&self, start: usize, end: usize) -> Result<usize, Error> {
		if start > end || end > self.num_axes() {
			return Err(Error::AxisOutOfRange {
				axis: end.max(start),
				num_axes: self.num_axes(),
			});
		}
		Ok(self.0[start..end].iter().product())
	}

	/// Number of elements spanned by axes `start..`.
	pub fn count_from(&self, start: usize) -> Result<usize, Error> {
		self.count_range(start, self.num_axes())
	}

	pub fn num(&self) -> usize {
		self.legacy_axis(0)
	}

	pub fn channels(&self) -> usize {
		self.legacy_axis(1)
	}

	pub fn height(&self) -> usize {
		self.legacy_axis(2)
	}

	pub fn width(&self) -> usize {
		self.legacy_axis(3)
	}

	/// `height * width`, the number of spatial positions per channel.
	pub fn spatial_dim(&self) -> usize {
		self.height() * self.width()
	}

	fn legacy_axis(&self, axis: usize) -> usize {
		self.0.get(axis).copied().unwrap_or(1)
	}
}

impl From<Vec<usize>> for Shape {
	fn from(dims: Vec<usize>) -> Self {
		Self(dims)
	}
}

impl<const N: usize> From<[usize; N]> for Shape {
	fn from(dims: [usize; N]) -> Self {
		Self(dims.to_vec())
	}
}

impl fmt::Display for Shape {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "(")?;
		for (i, dim) in self.0.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{dim}")?;
		}
		write!(f, ")")
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;

	#[test]
	fn test_legacy_accessors_pad_missing_axes() {
		let shape = Shape::new([2, 3]);
		assert_eq!(shape.num(), 2);
		assert_eq!(shape.channels(), 3);
		assert_eq!(shape.height(), 1);
		assert_eq!(shape.width(), 1);
		assert_eq!(shape.spatial_dim(), 1);
	}

	#[test]
	fn test_counts() {
		let shape = Shape::nchw(2, 3, 4, 5);
		assert_eq!(shape.count(), 120);
		assert_eq!(shape.count_from(1).unwrap(), 60);
		assert_eq!(shape.count_range(2, 4).unwrap(), 20);
		assert_eq!(shape.count_range(1, 1).unwrap(), 1);
		assert_matches!(shape.count_range(1, 5), Err(Error::AxisOutOfRange { .. }));
		assert_eq!(Shape::scalar().count(), 1);
	}

	#[test]
	fn test_display() {
		assert_eq!(Shape::nchw(2, 3, 4, 5).to_string(), "(2, 3, 4, 5)");
		assert_eq!(Shape::scalar().to_string(), "()");
	}
}
