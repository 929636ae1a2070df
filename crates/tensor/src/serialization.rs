// Copyright 2025 Irreducible Inc.

use std::mem::size_of;

use bytes::{Buf, BufMut};

use crate::{Blob, Real, Shape};

#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
	#[error("Write buffer is full")]
	WriteBufferFull,
	#[error("Not enough data in read buffer to deserialize")]
	NotEnoughBytes,
	#[error("Axis extent {0} does not fit in usize")]
	AxisTooLarge(u64),
	#[error("Element count of the serialized shape overflows usize")]
	CountOverflow,
}

/// Represents type that can be serialized to a byte buffer.
pub trait SerializeBytes {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), Error>;
}

/// Represents type that can be deserialized from a byte buffer.
pub trait DeserializeBytes {
	fn deserialize(read_buf: impl Buf) -> Result<Self, Error>
	where
		Self: Sized;
}

/// Layout: `u32` rank, one `u64` per axis (both little-endian), then the values as raw
/// native-endian element bytes. The gradient is not stored.
impl<T: Real> SerializeBytes for Blob<T> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), Error> {
		let dims = self.shape().dims();
		let payload = bytemuck::cast_slice::<T, u8>(self.data());
		if write_buf.remaining_mut() < size_of::<u32>() + dims.len() * size_of::<u64>() + payload.len()
		{
			return Err(Error::WriteBufferFull);
		}
		write_buf.put_u32_le(dims.len() as u32);
		for &dim in dims {
			write_buf.put_u64_le(dim as u64);
		}
		write_buf.put_slice(payload);
		Ok(())
	}
}

impl<T: Real> DeserializeBytes for Blob<T> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, Error> {
		if read_buf.remaining() < size_of::<u32>() {
			return Err(Error::NotEnoughBytes);
		}
		let rank = read_buf.get_u32_le() as usize;
		if read_buf.remaining() < rank.saturating_mul(size_of::<u64>()) {
			return Err(Error::NotEnoughBytes);
		}
		let dims = (0..rank)
			.map(|_| {
				let dim = read_buf.get_u64_le();
				usize::try_from(dim).map_err(|_| Error::AxisTooLarge(dim))
			})
			.collect::<Result<Vec<_>, _>>()?;
		let count = dims
			.iter()
			.try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
			.ok_or(Error::CountOverflow)?;
		let n_bytes = count
			.checked_mul(size_of::<T>())
			.ok_or(Error::CountOverflow)?;
		if read_buf.remaining() < n_bytes {
			return Err(Error::NotEnoughBytes);
		}

		let mut data = vec![T::zero(); count];
		read_buf.copy_to_slice(bytemuck::cast_slice_mut::<T, u8>(&mut data));
		Ok(Blob::from_vec(Shape::new(dims), data)
			.expect("data length equals the product of the deserialized dims"))
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use rand::{rngs::StdRng, Rng, SeedableRng};

	use super::*;

	#[test]
	fn test_blob_serialize_deserialize() {
		let mut rng = StdRng::seed_from_u64(0);
		let data = (0..24).map(|_| rng.gen::<f32>()).collect::<Vec<_>>();
		let blob = Blob::from_vec([2, 3, 2, 2], data).unwrap();

		let mut buf = Vec::new();
		blob.serialize(&mut buf).unwrap();

		let blob_deserialized = Blob::<f32>::deserialize(buf.as_slice()).unwrap();
		assert_eq!(blob_deserialized.shape(), blob.shape());
		assert_eq!(blob_deserialized.data(), blob.data());
	}

	#[test]
	fn test_scalar_blob_round_trip() {
		let blob = Blob::<f64>::from_vec(Shape::scalar(), vec![2.5]).unwrap();
		let mut buf = Vec::new();
		blob.serialize(&mut buf).unwrap();
		assert_eq!(buf.len(), 4 + 8);

		let blob_deserialized = Blob::<f64>::deserialize(buf.as_slice()).unwrap();
		assert_eq!(blob_deserialized.shape(), &Shape::scalar());
		assert_eq!(blob_deserialized.data(), &[2.5]);
	}

	#[test]
	fn test_truncated_input_is_rejected() {
		let blob = Blob::<f32>::from_vec([3], vec![1.0, 2.0, 3.0]).unwrap();
		let mut buf = Vec::new();
		blob.serialize(&mut buf).unwrap();

		assert_matches!(
			Blob::<f32>::deserialize(&buf[..buf.len() - 1]),
			Err(Error::NotEnoughBytes)
		);
		assert_matches!(Blob::<f32>::deserialize(&buf[..2]), Err(Error::NotEnoughBytes));
	}

	#[test]
	fn test_full_write_buffer_is_rejected() {
		let blob = Blob::<f32>::from_vec([2], vec![1.0, 2.0]).unwrap();
		let mut storage = [0u8; 8];
		assert_matches!(blob.serialize(&mut storage[..]), Err(Error::WriteBufferFull));
	}
}
