// Copyright 2025 Irreducible Inc.

//! Dense `(N, C, H, W)` tensors as consumed by the brew layers.
//!
//! A [`Blob`] carries a value buffer and a gradient buffer of the same shape. The layers read and
//! write them through plain slices; the executor that owns the blobs decides when they are
//! reshaped or zeroed.

mod blob;
mod error;
mod real;
mod serialization;
mod shape;

pub use blob::*;
pub use error::*;
pub use real::*;
pub use serialization::{DeserializeBytes, Error as SerializationError, SerializeBytes};
pub use shape::*;
