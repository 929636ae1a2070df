// Copyright 2025 Irreducible Inc.

//! Layer implementations for the brew network executor.
//!
//! Every layer implements [`Layer`]: the executor calls [`Layer::setup`] once with the initial
//! bottom blobs, [`Layer::reshape`] whenever an input shape changes, and then alternates
//! [`Layer::forward`] and [`Layer::backward`] during training. The dense arithmetic is delegated
//! to a [`brew_hal::ComputeBackend`].

mod cycle_mult;
mod error;
pub mod filler;
mod layer;
mod normalize;

pub use cycle_mult::CycleMultLayer;
pub use error::*;
pub use layer::*;
pub use normalize::{NormMode, NormalizeLayer, NormalizeParameter};
