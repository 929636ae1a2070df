// Copyright 2025 Irreducible Inc.

//! Small shared helpers for the brew crates: error macros, checked arithmetic, thread-pool and
//! tracing setup.

pub mod checked_arithmetics;
pub mod error_utils;
pub mod rayon;
pub mod tracing;
