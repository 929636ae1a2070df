// Copyright 2025 Irreducible Inc.

/// Division that returns `None` when `b` is zero or doesn't divide `a`.
pub const fn exact_div(a: usize, b: usize) -> Option<usize> {
	if b == 0 || a % b != 0 {
		None
	} else {
		Some(a / b)
	}
}
