// Copyright 2025 Irreducible Inc.

/// Returns early with the given error, converted with `Into`.
///
/// With the `bail_panic` feature enabled this panics instead, which puts the backtrace at the
/// site that detected the problem rather than wherever the error is finally reported.
#[cfg(feature = "bail_panic")]
#[macro_export]
macro_rules! bail {
	($err:expr) => {
		panic!("{}", $err);
	};
}

#[cfg(not(feature = "bail_panic"))]
#[macro_export]
macro_rules! bail {
	($err:expr) => {
		return Err($err.into());
	};
}

/// Bails with the given error unless the condition holds.
#[macro_export]
macro_rules! ensure {
	($cond:expr, $err:expr) => {
		if !$cond {
			$crate::bail!($err);
		}
	};
}

#[cfg(all(test, not(feature = "bail_panic")))]
mod tests {
	#[derive(Debug, PartialEq, Eq)]
	struct Rejected(usize);

	fn at_most_three(n: usize) -> Result<usize, Rejected> {
		ensure!(n <= 3, Rejected(n));
		Ok(n)
	}

	#[test]
	fn test_ensure_passes_and_bails() {
		assert_eq!(at_most_three(2), Ok(2));
		assert_eq!(at_most_three(7), Err(Rejected(7)));
	}
}
