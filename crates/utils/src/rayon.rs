// Copyright 2025 Irreducible Inc.

use std::{env, sync::OnceLock};

/// When `RAYON_NUM_THREADS=1`, builds the global pool with `use_current_thread` so that
/// single-threaded runs execute on the caller's thread. Timings and traces from such runs are
/// then directly comparable to a plain sequential loop.
///
/// rayon only allows the global pool to be initialised once, so the outcome is cached and the
/// same reference returned on every call. Call it at the top of `main`.
pub fn adjust_thread_pool() -> &'static Result<(), rayon::ThreadPoolBuildError> {
	static ONCE_GUARD: OnceLock<Result<(), rayon::ThreadPoolBuildError>> = OnceLock::new();

	ONCE_GUARD.get_or_init(|| match env::var("RAYON_NUM_THREADS") {
		Ok(v) if v == "1" => rayon::ThreadPoolBuilder::new()
			.num_threads(1)
			.use_current_thread()
			.build_global(),
		_ => Ok(()),
	})
}

/// Minimum number of elements handed to one rayon task when splitting work over samples.
pub fn min_chunk_len(per_item_len: usize) -> usize {
	const TARGET_TASK_ELEMS: usize = 1 << 14;
	(TARGET_TASK_ELEMS / per_item_len.max(1)).max(1)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_min_chunk_len() {
		assert_eq!(min_chunk_len(0), 1 << 14);
		assert_eq!(min_chunk_len(1 << 10), 16);
		assert_eq!(min_chunk_len(1 << 20), 1);
	}
}
