// Copyright 2025 Irreducible Inc.

use tracing_subscriber::{
	fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Installs a formatting subscriber filtered by `RUST_LOG` (default `info`).
///
/// Span close events are printed so the duration of each forward/backward pass shows up in the
/// log. Calling this more than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let _ = tracing_subscriber::registry()
		.with(filter)
		.with(tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE))
		.try_init();
}

#[cfg(test)]
mod tests {
	#[test]
	fn test_init_tracing_twice() {
		super::init_tracing();
		super::init_tracing();
		tracing::info!("tracing initialised");
	}
}
