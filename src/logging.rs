//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use adbfs::logging::*;
//!
//! info!("connected");
//! debug!("sync FAIL: {}", msg);
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies:
///
/// ```bash
/// RUST_LOG=debug adbfs ls sdcard
/// RUST_LOG=adbfs::pool=trace adbfs cat sdcard/a.txt
/// ```
pub fn init_tracing(default_level: &str) {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.try_init();
}

// vim: ts=4
