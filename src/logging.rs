//! Logging prelude module for convenient access to tracing macros.
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("Exporting /content/site");
//! warn!("No content was exported");
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// Logs at INFO level and above by default. Control the log level with the
/// `RUST_LOG` environment variable:
///
/// ```bash
/// RUST_LOG=debug vltsync pull ./jcr_root/content/site --repository ./repo
/// RUST_LOG=vltsync::tree_sync=trace vltsync push ./jcr_root/content --repository ./repo
/// ```
pub fn init_tracing() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();
}

// vim: ts=4
