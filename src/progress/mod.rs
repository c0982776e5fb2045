//! Progress reporting and cooperative cancellation
//!
//! The orchestrator reports a short label and a completion fraction at every
//! phase. Sinks are shared with background tasks, so they take `&self`.

pub mod constants;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::logging::*;

pub use constants::*;

/// Receiver for progress updates
pub trait ProgressSink: Send + Sync {
	/// Current activity label
	fn set_text(&self, text: &str);

	/// Completion in the range `0.0..=1.0`
	fn set_fraction(&self, fraction: f64);

	/// Shared flag the host sets to request cancellation
	fn cancellation(&self) -> Option<Arc<AtomicBool>> {
		None
	}

	/// Report a `(label, fraction)` step
	fn step(&self, step: (&str, f64)) {
		self.set_fraction(step.1);
		self.set_text(step.0);
	}

	/// True once the host has requested cancellation
	fn is_cancelled(&self) -> bool {
		self.cancellation().map(|f| f.load(Ordering::Relaxed)).unwrap_or(false)
	}
}

/// Sink that discards all updates
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
	fn set_text(&self, _text: &str) {}
	fn set_fraction(&self, _fraction: f64) {}
}

/// Sink that logs labels through tracing
#[derive(Debug, Default)]
pub struct LogProgress {
	cancel: Option<Arc<AtomicBool>>,
	fraction: Mutex<f64>,
}

impl LogProgress {
	pub fn new() -> Self {
		Self::default()
	}

	/// Expose `flag` as the cancellation flag, e.g. one set from a signal handler
	pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
		self.cancel = Some(flag);
		self
	}
}

impl ProgressSink for LogProgress {
	fn set_text(&self, text: &str) {
		if !text.is_empty() {
			let fraction = self.fraction.lock().map(|f| *f).unwrap_or(0.0);
			info!("[{:>3.0}%] {}", fraction * 100.0, text);
		}
	}

	fn set_fraction(&self, fraction: f64) {
		if let Ok(mut f) = self.fraction.lock() {
			*f = fraction;
		}
		debug!("Progress {:.2}", fraction);
	}

	fn cancellation(&self) -> Option<Arc<AtomicBool>> {
		self.cancel.clone()
	}
}


// vim: ts=4
