//! Remote transfer delegate interface
//!
//! The orchestrator never talks to a repository itself. It stages a package
//! and hands the staging directory to a [`RemoteTransfer`], which reports
//! every node it touched through a [`TransferListener`].

pub mod fs;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use crate::error::SyncResult;
use crate::logging::*;
use crate::types::{ChangeAction, ChangeEntry, ConnectionInfo};

pub use fs::FsRepository;

/// Receiver for per-node transfer events
pub trait TransferListener: Send + Sync {
	/// A node was processed; `code` is `A`, `U`, `D`, `E` or anything else for "unchanged"
	fn on_message(&self, code: &str, path: &str);

	/// A node could not be processed
	fn on_error(&self, path: &str, message: &str);
}

/// Everything a delegate needs for one transfer
pub struct TransferContext<'a> {
	/// Remote address as resolved from the local selection, before normalization
	pub remote_address: &'a str,

	/// Root of the staging area holding `META-INF/vault/filter.xml` and the payload
	pub staging_path: &'a Path,

	pub connection: &'a ConnectionInfo,

	pub listener: &'a dyn TransferListener,
}

/// Export from and import into a remote repository
#[async_trait]
pub trait RemoteTransfer: Send + Sync {
	/// Materialize the scoped remote content into the staging payload
	async fn export(&self, ctx: &TransferContext<'_>) -> SyncResult<()>;

	/// Apply the staging payload to the remote within the scope
	async fn import(&self, ctx: &TransferContext<'_>) -> SyncResult<()>;
}

/// Listener that records every event as a [`ChangeEntry`]
#[derive(Debug, Default)]
pub struct ChangeCollector {
	entries: Mutex<Vec<ChangeEntry>>,
}

impl ChangeCollector {
	pub fn new() -> Self {
		Self::default()
	}

	/// Recorded entries in arrival order
	pub fn into_entries(self) -> Vec<ChangeEntry> {
		match self.entries.into_inner() {
			Ok(entries) => entries,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	fn record(&self, entry: ChangeEntry) {
		match self.entries.lock() {
			Ok(mut entries) => entries.push(entry),
			Err(poisoned) => poisoned.into_inner().push(entry),
		}
	}
}

impl TransferListener for ChangeCollector {
	fn on_message(&self, code: &str, path: &str) {
		debug!("{} {}", code, path);
		self.record(ChangeEntry::new(ChangeAction::from_code(code), path));
	}

	fn on_error(&self, path: &str, message: &str) {
		warn!("Remote error on {}: {}", path, message);
		self.record(ChangeEntry::with_message(ChangeAction::Error, path, message));
	}
}


// vim: ts=4
