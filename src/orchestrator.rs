//! Pull and push operations
//!
//! An operation moves through
//! `Idle -> ResolvingAddress -> Staging -> DelegatingRemote -> LocalSync ->
//! Reconciling -> CleaningUp -> Succeeded | Failed`.
//!
//! Every failure after address resolution becomes an `Error: ...` result with
//! no entries, and the staging area is released whatever happened. Per-entry
//! errors reported by the remote delegate do not fail the operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{SyncError, SyncResult};
use crate::logging::*;
use crate::package::{StagingArea, StagingManager};
use crate::path_mapper::PathMapper;
use crate::progress::{
	ProgressSink, CLEANING_UP, DONE, PULL_EXPORTING, PULL_PREPARING, PULL_PROCESSING,
	PUSH_IMPORTING, PUSH_PREPARING, PUSH_STAGING,
};
use crate::reconcile::ChangeReconciler;
use crate::remote::{ChangeCollector, RemoteTransfer, TransferContext};
use crate::scope::{FilterScopeBuilder, ScopeDescriptor};
use crate::tree_sync::DirectorySync;
use crate::types::{
	ChangeEntry, ConnectionInfo, OperationPhase, OperationResult, SyncDirection,
};

/// Sequences staging, the remote delegate and the local sync engine
#[derive(Clone)]
pub struct Orchestrator {
	mapper: PathMapper,
	scope_builder: FilterScopeBuilder,
	staging: StagingManager,
	engine: DirectorySync,
	reconciler: ChangeReconciler,
	remote: Arc<dyn RemoteTransfer>,
}

impl Orchestrator {
	pub fn new(
		mapper: PathMapper,
		scope_builder: FilterScopeBuilder,
		staging: StagingManager,
		engine: DirectorySync,
		reconciler: ChangeReconciler,
		remote: Arc<dyn RemoteTransfer>,
	) -> Self {
		Self { mapper, scope_builder, staging, engine, reconciler, remote }
	}

	/// Wire every component from `config`
	pub fn from_config(config: &Config, remote: Arc<dyn RemoteTransfer>) -> Self {
		let mapper = PathMapper::from_config(config);
		Self::new(
			mapper.clone(),
			FilterScopeBuilder::new(mapper).with_mode(config.filter_mode.clone()),
			StagingManager::from_config(config),
			DirectorySync::new(),
			ChangeReconciler::new(),
			remote,
		)
	}

	/// Export the remote content behind `local` and sync it into `local`
	pub async fn pull(
		&self,
		connection: &ConnectionInfo,
		local: &Path,
		progress: Arc<dyn ProgressSink>,
	) -> OperationResult {
		let mut op = Operation::new(SyncDirection::Pull, local);
		let address = match op.resolve(&self.mapper) {
			Some(address) => address,
			None => return op.invalid_path(self.mapper.marker()),
		};

		progress.step(PULL_PREPARING);
		let staged = match self.stage(&mut op, local, &address).await {
			Ok(staged) => staged,
			Err(e) => return op.failed(e),
		};
		let outcome = self.pull_staged(&mut op, &staged, connection, local, &address, &*progress).await;
		self.clean_up(&mut op, staged, &*progress);

		match outcome {
			Ok(entries) => {
				let message = self.message(
					format!("Successfully exported content to {}", address),
					"Files were not changed.",
					&entries,
				);
				op.succeeded(message, entries)
			}
			Err(e) => op.failed(e),
		}
	}

	/// Stage `local` and import it into the remote repository
	pub async fn push(
		&self,
		connection: &ConnectionInfo,
		local: &Path,
		progress: Arc<dyn ProgressSink>,
	) -> OperationResult {
		let mut op = Operation::new(SyncDirection::Push, local);
		let address = match op.resolve(&self.mapper) {
			Some(address) => address,
			None => return op.invalid_path(self.mapper.marker()),
		};

		progress.step(PUSH_PREPARING);
		let staged = match self.stage(&mut op, local, &address).await {
			Ok(staged) => staged,
			Err(e) => return op.failed(e),
		};
		let outcome = self.push_staged(&mut op, &staged, connection, local, &address, &*progress).await;
		self.clean_up(&mut op, staged, &*progress);

		match outcome {
			Ok(entries) => {
				let message = self.message(
					format!("Successfully imported content from {}.", address),
					"Nodes were not changed.",
					&entries,
				);
				op.succeeded(message, entries)
			}
			Err(e) => op.failed(e),
		}
	}

	/// Run [`Orchestrator::pull`] on its own task
	pub fn spawn_pull(
		&self,
		connection: ConnectionInfo,
		local: PathBuf,
		progress: Arc<dyn ProgressSink>,
	) -> JoinHandle<OperationResult> {
		let this = self.clone();
		tokio::spawn(async move { this.pull(&connection, &local, progress).await })
	}

	/// Run [`Orchestrator::push`] on its own task
	pub fn spawn_push(
		&self,
		connection: ConnectionInfo,
		local: PathBuf,
		progress: Arc<dyn ProgressSink>,
	) -> JoinHandle<OperationResult> {
		let this = self.clone();
		tokio::spawn(async move { this.push(&connection, &local, progress).await })
	}

	// Build the scope and allocate the staging area; nothing to clean up on failure
	async fn stage(
		&self,
		op: &mut Operation,
		local: &Path,
		address: &str,
	) -> SyncResult<Staged> {
		op.enter(OperationPhase::Staging);
		let builder = self.scope_builder.clone();
		let normalized = self.mapper.normalize(address);
		let (local, address) = (local.to_path_buf(), address.to_string());
		let scope =
			tokio::task::spawn_blocking(move || builder.build(&local, &address, &normalized)).await??;
		let area = self.staging.create()?;
		Ok(Staged { area, scope })
	}

	async fn pull_staged(
		&self,
		op: &mut Operation,
		staged: &Staged,
		connection: &ConnectionInfo,
		local: &Path,
		address: &str,
		progress: &dyn ProgressSink,
	) -> SyncResult<Vec<ChangeEntry>> {
		let area = &staged.area;
		self.staging.write_scope_descriptor(area, &staged.scope)?;

		op.enter(OperationPhase::DelegatingRemote);
		progress.step(PULL_EXPORTING);
		let collector = ChangeCollector::new();
		let ctx = TransferContext {
			remote_address: address,
			staging_path: area.root(),
			connection,
			listener: &collector,
		};
		self.remote.export(&ctx).await?;
		let remote = collector.into_entries();

		op.enter(OperationPhase::LocalSync);
		progress.step(PULL_PROCESSING);
		let exported = area.payload_path(address);
		let local_entries = if exported.exists() {
			let engine = self.engine.clone().with_cancellation(progress.cancellation());
			let local = local.to_path_buf();
			tokio::task::spawn_blocking(move || engine.sync(&local, &exported, SyncDirection::Pull))
				.await??
		} else {
			warn!("No content was exported from {}", address);
			Vec::new()
		};

		op.enter(OperationPhase::Reconciling);
		Ok(self.reconcile(remote, local_entries))
	}

	async fn push_staged(
		&self,
		op: &mut Operation,
		staged: &Staged,
		connection: &ConnectionInfo,
		local: &Path,
		address: &str,
		progress: &dyn ProgressSink,
	) -> SyncResult<Vec<ChangeEntry>> {
		let area = &staged.area;
		self.staging.write_scope_descriptor(area, &staged.scope)?;

		progress.step(PUSH_STAGING);
		let engine = self.engine.clone().with_cancellation(progress.cancellation());
		let (source, payload) = (local.to_path_buf(), area.payload_path(address));
		let assembled = tokio::task::spawn_blocking(move || {
			engine.sync(&source, &payload, SyncDirection::Push)
		})
		.await??;
		debug!("Staged {} entries below {}", assembled.len(), area.payload_root().display());

		op.enter(OperationPhase::DelegatingRemote);
		progress.step(PUSH_IMPORTING);
		let collector = ChangeCollector::new();
		let ctx = TransferContext {
			remote_address: address,
			staging_path: area.root(),
			connection,
			listener: &collector,
		};
		self.remote.import(&ctx).await?;

		op.enter(OperationPhase::Reconciling);
		Ok(self.reconcile(collector.into_entries(), assembled))
	}

	fn reconcile(&self, remote: Vec<ChangeEntry>, local: Vec<ChangeEntry>) -> Vec<ChangeEntry> {
		let merged = self.reconciler.reconcile(remote, local);
		self.reconciler.filter_no_change(merged)
	}

	fn message(&self, headline: String, unchanged: &str, entries: &[ChangeEntry]) -> String {
		let detail = if entries.is_empty() {
			unchanged.to_string()
		} else {
			self.reconciler.summarize(entries)
		};
		format!("{}\n{}", headline, detail)
	}

	fn clean_up(
		&self,
		op: &mut Operation,
		staged: Staged,
		progress: &dyn ProgressSink,
	) {
		op.enter(OperationPhase::CleaningUp);
		progress.step(CLEANING_UP);
		staged.area.close();
		progress.step(DONE);
	}
}

// Staging area of one operation together with the scope it was built for
struct Staged {
	area: StagingArea,
	scope: ScopeDescriptor,
}

// Phase bookkeeping for a single operation
struct Operation {
	direction: SyncDirection,
	local: PathBuf,
	phase: OperationPhase,
	started: Instant,
}

impl Operation {
	fn new(direction: SyncDirection, local: &Path) -> Self {
		Self {
			direction,
			local: local.to_path_buf(),
			phase: OperationPhase::Idle,
			started: Instant::now(),
		}
	}

	fn enter(&mut self, phase: OperationPhase) {
		debug!("{} {}: {:?} -> {:?}", self.direction, self.local.display(), self.phase, phase);
		self.phase = phase;
	}

	fn resolve(&mut self, mapper: &PathMapper) -> Option<String> {
		self.enter(OperationPhase::ResolvingAddress);
		mapper.to_remote_address(&self.local)
	}

	fn invalid_path(mut self, marker: &str) -> OperationResult {
		self.enter(OperationPhase::Failed);
		let err = SyncError::UnmappableAddress { path: self.local.clone() };
		warn!("{} (expected a '{}' segment)", err, marker);
		OperationResult::failed("Invalid JCR path.")
	}

	fn failed(mut self, error: SyncError) -> OperationResult {
		self.enter(OperationPhase::Failed);
		if error.is_remote() {
			warn!("{} of {} rejected by remote: {}", self.direction, self.local.display(), error);
		} else {
			error!("{} of {} failed: {}", self.direction, self.local.display(), error);
		}
		OperationResult::failed(format!("Error: {}", error))
	}

	fn succeeded(mut self, message: String, entries: Vec<ChangeEntry>) -> OperationResult {
		self.enter(OperationPhase::Succeeded);
		info!(
			"{} of {} finished in {:.2?}: {} change(s)",
			self.direction,
			self.local.display(),
			self.started.elapsed(),
			entries.len()
		);
		OperationResult::succeeded(message, entries)
	}
}

// vim: ts=4
