//! Directory-backed repository
//!
//! Treats a local directory laid out like the mirrored hierarchy as the
//! remote side. Useful for offline work, scripted round trips and tests.
//!
//! Entries are matched against the staged `filter.xml` by address. Segments
//! stored on disk as `_ns_name` are addressed as `ns:name`, and content
//! descriptors are addressed as the node they describe. An entry is in scope
//! when a filter contains its node address and does not reject its on-disk
//! address, so sibling exclusions written for a single descriptor hold.

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};

use super::{RemoteTransfer, TransferContext, TransferListener};
use crate::error::{SyncError, SyncResult};
use crate::logging::*;
use crate::package::{filter_xml, FILTER_FILE, METADATA_DIR};
use crate::path_mapper::{decode_segment, PathMapper};
use crate::scope::ScopeMatcher;
use crate::tree_sync::files_differ;

/// How an import treats content that already exists in the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportMode {
	/// Add, update and delete (default)
	Replace,
	/// Add only
	Merge,
	/// Add and update, never delete
	Update,
}

impl ImportMode {
	fn parse(mode: &str) -> Self {
		match mode {
			"merge" => ImportMode::Merge,
			"update" => ImportMode::Update,
			_ => ImportMode::Replace,
		}
	}
}

struct Filter {
	matcher: ScopeMatcher,
	root: String,
	mode: ImportMode,
}

// Event replayed to the listener once the blocking walk has finished
enum Event {
	Message(&'static str, String),
	Error(String, String),
}

/// Repository stored in a plain directory
#[derive(Debug, Clone)]
pub struct FsRepository {
	root: PathBuf,
	mapper: PathMapper,
}

impl FsRepository {
	pub fn new(root: impl Into<PathBuf>, mapper: PathMapper) -> Self {
		Self { root: root.into(), mapper }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	async fn run(
		&self,
		ctx: &TransferContext<'_>,
		walk: fn(&Walker) -> SyncResult<Vec<Event>>,
	) -> SyncResult<()> {
		if !self.root.is_dir() {
			return Err(SyncError::remote(format!(
				"Repository not found: {}",
				self.root.display()
			)));
		}
		debug!(
			"Transfer of {} against {} ({})",
			ctx.remote_address,
			self.root.display(),
			ctx.connection.repository_url()
		);

		let walker = Walker {
			repository: self.root.clone(),
			payload: ctx.staging_path.join(self.mapper.marker()),
			filters: load_filters(ctx.staging_path)?,
			mapper: self.mapper.clone(),
		};
		let events = tokio::task::spawn_blocking(move || walk(&walker)).await??;
		replay(events, ctx.listener);
		Ok(())
	}
}

#[async_trait]
impl RemoteTransfer for FsRepository {
	async fn export(&self, ctx: &TransferContext<'_>) -> SyncResult<()> {
		self.run(ctx, Walker::export).await
	}

	async fn import(&self, ctx: &TransferContext<'_>) -> SyncResult<()> {
		self.run(ctx, Walker::import).await
	}
}

fn load_filters(staging: &Path) -> SyncResult<Vec<Filter>> {
	let path = staging.join(METADATA_DIR).join(FILTER_FILE);
	let xml = fs::read_to_string(&path)
		.map_err(|e| SyncError::remote(format!("Cannot read {}: {}", path.display(), e)))?;
	filter_xml::parse(&xml)?
		.iter()
		.map(|scope| -> SyncResult<Filter> {
			Ok(Filter {
				matcher: scope.matcher()?,
				root: scope.root.clone(),
				mode: ImportMode::parse(&scope.mode),
			})
		})
		.collect()
}

fn replay(events: Vec<Event>, listener: &dyn TransferListener) {
	for event in events {
		match event {
			Event::Message(code, path) => listener.on_message(code, &path),
			Event::Error(path, message) => listener.on_error(&path, &message),
		}
	}
}

struct Walker {
	repository: PathBuf,
	payload: PathBuf,
	filters: Vec<Filter>,
	mapper: PathMapper,
}

impl Walker {
	fn export(&self) -> SyncResult<Vec<Event>> {
		let mut events = Vec::new();
		self.export_dir(Path::new(""), &mut events)?;
		info!("Exported {} entries from {}", events.len(), self.repository.display());
		Ok(events)
	}

	fn export_dir(&self, rel: &Path, events: &mut Vec<Event>) -> SyncResult<()> {
		for name in sorted_names(&self.repository.join(rel))? {
			let rel = rel.join(&name);
			let source = self.repository.join(&rel);
			let (raw, node) = self.addresses(&rel);

			if source.is_dir() {
				if self.admitting(&raw, &node).is_some() {
					let target = self.payload.join(&rel);
					fs::create_dir_all(&target).map_err(|e| SyncError::fs(&target, e))?;
				}
				if self.leads_into_scope(&node) {
					self.export_dir(&rel, events)?;
				}
			} else if self.admitting(&raw, &node).is_some() {
				let target = self.payload.join(&rel);
				if let Some(parent) = target.parent() {
					fs::create_dir_all(parent).map_err(|e| SyncError::fs(parent, e))?;
				}
				fs::copy(&source, &target).map_err(|e| SyncError::fs(&source, e))?;
				events.push(Event::Message("A", node));
			}
		}
		Ok(())
	}

	fn import(&self) -> SyncResult<Vec<Event>> {
		let mut events = Vec::new();
		if self.payload.is_dir() {
			self.import_dir(Path::new(""), &mut events)?;
		}
		self.delete_missing(Path::new(""), &mut events)?;
		info!("Imported {} entries into {}", events.len(), self.repository.display());
		Ok(events)
	}

	fn import_dir(&self, rel: &Path, events: &mut Vec<Event>) -> SyncResult<()> {
		for name in sorted_names(&self.payload.join(rel))? {
			let rel = rel.join(&name);
			let source = self.payload.join(&rel);
			if source.is_dir() {
				self.import_dir(&rel, events)?;
				continue;
			}

			let (raw, node) = self.addresses(&rel);
			let mode = match self.admitting(&raw, &node) {
				Some(filter) => filter.mode,
				None => continue,
			};
			let target = self.repository.join(&rel);
			match apply(&source, &target, mode) {
				Ok(code) => events.push(Event::Message(code, node)),
				Err(e) => events.push(Event::Error(node, e.to_string())),
			}
		}
		Ok(())
	}

	// Bottom-up removal of in-scope repository entries absent from the payload
	fn delete_missing(&self, rel: &Path, events: &mut Vec<Event>) -> SyncResult<()> {
		for name in sorted_names(&self.repository.join(rel))? {
			let rel = rel.join(&name);
			let target = self.repository.join(&rel);
			let (raw, node) = self.addresses(&rel);
			let is_dir = target.is_dir();

			if is_dir && self.leads_into_scope(&node) {
				self.delete_missing(&rel, events)?;
			}
			let replaceable = matches!(
				self.admitting(&raw, &node).map(|f| f.mode),
				Some(ImportMode::Replace)
			);
			if !replaceable || self.payload.join(&rel).exists() {
				continue;
			}

			if is_dir {
				// Out-of-scope descendants keep the directory alive
				if fs::remove_dir(&target).is_ok() {
					debug!("Removed directory {}", target.display());
				}
			} else {
				match fs::remove_file(&target) {
					Ok(()) => events.push(Event::Message("D", node)),
					Err(e) => events.push(Event::Error(node, e.to_string())),
				}
			}
		}
		Ok(())
	}

	/// On-disk address and node address of a path relative to the mirror root
	fn addresses(&self, rel: &Path) -> (String, String) {
		let segments: Vec<String> =
			rel.iter().map(|s| s.to_string_lossy().into_owned()).collect();
		let raw = format!("/{}", segments.join("/"));
		let node = self
			.mapper
			.normalize(&raw)
			.split('/')
			.map(decode_segment)
			.collect::<Vec<_>>()
			.join("/");
		let node = if node.is_empty() { "/".to_string() } else { node };
		(raw, node)
	}

	fn admitting(&self, raw: &str, node: &str) -> Option<&Filter> {
		self.filters.iter().find(|f| {
			f.matcher.contains(node)
				&& (raw == node || !f.matcher.covers(raw) || f.matcher.contains(raw))
		})
	}

	// True when a filter root lies at or below `node`, or `node` lies below a root
	fn leads_into_scope(&self, node: &str) -> bool {
		self.filters.iter().any(|f| f.matcher.covers(node) || is_within(&f.root, node))
	}
}

fn apply(source: &Path, target: &Path, mode: ImportMode) -> SyncResult<&'static str> {
	if !target.exists() {
		if let Some(parent) = target.parent() {
			fs::create_dir_all(parent).map_err(|e| SyncError::fs(parent, e))?;
		}
		fs::copy(source, target).map_err(|e| SyncError::fs(target, e))?;
		return Ok("A");
	}
	if mode != ImportMode::Merge && files_differ(source, target)? {
		fs::copy(source, target).map_err(|e| SyncError::fs(target, e))?;
		return Ok("U");
	}
	Ok("-")
}

fn is_within(address: &str, ancestor: &str) -> bool {
	ancestor == "/"
		|| address == ancestor
		|| (address.starts_with(ancestor) && address[ancestor.len()..].starts_with('/'))
}

fn sorted_names(dir: &Path) -> SyncResult<Vec<String>> {
	let mut names = Vec::new();
	let entries = match fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
		Err(e) => return Err(SyncError::fs(dir, e)),
	};
	for entry in entries {
		let entry = entry.map_err(|e| SyncError::fs(dir, e))?;
		names.push(entry.file_name().to_string_lossy().into_owned());
	}
	names.sort();
	Ok(names)
}


// vim: ts=4
