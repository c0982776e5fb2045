//! Directory sync engine
//!
//! Makes a target tree match a source tree: the source always wins and
//! target entries without a source counterpart are deleted. Every touched
//! path is classified as a [`ChangeEntry`], including unchanged files.
//!
//! A sync runs in two passes. The deletion pass walks the target bottom-up
//! and must finish before the copy pass walks the source top-down. Siblings
//! are visited in lexical order.
//!
//! File contents are compared byte for byte; timestamps are never consulted.
//! Any I/O failure aborts the walk and leaves the target in an undefined,
//! partially synced state.

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::logging::*;
use crate::types::{ChangeAction, ChangeEntry, SyncDirection};

const COMPARE_BUFFER_SIZE: usize = 64 * 1024;

/// Recursive tree reconciliation
#[derive(Debug, Clone, Default)]
pub struct DirectorySync {
	cancel: Option<Arc<AtomicBool>>,
}

impl DirectorySync {
	pub fn new() -> Self {
		Self { cancel: None }
	}

	/// Abort walks with [`SyncError::Aborted`] once `flag` is set
	pub fn with_cancellation(mut self, flag: Option<Arc<AtomicBool>>) -> Self {
		self.cancel = flag;
		self
	}

	/// Sync between a local path and its staged mirror in `direction`
	///
	/// Pull makes `local` match `staged`; push makes `staged` match `local`.
	pub fn sync(
		&self,
		local: &Path,
		staged: &Path,
		direction: SyncDirection,
	) -> SyncResult<Vec<ChangeEntry>> {
		let (source, target) = direction.endpoints(local, staged);
		debug!("{}: {} -> {}", direction, source.display(), target.display());
		self.sync_path(source, target)
	}

	/// Sync a file or directory, whichever `source` is
	///
	/// A missing source yields no entries.
	pub fn sync_path(&self, source: &Path, target: &Path) -> SyncResult<Vec<ChangeEntry>> {
		match fs::metadata(source) {
			Ok(m) if m.is_dir() => self.sync_directory(source, target),
			Ok(_) => Ok(vec![self.sync_file(source, target)?]),
			Err(_) => {
				warn!("Nothing to sync, source does not exist: {}", source.display());
				Ok(Vec::new())
			}
		}
	}

	/// Make `target` a byte-identical copy of the file `source`
	pub fn sync_file(&self, source: &Path, target: &Path) -> SyncResult<ChangeEntry> {
		self.check_cancelled()?;
		let entry = match fs::symlink_metadata(target) {
			Err(_) => {
				copy_file(source, target)?;
				ChangeEntry::with_message(ChangeAction::Added, display(target), "New file")
			}
			Ok(m) if m.is_dir() => {
				fs::remove_dir_all(target).map_err(|e| SyncError::fs(target, e))?;
				copy_file(source, target)?;
				ChangeEntry::with_message(ChangeAction::Updated, display(target), "Replaced directory")
			}
			Ok(_) if files_differ(source, target)? => {
				copy_file(source, target)?;
				ChangeEntry::with_message(ChangeAction::Updated, display(target), "Content changed")
			}
			Ok(_) => {
				ChangeEntry::with_message(ChangeAction::NoChange, display(target), "Content unchanged")
			}
		};
		debug!("[{}] {}", entry.action, entry.path);
		Ok(entry)
	}

	/// Make the tree at `target` match the tree at `source`
	pub fn sync_directory(&self, source: &Path, target: &Path) -> SyncResult<Vec<ChangeEntry>> {
		if !source.exists() {
			warn!("Source directory does not exist: {}", source.display());
			return Ok(Vec::new());
		}

		let mut entries = Vec::new();
		if !exists(target) {
			fs::create_dir_all(target).map_err(|e| SyncError::fs(target, e))?;
			entries.push(ChangeEntry::with_message(
				ChangeAction::Added,
				display(target),
				"Created directory",
			));
		}

		self.delete_pass(source, target, target, &mut entries)?;
		self.copy_pass(source, target, source, &mut entries)?;

		info!(
			"Synced {} -> {}: {} entries, {} changed",
			source.display(),
			target.display(),
			entries.len(),
			entries.iter().filter(|e| e.action.is_change()).count()
		);
		Ok(entries)
	}

	/// Bottom-up over `dir` (inside `target`), deleting entries absent from `source`
	fn delete_pass(
		&self,
		source: &Path,
		target: &Path,
		dir: &Path,
		entries: &mut Vec<ChangeEntry>,
	) -> SyncResult<()> {
		for path in sorted_children(dir)? {
			self.check_cancelled()?;
			let counterpart = counterpart(target, source, &path)?;
			let metadata = fs::symlink_metadata(&path).map_err(|e| SyncError::fs(&path, e))?;

			if metadata.is_dir() {
				self.delete_pass(source, target, &path, entries)?;
				if !exists(&counterpart) {
					fs::remove_dir(&path).map_err(|e| SyncError::fs(&path, e))?;
					debug!("[D] {}", path.display());
					entries.push(ChangeEntry::with_message(
						ChangeAction::Deleted,
						display(&path),
						"Directory not in source",
					));
				}
			} else if !exists(&counterpart) {
				fs::remove_file(&path).map_err(|e| SyncError::fs(&path, e))?;
				debug!("[D] {}", path.display());
				entries.push(ChangeEntry::with_message(
					ChangeAction::Deleted,
					display(&path),
					"File not in source",
				));
			}
		}
		Ok(())
	}

	/// Top-down over `dir` (inside `source`), creating and updating target entries
	fn copy_pass(
		&self,
		source: &Path,
		target: &Path,
		dir: &Path,
		entries: &mut Vec<ChangeEntry>,
	) -> SyncResult<()> {
		for path in sorted_children(dir)? {
			self.check_cancelled()?;
			let counterpart = counterpart(source, target, &path)?;
			let metadata = fs::metadata(&path).map_err(|e| SyncError::fs(&path, e))?;

			if metadata.is_dir() {
				match fs::symlink_metadata(&counterpart) {
					Err(_) => {
						fs::create_dir(&counterpart).map_err(|e| SyncError::fs(&counterpart, e))?;
						debug!("[A] {}", counterpart.display());
						entries.push(ChangeEntry::with_message(
							ChangeAction::Added,
							display(&counterpart),
							"Created directory",
						));
					}
					Ok(m) if !m.is_dir() => {
						fs::remove_file(&counterpart).map_err(|e| SyncError::fs(&counterpart, e))?;
						fs::create_dir(&counterpart).map_err(|e| SyncError::fs(&counterpart, e))?;
						debug!("[U] {}", counterpart.display());
						entries.push(ChangeEntry::with_message(
							ChangeAction::Updated,
							display(&counterpart),
							"Replaced file with directory",
						));
					}
					Ok(_) => {}
				}
				self.copy_pass(source, target, &path, entries)?;
			} else {
				entries.push(self.sync_file(&path, &counterpart)?);
			}
		}
		Ok(())
	}

	fn check_cancelled(&self) -> SyncResult<()> {
		match &self.cancel {
			Some(flag) if flag.load(Ordering::Relaxed) => Err(SyncError::Aborted),
			_ => Ok(()),
		}
	}
}

/// Two files are equal iff they are the same entry or have identical bytes
pub fn files_differ(a: &Path, b: &Path) -> SyncResult<bool> {
	if same_file(a, b)? {
		return Ok(false);
	}
	let (meta_a, meta_b) = (
		fs::metadata(a).map_err(|e| SyncError::fs(a, e))?,
		fs::metadata(b).map_err(|e| SyncError::fs(b, e))?,
	);
	if meta_a.len() != meta_b.len() {
		return Ok(true);
	}

	let mut reader_a = BufReader::new(File::open(a).map_err(|e| SyncError::fs(a, e))?);
	let mut reader_b = BufReader::new(File::open(b).map_err(|e| SyncError::fs(b, e))?);
	let mut buf_a = vec![0u8; COMPARE_BUFFER_SIZE];
	let mut buf_b = vec![0u8; COMPARE_BUFFER_SIZE];
	loop {
		let n = read_full(&mut reader_a, &mut buf_a).map_err(|e| SyncError::fs(a, e))?;
		let m = read_full(&mut reader_b, &mut buf_b).map_err(|e| SyncError::fs(b, e))?;
		if n != m || buf_a[..n] != buf_b[..m] {
			return Ok(true);
		}
		if n == 0 {
			return Ok(false);
		}
	}
}

// Fill `buf` unless the reader hits end of file first
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
	let mut filled = 0;
	while filled < buf.len() {
		match reader.read(&mut buf[filled..])? {
			0 => break,
			n => filled += n,
		}
	}
	Ok(filled)
}

fn same_file(a: &Path, b: &Path) -> SyncResult<bool> {
	#[cfg(unix)]
	{
		use std::os::unix::fs::MetadataExt;
		let meta_a = fs::metadata(a).map_err(|e| SyncError::fs(a, e))?;
		let meta_b = fs::metadata(b).map_err(|e| SyncError::fs(b, e))?;
		Ok(meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino())
	}

	#[cfg(not(unix))]
	{
		let canon_a = fs::canonicalize(a).map_err(|e| SyncError::fs(a, e))?;
		let canon_b = fs::canonicalize(b).map_err(|e| SyncError::fs(b, e))?;
		Ok(canon_a == canon_b)
	}
}

fn copy_file(source: &Path, target: &Path) -> SyncResult<()> {
	if let Some(parent) = target.parent() {
		fs::create_dir_all(parent).map_err(|e| SyncError::fs(parent, e))?;
	}
	fs::copy(source, target).map_err(|e| SyncError::fs(target, e))?;
	Ok(())
}

fn sorted_children(dir: &Path) -> SyncResult<Vec<PathBuf>> {
	let mut children = Vec::new();
	for entry in fs::read_dir(dir).map_err(|e| SyncError::fs(dir, e))? {
		children.push(entry.map_err(|e| SyncError::fs(dir, e))?.path());
	}
	children.sort();
	Ok(children)
}

/// Map `path` under `from_root` to the same relative path under `to_root`
fn counterpart(from_root: &Path, to_root: &Path, path: &Path) -> SyncResult<PathBuf> {
	let relative = path.strip_prefix(from_root).map_err(|_| SyncError::Other {
		message: format!("{} is not inside {}", path.display(), from_root.display()),
	})?;
	Ok(to_root.join(relative))
}

fn exists(path: &Path) -> bool {
	fs::symlink_metadata(path).is_ok()
}

fn display(path: &Path) -> String {
	path.to_string_lossy().into_owned()
}


// vim: ts=4
