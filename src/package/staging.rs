//! Ephemeral staging areas shaped like a content package
//!
//! Each operation gets its own uniquely named directory. The [`StagingArea`]
//! guard removes it when dropped, so the directory is released on every exit
//! path, including early returns and panics.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{filter_xml, FILTER_FILE, METADATA_DIR};
use crate::config::{Config, DEFAULT_STAGING_PREFIX};
use crate::error::{SyncError, SyncResult};
use crate::logging::*;
use crate::path_mapper::PathMapper;
use crate::scope::ScopeDescriptor;

/// Creates staging areas and writes their scope descriptors
#[derive(Debug, Clone)]
pub struct StagingManager {
	parent: Option<PathBuf>,
	prefix: String,
	mapper: PathMapper,
}

impl StagingManager {
	pub fn new(parent: Option<PathBuf>, prefix: impl Into<String>, mapper: PathMapper) -> Self {
		Self { parent, prefix: prefix.into(), mapper }
	}

	pub fn from_config(config: &Config) -> Self {
		Self::new(
			config.staging_dir.clone(),
			config.staging_prefix.clone(),
			PathMapper::from_config(config),
		)
	}

	/// Allocate a fresh, uniquely named staging directory
	pub fn create(&self) -> SyncResult<StagingArea> {
		let parent = self.parent.clone().unwrap_or_else(std::env::temp_dir);
		fs::create_dir_all(&parent).map_err(|e| SyncError::fs(&parent, e))?;

		let root = parent.join(format!("{}{}", self.prefix, uuid::Uuid::new_v4().simple()));
		// create_dir fails on an existing path, so a collision never shares a tree
		fs::create_dir(&root).map_err(|e| SyncError::fs(&root, e))?;
		debug!("Created staging area {}", root.display());

		Ok(StagingArea { root, mapper: self.mapper.clone(), released: false })
	}

	/// Write `scope` to `META-INF/vault/filter.xml` inside the staging area
	pub fn write_scope_descriptor(
		&self,
		area: &StagingArea,
		scope: &ScopeDescriptor,
	) -> SyncResult<PathBuf> {
		let path = area.descriptor_path();
		if let Some(dir) = path.parent() {
			fs::create_dir_all(dir).map_err(|e| SyncError::fs(dir, e))?;
		}
		let xml = filter_xml::write(scope)?;
		fs::write(&path, xml.as_bytes()).map_err(|e| SyncError::fs(&path, e))?;
		debug!("Wrote scope descriptor for {} to {}", scope.root, path.display());
		Ok(path)
	}

	/// Recursively delete a staging directory, children before parents
	///
	/// A missing path is a no-op. Entries that cannot be removed are logged
	/// and skipped; the number of entries left behind is returned.
	pub fn destroy(path: Option<&Path>) -> usize {
		let path = match path {
			Some(p) => p,
			None => return 0,
		};
		let mut failures = 0;
		remove_tree(path, &mut failures);
		if failures == 0 {
			debug!("Deleted staging area {}", path.display());
		} else {
			warn!("Staging area {} left {} entries behind", path.display(), failures);
		}
		failures
	}
}

impl Default for StagingManager {
	fn default() -> Self {
		Self::new(None, DEFAULT_STAGING_PREFIX, PathMapper::default())
	}
}

fn remove_tree(path: &Path, failures: &mut usize) {
	let metadata = match fs::symlink_metadata(path) {
		Ok(m) => m,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return,
		Err(e) => {
			warn!("Cannot access {} during cleanup: {}", path.display(), e);
			*failures += 1;
			return;
		}
	};

	let result = if metadata.is_dir() {
		match fs::read_dir(path) {
			Ok(entries) => {
				for entry in entries.flatten() {
					remove_tree(&entry.path(), failures);
				}
			}
			Err(e) => warn!("Cannot read directory {} during cleanup: {}", path.display(), e),
		}
		fs::remove_dir(path)
	} else {
		fs::remove_file(path)
	};

	match result {
		Ok(()) => {}
		Err(e) if e.kind() == io::ErrorKind::NotFound => {}
		Err(e) => {
			warn!("Failed to remove {}: {}", path.display(), e);
			*failures += 1;
		}
	}
}

/// A staging directory owned by one operation
#[derive(Debug)]
pub struct StagingArea {
	root: PathBuf,
	mapper: PathMapper,
	released: bool,
}

impl StagingArea {
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Location of the scope descriptor
	pub fn descriptor_path(&self) -> PathBuf {
		self.root.join(METADATA_DIR).join(FILTER_FILE)
	}

	/// Root of the payload mirror (`{root}/jcr_root`)
	pub fn payload_root(&self) -> PathBuf {
		self.root.join(self.mapper.marker())
	}

	/// Mirrored location of `address` inside the payload
	pub fn payload_path(&self, address: &str) -> PathBuf {
		self.mapper.to_local_path(&self.root, address)
	}

	/// Delete the staging directory now; returns entries left behind
	pub fn close(mut self) -> usize {
		self.released = true;
		StagingManager::destroy(Some(&self.root))
	}
}

impl Drop for StagingArea {
	fn drop(&mut self) {
		if !self.released {
			StagingManager::destroy(Some(&self.root));
		}
	}
}


// vim: ts=4
