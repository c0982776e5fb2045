//! Mapping between local mirror paths and remote hierarchical addresses
//!
//! A local project mirrors the remote hierarchy below a marker directory
//! (`jcr_root` by default): `/work/app/jcr_root/content/site` maps to the
//! remote address `/content/site`. Node properties live in descriptor files,
//! so some local names need normalizing before they can be used as a
//! filter root:
//!
//! - `/content/site/.content.xml` describes `/content/site` itself
//! - `/apps/site/_cq_dialog.xml` describes the namespaced node `/apps/site/cq:dialog`

use std::path::{Path, PathBuf};

use crate::config::Config;

/// Converts local paths to remote addresses and back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapper {
	marker: String,
	content_descriptor: String,
}

impl PathMapper {
	pub fn new(marker: impl Into<String>, content_descriptor: impl Into<String>) -> Self {
		Self { marker: marker.into(), content_descriptor: content_descriptor.into() }
	}

	pub fn from_config(config: &Config) -> Self {
		Self::new(config.marker_segment.clone(), config.content_descriptor.clone())
	}

	pub fn marker(&self) -> &str {
		&self.marker
	}

	pub fn content_descriptor(&self) -> &str {
		&self.content_descriptor
	}

	/// Map an absolute local path to its remote address
	///
	/// Returns `None` when no segment of the path equals the marker, or when a
	/// `..` segment climbs above it. Both `/` and `\` are accepted as
	/// separators; `.` segments are dropped and `..` segments pop their parent.
	pub fn to_remote_address(&self, local: &Path) -> Option<String> {
		self.str_to_remote_address(&local.to_string_lossy())
	}

	/// String form of [`PathMapper::to_remote_address`]
	pub fn str_to_remote_address(&self, local: &str) -> Option<String> {
		let mut segments = local.split(|c| c == '/' || c == '\\');
		segments.by_ref().find(|s| *s == self.marker)?;

		let mut address: Vec<&str> = Vec::new();
		for segment in segments {
			match segment {
				"" | "." => {}
				".." => {
					address.pop()?;
				}
				s => address.push(s),
			}
		}
		Some(format!("/{}", address.join("/")))
	}

	/// Map a remote address to its location below a local mirror root
	///
	/// `mirror_root` is the directory that contains the marker directory.
	pub fn to_local_path(&self, mirror_root: &Path, address: &str) -> PathBuf {
		let mut path = mirror_root.join(&self.marker);
		for segment in address.split('/').filter(|s| !s.is_empty()) {
			path.push(segment);
		}
		path
	}

	/// True when the address names the implicit-content descriptor of its parent
	pub fn is_content_descriptor(&self, address: &str) -> bool {
		address.ends_with(&format!("/{}", self.content_descriptor))
	}

	/// Normalize descriptor-file addresses to the node they describe
	///
	/// When the final segment is a namespaced descriptor, every `_ns_name`
	/// segment on the way to it is rewritten as well.
	pub fn normalize(&self, address: &str) -> String {
		if self.is_content_descriptor(address) {
			let stripped = &address[..address.len() - self.content_descriptor.len() - 1];
			return if stripped.is_empty() { "/".to_string() } else { stripped.to_string() };
		}

		let (parent, name) = match address.rfind('/') {
			Some(idx) => (&address[..idx], &address[idx + 1..]),
			None => ("", address),
		};
		match self.namespaced_node_name(name) {
			Some(node) => {
				let parent: Vec<String> = parent.split('/').map(decode_segment).collect();
				format!("{}/{}", parent.join("/"), node)
			}
			None => address.to_string(),
		}
	}

	/// Rewrite `_ns_name.xml` to `ns:name`
	///
	/// Only applies when the name carries the descriptor extension and starts
	/// with a namespace token: `_`, one or more ASCII alphanumerics, `_`.
	fn namespaced_node_name(&self, name: &str) -> Option<String> {
		let extension = self.descriptor_extension()?;
		let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
		let node = decode_segment(stem);
		if node == stem {
			None
		} else {
			Some(node)
		}
	}

	fn descriptor_extension(&self) -> Option<&str> {
		let idx = self.content_descriptor.rfind('.')?;
		let ext = &self.content_descriptor[idx + 1..];
		if ext.is_empty() {
			None
		} else {
			Some(ext)
		}
	}
}

/// Decode an on-disk segment `_ns_name` into the node name `ns:name`
///
/// Segments without a namespace token are returned unchanged.
pub fn decode_segment(segment: &str) -> String {
	let rest = match segment.strip_prefix('_') {
		Some(rest) => rest,
		None => return segment.to_string(),
	};
	match rest.find('_') {
		Some(end)
			if end > 0
				&& end + 1 < rest.len()
				&& rest[..end].chars().all(|c| c.is_ascii_alphanumeric()) =>
		{
			format!("{}:{}", &rest[..end], &rest[end + 1..])
		}
		_ => segment.to_string(),
	}
}

impl Default for PathMapper {
	fn default() -> Self {
		Self::from_config(&Config::default())
	}
}


// vim: ts=4
