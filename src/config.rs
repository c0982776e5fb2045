//! Configuration for vltsync
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (`Config::default()`)
//! 2. Config file (`vltsync.toml`, or `.json`/`.json5`)
//! 3. CLI flags (highest priority)

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SyncError, SyncResult};
use crate::types::ConnectionInfo;

/// Default directory name marking where the local layout mirrors remote addresses
pub const DEFAULT_MARKER_SEGMENT: &str = "jcr_root";

/// Default name of the implicit-content descriptor file
pub const DEFAULT_CONTENT_DESCRIPTOR: &str = ".content.xml";

/// Default prefix for staging directory names
pub const DEFAULT_STAGING_PREFIX: &str = "vltsync-";

/// Unified configuration for vltsync operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// LAYOUT CONVENTIONS
	// ========================================================================
	/// Directory segment where the mirrored hierarchy begins
	pub marker_segment: String,

	/// File holding node properties of its parent directory
	pub content_descriptor: String,

	// ========================================================================
	// STAGING
	// ========================================================================
	/// Parent directory for staging areas (system temp dir when unset)
	pub staging_dir: Option<PathBuf>,

	/// Prefix of every staging directory name
	pub staging_prefix: String,

	/// Default `mode` attribute written into scope descriptors
	pub filter_mode: Option<String>,

	// ========================================================================
	// REMOTE TARGETS
	// ========================================================================
	/// Configured servers
	pub servers: Vec<RemoteTarget>,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			marker_segment: DEFAULT_MARKER_SEGMENT.to_string(),
			content_descriptor: DEFAULT_CONTENT_DESCRIPTOR.to_string(),
			staging_dir: None,
			staging_prefix: DEFAULT_STAGING_PREFIX.to_string(),
			filter_mode: None,
			servers: Vec::new(),
		}
	}
}

/// A named remote repository server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteTarget {
	pub id: String,
	pub name: String,
	pub url: String,
	pub username: String,
	pub password: String,
	pub is_default: bool,
}

impl Default for RemoteTarget {
	fn default() -> Self {
		RemoteTarget {
			id: uuid::Uuid::new_v4().to_string(),
			name: String::new(),
			url: String::new(),
			username: String::new(),
			password: String::new(),
			is_default: false,
		}
	}
}

impl RemoteTarget {
	pub fn connection_info(&self) -> ConnectionInfo {
		ConnectionInfo::new(self.url.clone(), self.username.clone(), self.password.clone())
	}
}

impl Config {
	/// Load configuration from a TOML or JSON5 file, chosen by extension
	pub fn load(path: &Path) -> SyncResult<Self> {
		let contents = fs::read_to_string(path).map_err(|e| SyncError::fs(path, e))?;
		let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
		let config: Config = match ext {
			"json" | "json5" => json5::from_str(&contents).map_err(|e| {
				SyncError::InvalidConfig { message: format!("{}: {}", path.display(), e) }
			})?,
			_ => toml::from_str(&contents).map_err(|e| SyncError::InvalidConfig {
				message: format!("{}: {}", path.display(), e),
			})?,
		};
		config.validate()?;
		Ok(config)
	}

	/// Check layout conventions and server list consistency
	pub fn validate(&self) -> SyncResult<()> {
		if self.marker_segment.is_empty() || self.marker_segment.contains(['/', '\\']) {
			return Err(SyncError::InvalidConfig {
				message: format!("markerSegment must be a single path segment: '{}'", self.marker_segment),
			});
		}
		if self.content_descriptor.is_empty() || self.content_descriptor.contains(['/', '\\']) {
			return Err(SyncError::InvalidConfig {
				message: format!(
					"contentDescriptor must be a plain file name: '{}'",
					self.content_descriptor
				),
			});
		}

		let mut names = BTreeSet::new();
		for server in &self.servers {
			if !names.insert(server.name.as_str()) {
				return Err(SyncError::InvalidConfig {
					message: format!("duplicate server name '{}'", server.name),
				});
			}
		}
		if self.servers.iter().filter(|s| s.is_default).count() > 1 {
			return Err(SyncError::InvalidConfig {
				message: "more than one server is marked as default".to_string(),
			});
		}
		Ok(())
	}

	/// Pick a server: explicit name, else the only one, else the default one
	pub fn resolve_target(&self, name: Option<&str>) -> SyncResult<&RemoteTarget> {
		if let Some(name) = name {
			return self
				.servers
				.iter()
				.find(|s| s.name == name)
				.ok_or_else(|| SyncError::UnknownTarget { name: name.to_string() });
		}
		if self.servers.len() == 1 {
			return Ok(&self.servers[0]);
		}
		self.servers
			.iter()
			.find(|s| s.is_default)
			.ok_or_else(|| SyncError::UnknownTarget { name: String::new() })
	}
}

/// Supplies connection details for a named remote target
pub trait ConnectionProvider: Send + Sync {
	fn connection(&self, target: Option<&str>) -> SyncResult<ConnectionInfo>;
}

impl ConnectionProvider for Config {
	fn connection(&self, target: Option<&str>) -> SyncResult<ConnectionInfo> {
		self.resolve_target(target).map(RemoteTarget::connection_info)
	}
}


// vim: ts=4
