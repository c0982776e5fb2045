//! Error types for vltsync operations

use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Result alias used by every core component
pub type SyncResult<T> = Result<T, SyncError>;

/// Main error type for sync operations
#[derive(Debug)]
pub enum SyncError {
	/// Local path does not sit under the mirrored-hierarchy marker
	UnmappableAddress { path: PathBuf },

	/// I/O error without a more specific location
	Io(io::Error),

	/// I/O error on a specific filesystem entry
	Filesystem { path: PathBuf, source: io::Error },

	/// Scope descriptor could not be written or parsed
	Descriptor { message: String },

	/// Scope pattern is not a valid regular expression
	InvalidPattern { pattern: String, message: String },

	/// Remote transfer delegate failed
	Remote { message: String },

	/// Invalid configuration
	InvalidConfig { message: String },

	/// No remote target matches the requested name
	UnknownTarget { name: String },

	/// Operation cancelled through the progress sink
	Aborted,

	/// Generic error message
	Other { message: String },
}

impl SyncError {
	/// Wrap an I/O error with the path it happened on
	pub fn fs(path: impl AsRef<Path>, source: io::Error) -> Self {
		SyncError::Filesystem { path: path.as_ref().to_path_buf(), source }
	}

	/// Build a remote delegate failure from any displayable cause
	pub fn remote(message: impl fmt::Display) -> Self {
		SyncError::Remote { message: message.to_string() }
	}

	/// True for failures caused by the remote delegate
	pub fn is_remote(&self) -> bool {
		matches!(self, SyncError::Remote { .. })
	}
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::UnmappableAddress { path } => {
				write!(f, "Path is not under a content root: {}", path.display())
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::Filesystem { path, source } => {
				write!(f, "{}: {}", path.display(), source)
			}
			SyncError::Descriptor { message } => {
				write!(f, "Invalid filter descriptor: {}", message)
			}
			SyncError::InvalidPattern { pattern, message } => {
				write!(f, "Invalid filter pattern '{}': {}", pattern, message)
			}
			SyncError::Remote { message } => write!(f, "{}", message),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::UnknownTarget { name } => {
				if name.is_empty() {
					write!(f, "No default server configured")
				} else {
					write!(f, "Unknown server: {}", name)
				}
			}
			SyncError::Aborted => write!(f, "Operation aborted by user"),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::Io(e) => Some(e),
			SyncError::Filesystem { source, .. } => Some(source),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<tokio::task::JoinError> for SyncError {
	fn from(e: tokio::task::JoinError) -> Self {
		SyncError::Other { message: format!("Background task failed: {}", e) }
	}
}


// vim: ts=4
