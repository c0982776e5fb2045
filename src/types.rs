//! Core data types shared by all components

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a single touched path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeAction {
	Added,
	Updated,
	Deleted,
	Error,
	NoChange,
}

impl ChangeAction {
	/// Map a remote delegate action code to an action
	///
	/// `A`, `U`, `D` and `E` are recognised, anything else means nothing changed.
	pub fn from_code(code: &str) -> Self {
		match code {
			"A" => ChangeAction::Added,
			"U" => ChangeAction::Updated,
			"D" => ChangeAction::Deleted,
			"E" => ChangeAction::Error,
			_ => ChangeAction::NoChange,
		}
	}

	/// Whether this action represents an actual change
	pub fn is_change(self) -> bool {
		!matches!(self, ChangeAction::NoChange)
	}
}

impl fmt::Display for ChangeAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ChangeAction::Added => "A",
			ChangeAction::Updated => "U",
			ChangeAction::Deleted => "D",
			ChangeAction::Error => "E",
			ChangeAction::NoChange => "-",
		};
		write!(f, "{}", s)
	}
}

/// One classified filesystem or remote mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
	pub action: ChangeAction,
	pub path: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl ChangeEntry {
	pub fn new(action: ChangeAction, path: impl Into<String>) -> Self {
		Self { action, path: path.into(), message: None }
	}

	pub fn with_message(
		action: ChangeAction,
		path: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self { action, path: path.into(), message: Some(message.into()) }
	}
}

/// Result of one pull or push call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
	pub success: bool,
	pub message: String,
	pub entries: Vec<ChangeEntry>,
}

impl OperationResult {
	pub fn succeeded(message: impl Into<String>, entries: Vec<ChangeEntry>) -> Self {
		Self { success: true, message: message.into(), entries }
	}

	/// Operation-level failure; never carries entries
	pub fn failed(message: impl Into<String>) -> Self {
		Self { success: false, message: message.into(), entries: Vec::new() }
	}
}

/// Direction of a sync operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncDirection {
	/// Remote to local (export from the repository)
	Pull,
	/// Local to remote (import into the repository)
	Push,
}

impl SyncDirection {
	/// Order `(local, staged)` as `(source, target)` for the directory sync engine
	pub fn endpoints<'a, T: ?Sized>(self, local: &'a T, staged: &'a T) -> (&'a T, &'a T) {
		match self {
			SyncDirection::Pull => (staged, local),
			SyncDirection::Push => (local, staged),
		}
	}
}

impl fmt::Display for SyncDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncDirection::Pull => write!(f, "pull"),
			SyncDirection::Push => write!(f, "push"),
		}
	}
}

/// States an operation moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
	Idle,
	ResolvingAddress,
	Staging,
	DelegatingRemote,
	LocalSync,
	Reconciling,
	CleaningUp,
	Succeeded,
	Failed,
}

/// Connection details for one remote target
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
	pub base_url: String,
	pub username: String,
	pub password: String,
}

impl ConnectionInfo {
	pub fn new(
		base_url: impl Into<String>,
		username: impl Into<String>,
		password: impl Into<String>,
	) -> Self {
		Self { base_url: base_url.into(), username: username.into(), password: password.into() }
	}

	/// Repository mount point below the server base url
	pub fn repository_url(&self) -> String {
		format!("{}/crx", self.base_url.trim_end_matches('/'))
	}
}

// Keep passwords out of logs
impl fmt::Debug for ConnectionInfo {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ConnectionInfo")
			.field("base_url", &self.base_url)
			.field("username", &self.username)
			.field("password", &"***")
			.finish()
	}
}


// vim: ts=4
