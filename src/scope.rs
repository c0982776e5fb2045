//! Transfer scope: the filter root plus include/exclude address patterns
//!
//! Selecting a directory puts its whole subtree in scope. Selecting a single
//! content descriptor (`.content.xml`) must only transfer the node's own
//! properties, so every sibling of the descriptor, which represents a child
//! node, is excluded explicitly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{SyncError, SyncResult};
use crate::logging::*;
use crate::path_mapper::PathMapper;

/// Bounds of a single transfer operation
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScopeDescriptor {
	pub root: String,
	pub mode: String,
	pub exclude_patterns: Vec<String>,
	pub include_patterns: Vec<String>,
}

impl ScopeDescriptor {
	/// Whole subtree at `root`
	pub fn new(root: impl Into<String>) -> Self {
		Self { root: root.into(), ..Self::default() }
	}

	pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
		self.mode = mode.into();
		self
	}

	pub fn has_rules(&self) -> bool {
		!self.include_patterns.is_empty() || !self.exclude_patterns.is_empty()
	}

	/// Compile the patterns for address matching
	pub fn matcher(&self) -> SyncResult<ScopeMatcher> {
		ScopeMatcher::new(self)
	}
}

#[derive(Debug)]
struct Rule {
	include: bool,
	regex: Regex,
}

/// Compiled form of a [`ScopeDescriptor`]
///
/// Patterns are regular expressions matched against the whole address. Rules
/// apply in document order (includes, then excludes) and the last matching
/// rule decides. An address matching no rule gets the opposite of the first
/// rule's kind; with no rules everything below the root is in scope.
#[derive(Debug)]
pub struct ScopeMatcher {
	root: String,
	rules: Vec<Rule>,
}

impl ScopeMatcher {
	pub fn new(scope: &ScopeDescriptor) -> SyncResult<Self> {
		let includes = scope.include_patterns.iter().map(|p| (true, p));
		let excludes = scope.exclude_patterns.iter().map(|p| (false, p));
		let rules = includes
			.chain(excludes)
			.map(|(include, pattern)| {
				Regex::new(&format!("^(?:{})$", pattern))
					.map(|regex| Rule { include, regex })
					.map_err(|e| SyncError::InvalidPattern {
						pattern: pattern.clone(),
						message: e.to_string(),
					})
			})
			.collect::<SyncResult<Vec<_>>>()?;
		Ok(Self { root: scope.root.clone(), rules })
	}

	/// True when `address` is the root or lies below it
	pub fn covers(&self, address: &str) -> bool {
		if self.root == "/" {
			return address.starts_with('/');
		}
		address == self.root
			|| (address.starts_with(&self.root) && address[self.root.len()..].starts_with('/'))
	}

	/// True when `address` is in scope
	pub fn contains(&self, address: &str) -> bool {
		if !self.covers(address) {
			return false;
		}
		let mut included = match self.rules.first() {
			Some(rule) => !rule.include,
			None => return true,
		};
		for rule in &self.rules {
			if rule.regex.is_match(address) {
				included = rule.include;
			}
		}
		included
	}
}

/// Builds the transfer scope for a local selection
#[derive(Debug, Clone, Default)]
pub struct FilterScopeBuilder {
	mapper: PathMapper,
	mode: Option<String>,
}

impl FilterScopeBuilder {
	pub fn new(mapper: PathMapper) -> Self {
		Self { mapper, mode: None }
	}

	/// Write `mode` into every built scope
	pub fn with_mode(mut self, mode: Option<String>) -> Self {
		self.mode = mode.filter(|m| !m.is_empty());
		self
	}

	/// Build the scope for `local_selection`, which maps to `remote_address`
	///
	/// `normalized_address` is `remote_address` after [`PathMapper::normalize`].
	pub fn build(
		&self,
		local_selection: &Path,
		remote_address: &str,
		normalized_address: &str,
	) -> SyncResult<ScopeDescriptor> {
		let mut scope = ScopeDescriptor::new(normalized_address);
		if let Some(mode) = &self.mode {
			scope.mode = mode.clone();
		}
		if !self.mapper.is_content_descriptor(remote_address) {
			return Ok(scope);
		}

		let siblings = match local_selection.parent() {
			Some(parent) => self.sibling_names(parent)?,
			None => Vec::new(),
		};
		let base = normalized_address.trim_end_matches('/');
		scope.exclude_patterns =
			siblings.iter().map(|name| format!("{}/{}(/.*)?", base, name)).collect();
		debug!(
			"Scope for {} excludes {} sibling(s) of {}",
			normalized_address,
			scope.exclude_patterns.len(),
			self.mapper.content_descriptor()
		);
		Ok(scope)
	}

	/// Names in `dir` except the content descriptor, sorted
	fn sibling_names(&self, dir: &Path) -> SyncResult<Vec<String>> {
		let mut names = Vec::new();
		for entry in fs::read_dir(dir).map_err(|e| SyncError::fs(dir, e))? {
			let entry = entry.map_err(|e| SyncError::fs(dir, e))?;
			let name = entry.file_name().to_string_lossy().into_owned();
			if name != self.mapper.content_descriptor() {
				names.push(name);
			}
		}
		names.sort();
		Ok(names)
	}
}


// vim: ts=4
