//! Merging remote and local change streams into one report

use std::collections::HashSet;

use crate::types::{ChangeAction, ChangeEntry};

/// Merges change streams and renders summaries
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeReconciler;

impl ChangeReconciler {
	pub fn new() -> Self {
		ChangeReconciler
	}

	/// Remote entries in reported order, then local entries with an unseen path
	///
	/// Remote entries win on duplicate paths: they describe what the remote
	/// side actually did. Local entries still surface changes the remote side
	/// never reports, such as directory creation.
	pub fn reconcile(
		&self,
		remote: Vec<ChangeEntry>,
		local: Vec<ChangeEntry>,
	) -> Vec<ChangeEntry> {
		let mut seen: HashSet<String> = remote.iter().map(|e| e.path.clone()).collect();
		let mut merged = remote;
		for entry in local {
			if seen.insert(entry.path.clone()) {
				merged.push(entry);
			}
		}
		merged
	}

	/// Drop entries whose action is [`ChangeAction::NoChange`]
	pub fn filter_no_change(&self, entries: Vec<ChangeEntry>) -> Vec<ChangeEntry> {
		entries.into_iter().filter(|e| e.action.is_change()).collect()
	}

	/// `Updated: N | Added: N | Removed: N | Error: N`, zero counts omitted
	pub fn summarize(&self, entries: &[ChangeEntry]) -> String {
		let count = |action| entries.iter().filter(|e| e.action == action).count();
		let categories = [
			("Updated", count(ChangeAction::Updated)),
			("Added", count(ChangeAction::Added)),
			("Removed", count(ChangeAction::Deleted)),
			("Error", count(ChangeAction::Error)),
		];
		categories
			.iter()
			.filter(|(_, n)| *n > 0)
			.map(|(label, n)| format!("{}: {}", label, n))
			.collect::<Vec<_>>()
			.join(" | ")
	}
}


// vim: ts=4
