/// Orchestrator scenarios - full pull and push operations against real directories
///
/// The remote side is either a stub delegate that records what it was handed
/// or an `FsRepository` backed by a temporary directory.
///
/// Tests verify:
/// 1. Single descriptor pulls and pushes stay within the node
/// 2. Failures become `Error: ...` results and staging is always released
/// 3. Remote and local entries are merged, remote entries first
/// 4. Per-entry remote errors do not fail the operation
/// 5. Progress labels arrive in a stable order
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use vltsync::{
	ChangeAction, Config, ConnectionInfo, FsRepository, LogProgress, NoProgress, Orchestrator,
	PathMapper, ProgressSink, RemoteTransfer, SyncError, SyncResult, TransferContext,
};

/// Helper to create a file, including its parent directories
fn create_file(path: &Path, content: &str) {
	fs::create_dir_all(path.parent().unwrap()).unwrap();
	fs::write(path, content).unwrap();
}

fn connection() -> ConnectionInfo {
	ConnectionInfo::new("http://localhost:4502", "admin", "admin")
}

fn orchestrator(stage: &Path, remote: Arc<dyn RemoteTransfer>) -> Orchestrator {
	let config = Config { staging_dir: Some(stage.to_path_buf()), ..Config::default() };
	Orchestrator::from_config(&config, remote)
}

fn is_empty_dir(dir: &Path) -> bool {
	fs::read_dir(dir).map(|mut entries| entries.next().is_none()).unwrap_or(true)
}

// ===================================================================
// TEST DOUBLES
// ===================================================================

/// What the delegate was handed for one call
#[derive(Debug, Clone)]
struct Call {
	remote_address: String,
	staging_path: PathBuf,
	filter_xml: String,
	payload_files: Vec<String>,
}

/// Delegate that writes canned files and reports canned events
#[derive(Default)]
struct StubRemote {
	files: Vec<(&'static str, &'static str)>,
	messages: Vec<(&'static str, &'static str)>,
	errors: Vec<(&'static str, &'static str)>,
	failure: Option<&'static str>,
	calls: Mutex<Vec<Call>>,
}

impl StubRemote {
	fn calls(&self) -> Vec<Call> {
		self.calls.lock().unwrap().clone()
	}

	fn transfer(&self, ctx: &TransferContext<'_>) -> SyncResult<()> {
		let payload = ctx.staging_path.join("jcr_root");
		let mut payload_files = Vec::new();
		collect_files(&payload, &payload, &mut payload_files);
		self.calls.lock().unwrap().push(Call {
			remote_address: ctx.remote_address.to_string(),
			staging_path: ctx.staging_path.to_path_buf(),
			filter_xml: fs::read_to_string(ctx.staging_path.join("META-INF/vault/filter.xml"))
				.unwrap_or_default(),
			payload_files,
		});

		if let Some(message) = self.failure {
			return Err(SyncError::remote(message));
		}
		for (address, content) in &self.files {
			create_file(&payload.join(address.trim_start_matches('/')), content);
		}
		for (code, path) in &self.messages {
			ctx.listener.on_message(code, path);
		}
		for (path, message) in &self.errors {
			ctx.listener.on_error(path, message);
		}
		Ok(())
	}
}

#[async_trait]
impl RemoteTransfer for StubRemote {
	async fn export(&self, ctx: &TransferContext<'_>) -> SyncResult<()> {
		self.transfer(ctx)
	}

	async fn import(&self, ctx: &TransferContext<'_>) -> SyncResult<()> {
		self.transfer(ctx)
	}
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
	if let Ok(entries) = fs::read_dir(dir) {
		for entry in entries {
			let path = entry.unwrap().path();
			if path.is_dir() {
				collect_files(root, &path, out);
			} else {
				out.push(format!("/{}", path.strip_prefix(root).unwrap().to_string_lossy()));
			}
		}
	}
	out.sort();
}

/// Progress sink that records every update
#[derive(Default)]
struct RecordingProgress {
	texts: Mutex<Vec<String>>,
	fractions: Mutex<Vec<f64>>,
}

impl ProgressSink for RecordingProgress {
	fn set_text(&self, text: &str) {
		self.texts.lock().unwrap().push(text.to_string());
	}

	fn set_fraction(&self, fraction: f64) {
		self.fractions.lock().unwrap().push(fraction);
	}
}

/// Working copy with `jcr_root/content/en/{.content.xml, nested/, clientlibs/}`
fn working_copy(root: &Path) -> PathBuf {
	let en = root.join("ui.content/jcr_root/content/en");
	create_file(&en.join(".content.xml"), "<jcr:root title=\"old\"/>");
	create_file(&en.join("nested/.content.xml"), "<nested/>");
	create_file(&en.join("clientlibs/js/app.js"), "app();");
	en
}

// ===================================================================
// PULL
// ===================================================================

#[tokio::test]
async fn test_single_descriptor_pull() {
	let tmp = TempDir::new().unwrap();
	let stage = tmp.path().join("stage");
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote {
		files: vec![("/content/en/.content.xml", "<jcr:root title=\"new\"/>")],
		messages: vec![("A", "/content/en")],
		..StubRemote::default()
	});

	let descriptor = en.join(".content.xml");
	let result = orchestrator(&stage, remote.clone())
		.pull(&connection(), &descriptor, Arc::new(NoProgress))
		.await;

	assert!(result.success, "{}", result.message);
	assert_eq!(
		result.message,
		"Successfully exported content to /content/en/.content.xml\nUpdated: 1 | Added: 1"
	);
	assert_eq!(result.entries.len(), 2);
	assert_eq!(result.entries[0].action, ChangeAction::Added);
	assert_eq!(result.entries[0].path, "/content/en");
	assert_eq!(result.entries[1].action, ChangeAction::Updated);
	assert_eq!(result.entries[1].path, descriptor.to_string_lossy());
	assert_eq!(fs::read_to_string(&descriptor).unwrap(), "<jcr:root title=\"new\"/>");
	// Children of the node were not touched
	assert!(en.join("nested/.content.xml").exists());
	assert!(en.join("clientlibs/js/app.js").exists());

	let calls = remote.calls();
	assert_eq!(calls.len(), 1);
	assert_eq!(calls[0].remote_address, "/content/en/.content.xml");
	assert!(calls[0].filter_xml.contains("<filter root=\"/content/en\">"));
	assert!(calls[0].filter_xml.contains("<exclude pattern=\"/content/en/clientlibs(/.*)?\"/>"));
	assert!(calls[0].filter_xml.contains("<exclude pattern=\"/content/en/nested(/.*)?\"/>"));
	assert!(!calls[0].staging_path.exists());
	assert!(is_empty_dir(&stage));
}

#[tokio::test]
async fn test_pull_with_nothing_exported() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote::default());

	let result = orchestrator(&tmp.path().join("stage"), remote)
		.pull(&connection(), &en, Arc::new(NoProgress))
		.await;

	assert!(result.success);
	assert_eq!(result.message, "Successfully exported content to /content/en\nFiles were not changed.");
	assert!(result.entries.is_empty());
	assert!(en.join("clientlibs/js/app.js").exists());
}

#[tokio::test]
async fn test_pull_keeps_remote_entries() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote {
		files: vec![
			("/content/en/.content.xml", "<jcr:root title=\"old\"/>"),
			("/content/en/nested/.content.xml", "<nested/>"),
			("/content/en/clientlibs/js/app.js", "app();"),
		],
		messages: vec![("A", "/content/en/page"), ("-", "/content/en")],
		..StubRemote::default()
	});

	let result = orchestrator(&tmp.path().join("stage"), remote)
		.pull(&connection(), &en, Arc::new(NoProgress))
		.await;

	// Local content already matches, only the export reported something
	assert!(result.success, "{}", result.message);
	assert_eq!(result.message, "Successfully exported content to /content/en\nAdded: 1");
	assert_eq!(result.entries.len(), 1);
	assert_eq!(result.entries[0].action, ChangeAction::Added);
	assert_eq!(result.entries[0].path, "/content/en/page");
}

#[tokio::test]
async fn test_invalid_path_is_rejected_before_staging() {
	let tmp = TempDir::new().unwrap();
	let stage = tmp.path().join("stage");
	let outside = tmp.path().join("project/src/file.txt");
	create_file(&outside, "x");
	let remote = Arc::new(StubRemote::default());
	let progress = Arc::new(RecordingProgress::default());

	let result = orchestrator(&stage, remote.clone()).pull(&connection(), &outside, progress.clone()).await;

	assert!(!result.success);
	assert_eq!(result.message, "Invalid JCR path.");
	assert!(result.entries.is_empty());
	assert!(remote.calls().is_empty());
	assert!(progress.texts.lock().unwrap().is_empty());
	assert!(!stage.exists());
}

#[tokio::test]
async fn test_remote_failure_cleans_up() {
	let tmp = TempDir::new().unwrap();
	let stage = tmp.path().join("stage");
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote { failure: Some("connection refused"), ..StubRemote::default() });

	for push in [false, true].iter() {
		let orchestrator = orchestrator(&stage, remote.clone());
		let result = if *push {
			orchestrator.push(&connection(), &en, Arc::new(NoProgress)).await
		} else {
			orchestrator.pull(&connection(), &en, Arc::new(NoProgress)).await
		};
		assert!(!result.success);
		assert_eq!(result.message, "Error: connection refused");
		assert!(result.entries.is_empty());
		assert!(is_empty_dir(&stage));
	}
	// Local content survives a failed pull
	assert!(en.join(".content.xml").exists());
}

#[tokio::test]
async fn test_filesystem_failure_cleans_up() {
	let tmp = TempDir::new().unwrap();
	let stage = tmp.path().join("stage");
	// `content` is a file, so the working copy cannot be created below it
	create_file(&tmp.path().join("ui.content/jcr_root/content"), "not a directory");
	let en = tmp.path().join("ui.content/jcr_root/content/en");
	let remote = Arc::new(StubRemote {
		files: vec![("/content/en/.content.xml", "<en/>")],
		messages: vec![("A", "/content/en")],
		..StubRemote::default()
	});

	let result = orchestrator(&stage, remote.clone())
		.pull(&connection(), &en, Arc::new(NoProgress))
		.await;

	assert!(!result.success);
	assert!(result.message.starts_with("Error: "), "{}", result.message);
	assert!(result.entries.is_empty());
	assert_eq!(remote.calls().len(), 1);
	assert!(is_empty_dir(&stage));
}

#[tokio::test]
async fn test_cancelled_operation_cleans_up() {
	let tmp = TempDir::new().unwrap();
	let stage = tmp.path().join("stage");
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote {
		files: vec![("/content/en/.content.xml", "<jcr:root title=\"new\"/>")],
		..StubRemote::default()
	});
	let cancel = Arc::new(AtomicBool::new(true));

	for push in [false, true].iter() {
		let orchestrator = orchestrator(&stage, remote.clone());
		let progress = Arc::new(LogProgress::new().with_cancellation(cancel.clone()));
		let result = if *push {
			orchestrator.push(&connection(), &en, progress).await
		} else {
			orchestrator.pull(&connection(), &en, progress).await
		};
		assert!(!result.success);
		assert_eq!(result.message, "Error: Operation aborted by user");
		assert!(result.entries.is_empty());
		assert!(is_empty_dir(&stage));
	}
	// The pull stopped before touching local content; the push never reached the remote
	assert_eq!(fs::read_to_string(en.join(".content.xml")).unwrap(), "<jcr:root title=\"old\"/>");
	assert_eq!(remote.calls().len(), 1);
}

#[tokio::test]
async fn test_pull_progress_labels() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let progress = Arc::new(RecordingProgress::default());

	orchestrator(&tmp.path().join("stage"), Arc::new(StubRemote::default()))
		.pull(&connection(), &en, progress.clone())
		.await;

	assert_eq!(
		*progress.texts.lock().unwrap(),
		vec![
			"Preparing export operation...",
			"Exporting content from AEM...",
			"Processing exported content...",
			"Cleaning up...",
			"",
		]
	);
	assert_eq!(*progress.fractions.lock().unwrap(), vec![0.1, 0.2, 0.7, 0.9, 1.0]);
}

// ===================================================================
// PUSH
// ===================================================================

#[tokio::test]
async fn test_push_stages_single_file() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote { messages: vec![("U", "/content/en")], ..StubRemote::default() });

	let result = orchestrator(&tmp.path().join("stage"), remote.clone())
		.push(&connection(), &en.join(".content.xml"), Arc::new(NoProgress))
		.await;

	assert!(result.success);
	assert_eq!(
		result.message,
		"Successfully imported content from /content/en/.content.xml.\nUpdated: 1 | Added: 1"
	);
	assert_eq!(result.entries[0].path, "/content/en");
	assert_eq!(result.entries[1].action, ChangeAction::Added);
	let calls = remote.calls();
	assert_eq!(calls[0].payload_files, vec!["/content/en/.content.xml".to_string()]);
}

#[tokio::test]
async fn test_push_per_entry_errors_are_not_fatal() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let remote = Arc::new(StubRemote {
		messages: vec![("U", "/content/en"), ("-", "/content/en/nested")],
		errors: vec![("/content/en/clientlibs", "access denied")],
		..StubRemote::default()
	});

	let result = orchestrator(&tmp.path().join("stage"), remote)
		.push(&connection(), &en, Arc::new(NoProgress))
		.await;

	// Remote entries come first, then the 7 entries created while staging
	assert!(result.success);
	assert_eq!(
		result.message,
		"Successfully imported content from /content/en.\nUpdated: 1 | Added: 7 | Error: 1"
	);
	assert_eq!(result.entries.len(), 9);
	assert_eq!(result.entries[1].action, ChangeAction::Error);
	assert_eq!(result.entries[1].message.as_deref(), Some("access denied"));
	assert!(result.entries[2..].iter().all(|e| e.action == ChangeAction::Added));
}

#[tokio::test]
async fn test_push_progress_labels() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let progress = Arc::new(RecordingProgress::default());

	let result = orchestrator(&tmp.path().join("stage"), Arc::new(StubRemote::default()))
		.push(&connection(), &en, progress.clone())
		.await;

	assert_eq!(result.message, "Successfully imported content from /content/en.\nAdded: 7");
	assert_eq!(
		*progress.texts.lock().unwrap(),
		vec![
			"Preparing import operation...",
			"Preparing content for import...",
			"Importing content to AEM...",
			"Cleaning up...",
			"",
		]
	);
}

// ===================================================================
// DIRECTORY-BACKED REPOSITORY
// ===================================================================

/// Repository with `/content/en` holding a node, a page and a child node
fn repository(root: &Path) -> Arc<FsRepository> {
	create_file(&root.join("content/en/.content.xml"), "<jcr:root title=\"repo\"/>");
	create_file(&root.join("content/en/page.html"), "<p>repo</p>");
	create_file(&root.join("content/en/nested/.content.xml"), "<nested/>");
	Arc::new(FsRepository::new(root, PathMapper::default()))
}

#[tokio::test]
async fn test_repository_pull_directory() {
	let tmp = TempDir::new().unwrap();
	let repo = repository(&tmp.path().join("repo"));
	let en = tmp.path().join("ui.content/jcr_root/content/en");
	create_file(&en.join("page.html"), "<p>local</p>");
	create_file(&en.join("stale.html"), "stale");
	create_file(&en.join("nested/.content.xml"), "<nested/>");
	let orchestrator = orchestrator(&tmp.path().join("stage"), repo);

	let result = orchestrator.pull(&connection(), &en, Arc::new(NoProgress)).await;
	assert!(result.success, "{}", result.message);
	// 3 exported nodes, plus the local page update, descriptor and stale file
	assert_eq!(
		result.message,
		"Successfully exported content to /content/en\nUpdated: 1 | Added: 4 | Removed: 1"
	);
	assert!(!en.join("stale.html").exists());
	assert_eq!(fs::read_to_string(en.join("page.html")).unwrap(), "<p>repo</p>");

	// Nothing changes locally the second time, only the export is reported
	let again = orchestrator.pull(&connection(), &en, Arc::new(NoProgress)).await;
	assert_eq!(again.message, "Successfully exported content to /content/en\nAdded: 3");
	let mut paths: Vec<&str> = again.entries.iter().map(|e| e.path.as_str()).collect();
	paths.sort();
	assert_eq!(paths, vec!["/content/en", "/content/en/nested", "/content/en/page.html"]);
}

#[tokio::test]
async fn test_repository_push_descriptor_keeps_children() {
	let tmp = TempDir::new().unwrap();
	let repo_root = tmp.path().join("repo");
	let repo = repository(&repo_root);
	let en = tmp.path().join("ui.content/jcr_root/content/en");
	create_file(&en.join(".content.xml"), "<jcr:root title=\"local\"/>");
	create_file(&en.join("page.html"), "<p>local</p>");
	create_file(&en.join("nested/.content.xml"), "<nested changed/>");

	let result = orchestrator(&tmp.path().join("stage"), repo)
		.push(&connection(), &en.join(".content.xml"), Arc::new(NoProgress))
		.await;

	assert!(result.success, "{}", result.message);
	assert_eq!(result.entries.len(), 2);
	assert_eq!(result.entries[0].action, ChangeAction::Updated);
	assert_eq!(result.entries[0].path, "/content/en");
	assert_eq!(result.entries[1].action, ChangeAction::Added);
	assert_eq!(
		fs::read_to_string(repo_root.join("content/en/.content.xml")).unwrap(),
		"<jcr:root title=\"local\"/>"
	);
	// Siblings are outside the scope: neither updated nor deleted
	assert_eq!(fs::read_to_string(repo_root.join("content/en/page.html")).unwrap(), "<p>repo</p>");
	assert_eq!(
		fs::read_to_string(repo_root.join("content/en/nested/.content.xml")).unwrap(),
		"<nested/>"
	);
}

#[tokio::test]
async fn test_spawned_operations_run_concurrently() {
	let tmp = TempDir::new().unwrap();
	let stage = tmp.path().join("stage");
	let repo = repository(&tmp.path().join("repo"));
	let orchestrator = orchestrator(&stage, repo);
	let first = tmp.path().join("a/jcr_root/content/en");
	let second = tmp.path().join("b/jcr_root/content/en");

	let handles = vec![
		orchestrator.spawn_pull(connection(), first.clone(), Arc::new(NoProgress)),
		orchestrator.spawn_pull(connection(), second.clone(), Arc::new(NoProgress)),
	];
	for handle in handles {
		let result = handle.await.unwrap();
		assert!(result.success, "{}", result.message);
	}
	assert!(first.join("page.html").exists());
	assert!(second.join("nested/.content.xml").exists());
	assert!(is_empty_dir(&stage));
}

#[tokio::test]
async fn test_repository_missing() {
	let tmp = TempDir::new().unwrap();
	let en = working_copy(tmp.path());
	let remote = Arc::new(FsRepository::new(tmp.path().join("no-repo"), PathMapper::default()));

	let result = orchestrator(&tmp.path().join("stage"), remote)
		.pull(&connection(), &en, Arc::new(NoProgress))
		.await;
	assert!(!result.success);
	assert!(result.message.starts_with("Error: Repository not found"));
}

// vim: ts=4
