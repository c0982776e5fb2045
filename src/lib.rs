//! # vltsync - Content Package Sync for Mirrored Repository Trees
//!
//! vltsync keeps a local working copy laid out below a `jcr_root` directory in
//! sync with a hierarchical content repository. Every operation stages a
//! content package (`META-INF/vault/filter.xml` plus a `jcr_root` payload),
//! hands it to a remote transfer delegate and reconciles what changed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vltsync::{Config, ConnectionInfo, FsRepository, NoProgress, Orchestrator, PathMapper};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let remote = Arc::new(FsRepository::new("./repo", PathMapper::from_config(&config)));
//!     let orchestrator = Orchestrator::from_config(&config, remote);
//!     let connection = ConnectionInfo::new("http://localhost:4502", "admin", "admin");
//!
//!     let result = orchestrator
//!         .pull(&connection, "./ui.content/jcr_root/content/site".as_ref(), Arc::new(NoProgress))
//!         .await;
//!     println!("{}", result.message);
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod package;
pub mod path_mapper;
pub mod progress;
pub mod reconcile;
pub mod remote;
pub mod scope;
pub mod tree_sync;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConnectionProvider, RemoteTarget};
pub use error::{SyncError, SyncResult};
pub use orchestrator::Orchestrator;
pub use package::{StagingArea, StagingManager};
pub use path_mapper::PathMapper;
pub use progress::{LogProgress, NoProgress, ProgressSink};
pub use reconcile::ChangeReconciler;
pub use remote::{ChangeCollector, FsRepository, RemoteTransfer, TransferContext, TransferListener};
pub use scope::{FilterScopeBuilder, ScopeDescriptor};
pub use tree_sync::DirectorySync;
pub use types::{ChangeAction, ChangeEntry, ConnectionInfo, OperationResult, SyncDirection};

// vim: ts=4
