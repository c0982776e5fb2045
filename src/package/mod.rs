//! Content package layout on disk
//!
//! A content package combines a payload mirror with a filter descriptor:
//!
//! ```text
//! {root}/META-INF/vault/filter.xml
//! {root}/jcr_root/{address...}
//! ```

pub mod filter_xml;
pub mod staging;

pub use staging::{StagingArea, StagingManager};

/// Directory holding package metadata, relative to the package root
pub const METADATA_DIR: &str = "META-INF/vault";

/// Scope descriptor file name inside [`METADATA_DIR`]
pub const FILTER_FILE: &str = "filter.xml";

// vim: ts=4
