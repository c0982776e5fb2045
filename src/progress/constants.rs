//! Progress labels and fractions reported by the orchestrator
//!
//! Host UIs display these strings verbatim, so they are kept stable.

/// Pull: building the scope descriptor
pub const PULL_PREPARING: (&str, f64) = ("Preparing export operation...", 0.1);

/// Pull: remote export in flight
pub const PULL_EXPORTING: (&str, f64) = ("Exporting content from AEM...", 0.2);

/// Pull: syncing the staged payload into the working copy
pub const PULL_PROCESSING: (&str, f64) = ("Processing exported content...", 0.7);

/// Push: building the scope descriptor
pub const PUSH_PREPARING: (&str, f64) = ("Preparing import operation...", 0.1);

/// Push: copying the working copy into the staging payload
pub const PUSH_STAGING: (&str, f64) = ("Preparing content for import...", 0.3);

/// Push: remote import in flight
pub const PUSH_IMPORTING: (&str, f64) = ("Importing content to AEM...", 0.5);

/// Both directions: releasing the staging area
pub const CLEANING_UP: (&str, f64) = ("Cleaning up...", 0.9);

/// Both directions: finished
pub const DONE: (&str, f64) = ("", 1.0);

// vim: ts=4
