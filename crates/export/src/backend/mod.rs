//! Version-control backend seam.
//!
//! The exporter only needs three things from a backend: the shelved/server
//! copy of a change, the base-version copy, and the time a changeset was
//! created. Everything else (workspace discovery, authentication, queries)
//! stays on the caller's side.

mod store;

use std::path::Path;

use chrono::{DateTime, Utc};
use shelvepack_core::PendingChange;

use crate::error::Result;

pub use store::{StoreBackend, StoreDocument, StoredShelveset};

/// Synchronous content and metadata source for pending changes.
///
/// Any error is fatal to the run.
pub trait ChangeBackend {
    /// Write the shelved (server-side) content of `change` to `dest`.
    fn download_shelved(&self, change: &PendingChange, dest: &Path) -> Result<()>;

    /// Write the content of `change`'s base version to `dest`.
    fn download_base(&self, change: &PendingChange, dest: &Path) -> Result<()>;

    /// Creation time of the changeset that produced `version`.
    fn changeset_timestamp(&self, version: u32) -> Result<DateTime<Utc>>;
}
