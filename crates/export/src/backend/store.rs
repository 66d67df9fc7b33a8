//! Directory-backed backend: a snapshot of server state on local disk.
//!
//! ```text
//! <root>/store.yaml                      workspace, changesets, pending, shelvesets
//! <root>/shelved/<shelveset>/<path>      shelved content by server-relative path
//! <root>/versions/C<rev>/<path>          committed content by server-relative path
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use shelvepack_core::layout::normalize_relative;
use shelvepack_core::{server_relative, PendingChange, ShelvesetInfo, WorkspaceInfo};

use super::ChangeBackend;
use crate::error::{ExportError, Result};

const STORE_FILE: &str = "store.yaml";
const SHELVED_DIR: &str = "shelved";
const VERSIONS_DIR: &str = "versions";

/// Contents of `store.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub workspace: WorkspaceInfo,
    /// Mapped working-folder roots; relative entries resolve against the store.
    #[serde(default)]
    pub working_folders: Vec<PathBuf>,
    /// Changeset number → creation time.
    #[serde(default)]
    pub changesets: BTreeMap<u32, DateTime<Utc>>,
    #[serde(default)]
    pub pending: Vec<PendingChange>,
    #[serde(default)]
    pub shelvesets: Vec<StoredShelveset>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredShelveset {
    #[serde(flatten)]
    pub info: ShelvesetInfo,
    #[serde(default)]
    pub changes: Vec<PendingChange>,
}

pub struct StoreBackend {
    root: PathBuf,
    document: StoreDocument,
    /// Shelveset whose content answers `download_shelved`.
    active_shelveset: Option<String>,
}

impl StoreBackend {
    /// Open the store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(STORE_FILE);
        let contents = fs::read_to_string(&path).map_err(|e| {
            ExportError::Store(format!("cannot read {}: {}", path.display(), e))
        })?;
        let document: StoreDocument = serde_yaml::from_str(&contents)?;
        info!(
            store = %root.display(),
            workspace = %document.workspace.label(),
            pending = document.pending.len(),
            shelvesets = document.shelvesets.len(),
            "opened change store"
        );
        Ok(Self::from_document(root, document))
    }

    pub fn from_document(root: &Path, document: StoreDocument) -> Self {
        Self {
            root: root.to_path_buf(),
            document,
            active_shelveset: None,
        }
    }

    pub fn workspace(&self) -> &WorkspaceInfo {
        &self.document.workspace
    }

    /// Pending changes with relative working-copy paths resolved against the store.
    pub fn pending_changes(&self) -> Vec<PendingChange> {
        self.document
            .pending
            .iter()
            .cloned()
            .map(|mut change| {
                let local = Path::new(&change.local_or_server_path);
                if !change.is_server_sourced() && local.is_relative() {
                    change.local_or_server_path =
                        self.root.join(local).to_string_lossy().into_owned();
                }
                change
            })
            .collect()
    }

    /// Working-folder roots with relative entries resolved against the store.
    pub fn working_folders(&self) -> Vec<PathBuf> {
        self.document
            .working_folders
            .iter()
            .map(|p| if p.is_absolute() { p.clone() } else { self.root.join(p) })
            .collect()
    }

    /// Look up a shelveset by name and owner (owner compared case-insensitively).
    pub fn find_shelveset(&self, name: &str, owner: &str) -> Result<&StoredShelveset> {
        self.document
            .shelvesets
            .iter()
            .find(|s| s.info.name == name && s.info.owner.eq_ignore_ascii_case(owner))
            .ok_or_else(|| {
                ExportError::Store(format!("could not find shelveset \"{};{}\"", name, owner))
            })
    }

    /// Serve shelved content from `name` for subsequent downloads.
    pub fn activate_shelveset(&mut self, name: &str) {
        debug!(shelveset = %name, "shelveset activated");
        self.active_shelveset = Some(name.to_string());
    }

    fn content_path(&self, dir: &[&str], server_path: &str) -> Result<PathBuf> {
        let relative = normalize_relative(server_relative(server_path)?);
        let mut path = self.root.clone();
        for part in dir {
            path.push(part);
        }
        Ok(path.join(relative))
    }

    fn copy(&self, src: &Path, dest: &Path, item: &str) -> Result<()> {
        fs::copy(src, dest).map_err(|source| ExportError::Fetch {
            item: item.to_string(),
            source,
        })?;
        Ok(())
    }
}

impl ChangeBackend for StoreBackend {
    fn download_shelved(&self, change: &PendingChange, dest: &Path) -> Result<()> {
        let shelveset = self.active_shelveset.as_deref().ok_or_else(|| {
            ExportError::Backend(format!(
                "no shelveset selected to serve {}",
                change.server_path
            ))
        })?;
        let src = self.content_path(&[SHELVED_DIR, shelveset], &change.server_path)?;
        self.copy(&src, dest, &change.server_path)
    }

    fn download_base(&self, change: &PendingChange, dest: &Path) -> Result<()> {
        let version = change.base_version().ok_or_else(|| {
            ExportError::Backend(format!("{} has no base version", change.server_path))
        })?;
        let label = format!("C{}", version);
        let server_path = change.base_server_path();
        let src = self.content_path(&[VERSIONS_DIR, label.as_str()], server_path)?;
        self.copy(&src, dest, &format!("{};{}", server_path, label))
    }

    fn changeset_timestamp(&self, version: u32) -> Result<DateTime<Utc>> {
        self.document
            .changesets
            .get(&version)
            .copied()
            .ok_or_else(|| ExportError::Backend(format!("changeset {} not found", version)))
    }
}
