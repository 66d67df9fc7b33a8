//! Pending change records as reported by the version-control backend.
//!
//! A [`PendingChange`] is read-only to the exporter: it describes one item,
//! what happened to it, and where its "before" and "after" content lives.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Root marker every repository path starts with.
pub const SERVER_ROOT: &str = "$/";

/// Whether `path` denotes a repository location rather than a working-copy path.
pub fn is_repository_path(path: &str) -> bool {
    path.starts_with('$')
}

/// Strip the repository root from a server path: `$/proj/a.cs` → `proj/a.cs`.
pub fn server_relative(server_path: &str) -> Result<&str> {
    server_path
        .strip_prefix(SERVER_ROOT)
        .filter(|rest| !rest.is_empty())
        .ok_or_else(|| CoreError::ServerPath(server_path.to_string()))
}

// ── Item / change classification ──────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    File,
    Folder,
}

/// A single flag of a change classification. Backends report combinations,
/// e.g. an edited file that was also renamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Add,
    Edit,
    Rename,
    Delete,
    Undelete,
    Branch,
    Merge,
    Encoding,
    Lock,
    Property,
    Rollback,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Add => write!(f, "add"),
            ChangeType::Edit => write!(f, "edit"),
            ChangeType::Rename => write!(f, "rename"),
            ChangeType::Delete => write!(f, "delete"),
            ChangeType::Undelete => write!(f, "undelete"),
            ChangeType::Branch => write!(f, "branch"),
            ChangeType::Merge => write!(f, "merge"),
            ChangeType::Encoding => write!(f, "encoding"),
            ChangeType::Lock => write!(f, "lock"),
            ChangeType::Property => write!(f, "property"),
            ChangeType::Rollback => write!(f, "rollback"),
        }
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(ChangeType::Add),
            "edit" => Ok(ChangeType::Edit),
            "rename" => Ok(ChangeType::Rename),
            "delete" => Ok(ChangeType::Delete),
            "undelete" => Ok(ChangeType::Undelete),
            "branch" => Ok(ChangeType::Branch),
            "merge" => Ok(ChangeType::Merge),
            "encoding" => Ok(ChangeType::Encoding),
            "lock" => Ok(ChangeType::Lock),
            "property" => Ok(ChangeType::Property),
            "rollback" => Ok(ChangeType::Rollback),
            other => Err(format!("unknown change type: '{}'", other)),
        }
    }
}

/// Human-readable change classification, rendered as `edit, rename`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChangeKind(Vec<ChangeType>);

impl ChangeKind {
    pub fn new(types: impl IntoIterator<Item = ChangeType>) -> Self {
        let mut kinds = Vec::new();
        for t in types {
            if !kinds.contains(&t) {
                kinds.push(t);
            }
        }
        Self(kinds)
    }

    pub fn contains(&self, t: ChangeType) -> bool {
        self.0.contains(&t)
    }

    pub fn types(&self) -> &[ChangeType] {
        &self.0
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", labels.join(", "))
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let types = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(str::parse)
            .collect::<std::result::Result<Vec<ChangeType>, _>>()?;
        Ok(Self::new(types))
    }
}

impl TryFrom<String> for ChangeKind {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ChangeKind> for String {
    fn from(kind: ChangeKind) -> Self {
        kind.to_string()
    }
}

// ── Pending change ────────────────────────────────────────────

/// One pending edit: an item, its classification, and where to find its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Canonical repository path, e.g. `$/proj/src/Foo.cs`.
    pub server_path: String,
    #[serde(default = "default_item_kind")]
    pub item_kind: ItemKind,
    #[serde(rename = "change")]
    pub change_kind: ChangeKind,
    /// Revision the edit is based on; `0` means there is no prior version.
    #[serde(default)]
    pub base_version: u32,
    /// Source repository path when the change is a rename.
    #[serde(default)]
    pub renamed_from: Option<String>,
    /// Working-copy path, or a repository path for shelved/server-only changes.
    pub local_or_server_path: String,
    pub creation_date: DateTime<Utc>,
}

fn default_item_kind() -> ItemKind {
    ItemKind::File
}

impl PendingChange {
    pub fn is_file(&self) -> bool {
        self.item_kind == ItemKind::File
    }

    pub fn is_delete(&self) -> bool {
        self.change_kind.contains(ChangeType::Delete)
    }

    pub fn is_rename(&self) -> bool {
        self.change_kind.contains(ChangeType::Rename)
    }

    /// The base revision, or `None` for the "pure add" sentinel.
    pub fn base_version(&self) -> Option<u32> {
        (self.base_version != 0).then_some(self.base_version)
    }

    /// Whether current content must be requested from the backend instead of
    /// copied from the working folder.
    pub fn is_server_sourced(&self) -> bool {
        is_repository_path(&self.local_or_server_path)
    }

    /// Repository path of the base item: the rename source, else the item itself.
    pub fn base_server_path(&self) -> &str {
        match (&self.renamed_from, self.is_rename()) {
            (Some(source), true) => source,
            _ => &self.server_path,
        }
    }

    pub fn based_on_label(&self) -> String {
        self.base_version()
            .map(|v| format!("C{}", v))
            .unwrap_or_default()
    }

    pub fn renamed_from_label(&self) -> &str {
        if self.is_rename() {
            self.renamed_from.as_deref().unwrap_or("")
        } else {
            ""
        }
    }

    /// One pipe-delimited line of the export manifest (no trailing newline).
    pub fn manifest_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.server_path,
            self.change_kind,
            self.based_on_label(),
            self.renamed_from_label()
        )
    }
}
