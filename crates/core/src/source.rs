//! Where an export comes from, and the provenance written alongside it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sortable timestamp format used in provenance records.
pub const SORTABLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Identity and comment of a named, server-stored change set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelvesetInfo {
    pub name: String,
    pub owner: String,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub comment: String,
}

/// Workspace identity used to label exports of local edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceInfo {
    pub name: String,
    pub computer: String,
}

impl WorkspaceInfo {
    /// `name@computer`, the label used in provenance and generated file names.
    pub fn label(&self) -> String {
        format!("{}@{}", self.name, self.computer)
    }
}

/// The origin of the change list being exported.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportSource {
    Shelveset(ShelvesetInfo),
    Pending(WorkspaceInfo),
    LocalFiles(WorkspaceInfo),
}

impl ExportSource {
    /// Label identifying the export mode.
    pub fn mode_label(&self) -> &'static str {
        match self {
            ExportSource::Shelveset(_) => "shelveset",
            ExportSource::Pending(_) => "pending",
            ExportSource::LocalFiles(_) => "localfiles",
        }
    }

    /// Timestamp for export-level entries: the shelveset's creation time, else `now`.
    pub fn reference_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            ExportSource::Shelveset(info) => info.created,
            _ => now,
        }
    }

    /// `key=value` provenance lines, preceded by the tool marker.
    pub fn provenance_lines(&self, tool: &str) -> Vec<String> {
        let mut lines = vec![format!("Tool={}", tool)];
        match self {
            ExportSource::Shelveset(info) => {
                lines.push(format!("Shelveset={}", info.name));
                lines.push(format!("Owner={}", info.owner));
                lines.push(format!(
                    "Date={}",
                    info.created.format(SORTABLE_TIME_FORMAT)
                ));
                lines.push(format!("Comment={}", info.comment));
            }
            ExportSource::Pending(ws) | ExportSource::LocalFiles(ws) => {
                lines.push(format!("Mode={}", self.mode_label()));
                lines.push(format!("Workspace={}", ws.label()));
            }
        }
        lines
    }
}
