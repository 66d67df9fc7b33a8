//! Output path resolution and pre-flight checks.

use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use chrono::NaiveDateTime;

use shelvepack_core::WorkspaceInfo;

use crate::error::{ExportError, Result};

pub const ARCHIVE_EXTENSION: &str = ".tar.zst";

/// Characters that may not appear in a generated file name.
const INVALID_FILE_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// What [`check_output_path`] found at the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStatus {
    New,
    /// A writable file is already there; the caller must confirm overwriting.
    Exists,
}

/// Turn the user's output argument into a concrete archive path.
///
/// A missing argument, or one naming a directory (trailing separator), gets a
/// generated file name from `fallback`. The archive extension is appended
/// unless already present in any letter case.
pub fn resolve_output_path(arg: Option<&str>, fallback: impl FnOnce() -> String) -> PathBuf {
    let mut path = match arg {
        Some(dir) if !ends_with_separator(dir) => dir.to_string(),
        other => format!("{}{}", other.unwrap_or(""), sanitize_file_name(&fallback())),
    };
    if !path.to_lowercase().ends_with(ARCHIVE_EXTENSION) {
        path.push_str(ARCHIVE_EXTENSION);
    }
    PathBuf::from(path)
}

/// Replace characters invalid in file names with `&#<code>;`.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c) {
            out.push_str(&format!("&#{};", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Generated name for pending and local-file exports:
/// `yyyyMMddTHHmmss_<workspace>@<computer>`.
pub fn timestamped_file_name(workspace: &WorkspaceInfo, now: NaiveDateTime) -> String {
    format!("{}_{}", now.format("%Y%m%dT%H%M%S"), workspace.label())
}

/// Make sure the archive can be written at `path` before any work starts.
pub fn check_output_path(path: &Path) -> Result<OutputStatus> {
    match fs::metadata(path) {
        Ok(meta) if meta.permissions().readonly() || meta.is_dir() => Err(ExportError::OutputPath {
            path: path.to_path_buf(),
            reason: "cannot write".to_string(),
        }),
        Ok(_) => Ok(OutputStatus::Exists),
        Err(_) => {
            let parent = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            if parent.is_dir() {
                Ok(OutputStatus::New)
            } else {
                Err(ExportError::OutputPath {
                    path: path.to_path_buf(),
                    reason: "cannot access".to_string(),
                })
            }
        }
    }
}

fn ends_with_separator(path: &str) -> bool {
    path.ends_with('/') || path.ends_with('\\') || path.ends_with(MAIN_SEPARATOR)
}
