//! Change Export Builder: pending changes in, archive entries out.
//!
//! For every change, in order: one manifest line; for files, the current
//! content (unless deleted) under `repository/`, then the base-version
//! content (when there is one) with `.C<rev>` spliced into the file name.
//! [`ChangeExportBuilder::finish`] closes with `Files.txt` and `Info.txt`.

use std::fs;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use shelvepack_core::layout::{base_version_path, repository_path, INFO_ENTRY, MANIFEST_ENTRY};
use shelvepack_core::{server_relative, ExportSource, PendingChange};

use crate::archive::{ArchiveEntryRequest, ArchiveSink, EntryContent};
use crate::backend::ChangeBackend;
use crate::error::{ExportError, Result};
use crate::scratch::ScratchFile;

/// Tool marker written to `Info.txt`.
pub const TOOL_NAME: &str = concat!("shelvepack ", env!("CARGO_PKG_VERSION"));

pub struct ChangeExportBuilder<'a, B: ChangeBackend + ?Sized> {
    backend: &'a B,
    scratch: &'a ScratchFile,
    manifest: Vec<String>,
    staged: usize,
}

impl<'a, B: ChangeBackend + ?Sized> ChangeExportBuilder<'a, B> {
    pub fn new(backend: &'a B, scratch: &'a ScratchFile) -> Self {
        Self {
            backend,
            scratch,
            manifest: Vec::new(),
            staged: 0,
        }
    }

    /// Export every change in order.
    ///
    /// An empty list is terminal: [`ExportError::NothingToExport`].
    pub fn export_changes(
        &mut self,
        changes: &[PendingChange],
        sink: &mut dyn ArchiveSink,
    ) -> Result<()> {
        if changes.is_empty() {
            return Err(ExportError::NothingToExport);
        }
        for change in changes {
            self.export_change(change, sink)?;
        }
        Ok(())
    }

    /// Record one change in the manifest and stage its content.
    pub fn export_change(
        &mut self,
        change: &PendingChange,
        sink: &mut dyn ArchiveSink,
    ) -> Result<()> {
        let line = change.manifest_line();
        info!("{}", line);
        self.manifest.push(line);

        if !change.is_file() {
            debug!(item = %change.server_path, "folder, manifest only");
            return Ok(());
        }

        let relative = server_relative(&change.server_path)?;

        if !change.is_delete() {
            self.fetch_current(change)?;
            self.stage_scratch(repository_path(relative), change.creation_date, sink)?;
        }

        if let Some(version) = change.base_version() {
            let base_relative = server_relative(change.base_server_path())?;
            let archive_path = repository_path(&base_version_path(base_relative, version));
            let timestamp = self.backend.changeset_timestamp(version)?;

            self.scratch.reset()?;
            self.backend.download_base(change, self.scratch.path())?;
            self.stage_scratch(archive_path, timestamp, sink)?;
        }

        Ok(())
    }

    /// Fetch current content into the scratch file, from the working folder
    /// or from the backend depending on where the change points.
    fn fetch_current(&self, change: &PendingChange) -> Result<()> {
        self.scratch.reset()?;
        if change.is_server_sourced() {
            self.backend.download_shelved(change, self.scratch.path())
        } else {
            fs::copy(&change.local_or_server_path, self.scratch.path())
                .map(|_| ())
                .map_err(|source| ExportError::Fetch {
                    item: change.local_or_server_path.clone(),
                    source,
                })
        }
    }

    fn stage_scratch(
        &mut self,
        path: String,
        modified: DateTime<Utc>,
        sink: &mut dyn ArchiveSink,
    ) -> Result<()> {
        let file = self.scratch.open()?;
        sink.append(ArchiveEntryRequest {
            path,
            modified,
            content: EntryContent::File(file),
        })?;
        self.staged += 1;
        Ok(())
    }

    /// Manifest lines recorded so far.
    pub fn manifest(&self) -> &[String] {
        &self.manifest
    }

    /// Stage `Files.txt` and `Info.txt`; returns the total number of entries
    /// this builder wrote.
    pub fn finish(
        mut self,
        source: &ExportSource,
        now: DateTime<Utc>,
        sink: &mut dyn ArchiveSink,
    ) -> Result<usize> {
        let reference_time = source.reference_time(now);

        let mut manifest = self.manifest.join("\n");
        manifest.push('\n');
        self.stage_text(MANIFEST_ENTRY, manifest, reference_time, sink)?;

        let mut provenance = source.provenance_lines(TOOL_NAME).join("\n");
        provenance.push('\n');
        self.stage_text(INFO_ENTRY, provenance, reference_time, sink)?;

        Ok(self.staged)
    }

    fn stage_text(
        &mut self,
        path: &str,
        text: String,
        modified: DateTime<Utc>,
        sink: &mut dyn ArchiveSink,
    ) -> Result<()> {
        sink.append(ArchiveEntryRequest {
            path: path.to_string(),
            modified,
            content: EntryContent::Bytes(text.into_bytes()),
        })?;
        self.staged += 1;
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────
