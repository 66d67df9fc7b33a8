//! One export run: changes, optional sweep, records, archive.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info};

use shelvepack_core::{ExportConfig, ExportSource, PendingChange};
use shelvepack_rules::RuleExpression;

use crate::archive::{ArchiveSink, ArchiveWriter};
use crate::backend::ChangeBackend;
use crate::builder::ChangeExportBuilder;
use crate::error::{ExportError, Result};
use crate::scratch::ScratchFile;
use crate::sweep::{LocalFileSweep, SweepSummary};

/// Local-file sweep settings for one run, passed explicitly.
#[derive(Debug, Clone, Default)]
pub struct SweepPlan<'a> {
    pub roots: Vec<PathBuf>,
    /// `None` admits every file.
    pub rule: Option<&'a RuleExpression>,
    /// Paths never to stage.
    pub exclude: Vec<PathBuf>,
}

/// Everything one export needs besides the backend and the sink.
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    pub source: ExportSource,
    pub changes: &'a [PendingChange],
    pub sweep: Option<SweepPlan<'a>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub changes: usize,
    /// Entries written by the change builder, records included.
    pub entries: usize,
    pub sweep: SweepSummary,
}

/// Stage a complete export into `sink`.
pub fn export_into<B: ChangeBackend + ?Sized>(
    request: &ExportRequest<'_>,
    backend: &B,
    scratch: &ScratchFile,
    sink: &mut dyn ArchiveSink,
    now: DateTime<Utc>,
) -> Result<ExportSummary> {
    let mut builder = ChangeExportBuilder::new(backend, scratch);
    builder.export_changes(request.changes, sink)?;

    let mut sweep_summary = SweepSummary::default();
    if let Some(plan) = &request.sweep {
        let mut sweep = LocalFileSweep::new(plan.rule).exclude(scratch.path());
        for path in &plan.exclude {
            sweep = sweep.exclude(path);
        }
        sweep_summary = sweep.sweep(&plan.roots, sink)?;
    }

    let entries = builder.finish(&request.source, now, sink)?;
    Ok(ExportSummary {
        changes: request.changes.len(),
        entries,
        sweep: sweep_summary,
    })
}

/// Write the export to `output`.
///
/// Nothing is created when there are no changes. On any fatal error the
/// partial archive is removed; the scratch file is removed in every case.
pub fn run_export<B: ChangeBackend + ?Sized>(
    request: &ExportRequest<'_>,
    backend: &B,
    config: &ExportConfig,
    output: &Path,
) -> Result<ExportSummary> {
    if request.changes.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    info!(
        mode = request.source.mode_label(),
        changes = request.changes.len(),
        output = %output.display(),
        "starting export"
    );

    let scratch = ScratchFile::new(&config.scratch_dir)?;
    let mut writer = ArchiveWriter::create(output, config.compression_level)?;

    let mut request = request.clone();
    if let Some(plan) = request.sweep.as_mut() {
        plan.exclude.push(output.to_path_buf());
    }

    let outcome = export_into(&request, backend, &scratch, &mut writer, Utc::now());
    let summary = match outcome {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "export failed");
            writer.discard();
            return Err(e);
        }
    };

    let path = writer.finish()?;
    // Cleanup failures past this point only warn; the archive is complete.
    drop(scratch);
    info!(
        path = %path.display(),
        changes = summary.changes,
        swept = summary.sweep.added,
        "export complete"
    );
    Ok(summary)
}
