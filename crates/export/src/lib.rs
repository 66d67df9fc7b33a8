//! Export of pending changes into a single `.tar.zst` archive.
//!
//! - [`ChangeExportBuilder`] stages current and base-version content for each
//!   pending change, then the manifest and provenance records
//! - [`LocalFileSweep`] adds working-folder files admitted by a rule expression
//! - [`ArchiveWriter`] streams staged entries into the compressed archive
//! - [`run_export`] ties them together for one run

pub mod archive;
pub mod backend;
pub mod builder;
pub mod error;
pub mod output;
pub mod run;
pub mod scratch;
pub mod sweep;

pub use archive::{ArchiveEntryRequest, ArchiveSink, ArchiveWriter, EntryContent, MemoryEntry, MemorySink};
pub use backend::{ChangeBackend, StoreBackend, StoreDocument, StoredShelveset};
pub use builder::{ChangeExportBuilder, TOOL_NAME};
pub use error::{ExportError, Result};
pub use output::{
    check_output_path, resolve_output_path, sanitize_file_name, timestamped_file_name, OutputStatus,
    ARCHIVE_EXTENSION,
};
pub use run::{export_into, run_export, ExportRequest, ExportSummary, SweepPlan};
pub use scratch::ScratchFile;
pub use sweep::{LocalFileSweep, SweepSummary};
