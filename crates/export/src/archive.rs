//! Archive sink: staged entries in, one compressed archive out.
//!
//! Entries are written in the order they arrive. Content is streamed from
//! open files, so nothing larger than the manifest is held in memory.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufWriter, Cursor, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::error::{ExportError, Result};

/// One member to add to the archive.
#[derive(Debug)]
pub struct ArchiveEntryRequest {
    /// Virtual path inside the archive, `/`-separated.
    pub path: String,
    pub modified: DateTime<Utc>,
    pub content: EntryContent,
}

/// Where an entry's bytes come from.
#[derive(Debug)]
pub enum EntryContent {
    /// An open file, streamed from its current position to the end.
    File(File),
    Bytes(Vec<u8>),
}

impl EntryContent {
    fn len(&self) -> io::Result<u64> {
        match self {
            EntryContent::File(f) => Ok(f.metadata()?.len()),
            EntryContent::Bytes(b) => Ok(b.len() as u64),
        }
    }

    fn into_reader(self) -> Box<dyn Read> {
        match self {
            EntryContent::File(f) => Box::new(f),
            EntryContent::Bytes(b) => Box::new(Cursor::new(b)),
        }
    }
}

/// Destination for staged entries.
pub trait ArchiveSink {
    /// Write one entry. Two entries with the same path are a contract
    /// violation and fail with [`ExportError::DuplicateEntry`].
    fn append(&mut self, entry: ArchiveEntryRequest) -> Result<()>;
}

/// Tracks member paths already written.
#[derive(Debug, Default)]
struct SeenPaths(HashSet<String>);

impl SeenPaths {
    fn claim(&mut self, path: &str) -> Result<()> {
        if self.0.insert(path.to_string()) {
            Ok(())
        } else {
            Err(ExportError::DuplicateEntry(path.to_string()))
        }
    }
}

// ── tar.zst writer ──────────────────────────────────────────────────

type Encoder = zstd::Encoder<'static, BufWriter<File>>;

/// Writes a `.tar.zst` archive to a single output file.
pub struct ArchiveWriter {
    path: PathBuf,
    builder: tar::Builder<Encoder>,
    seen: SeenPaths,
    entries: usize,
}

impl ArchiveWriter {
    /// Create (or truncate) the output file and start the archive.
    pub fn create(path: &Path, level: i32) -> Result<Self> {
        let file = File::create(path).map_err(|e| ExportError::OutputPath {
            path: path.to_path_buf(),
            reason: format!("cannot create outfile ({})", e),
        })?;
        let encoder = zstd::Encoder::new(BufWriter::new(file), level)?;
        let builder = tar::Builder::new(encoder);
        debug!(path = %path.display(), level, "archive opened");
        Ok(Self {
            path: path.to_path_buf(),
            builder,
            seen: SeenPaths::default(),
            entries: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Finish the tar stream, flush the compressor, and sync the file.
    ///
    /// On failure the truncated archive is removed before the error returns.
    pub fn finish(self) -> Result<PathBuf> {
        match complete(self.builder) {
            Ok(()) => {
                info!(path = %self.path.display(), entries = self.entries, "archive written");
                Ok(self.path)
            }
            Err(e) => {
                remove_partial(&self.path);
                Err(e.into())
            }
        }
    }

    /// Drop the partially written archive from disk.
    pub fn discard(self) {
        drop(self.builder);
        remove_partial(&self.path);
    }
}

fn complete(builder: tar::Builder<Encoder>) -> io::Result<()> {
    let encoder = builder.into_inner()?;
    let writer = encoder.finish()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}

fn remove_partial(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove partial archive");
    } else {
        info!(path = %path.display(), "partial archive removed");
    }
}

impl ArchiveSink for ArchiveWriter {
    fn append(&mut self, entry: ArchiveEntryRequest) -> Result<()> {
        self.seen.claim(&entry.path)?;

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(entry.content.len()?);
        header.set_mode(0o644);
        header.set_mtime(entry.modified.timestamp().max(0) as u64);

        self.builder
            .append_data(&mut header, &entry.path, entry.content.into_reader())?;
        self.entries += 1;
        debug!(path = %entry.path, "archive entry written");
        Ok(())
    }
}

// ── In-memory sink ──────────────────────────────────────────────────

/// A fully read entry held by [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryEntry {
    pub path: String,
    pub modified: DateTime<Utc>,
    pub data: Vec<u8>,
}

impl MemoryEntry {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

/// Collects entries in memory for tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    seen: SeenPaths,
    pub entries: Vec<MemoryEntry>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<&MemoryEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.path.as_str()).collect()
    }
}

impl ArchiveSink for MemorySink {
    fn append(&mut self, entry: ArchiveEntryRequest) -> Result<()> {
        self.seen.claim(&entry.path)?;
        let mut data = Vec::new();
        entry.content.into_reader().read_to_end(&mut data)?;
        self.entries.push(MemoryEntry {
            path: entry.path,
            modified: entry.modified,
            data,
        });
        Ok(())
    }
}
