//! File metadata as seen by rule predicates.
//!
//! Content is never read eagerly: [`FileFacts::leading_lines`] opens the file
//! on each call, so predicates can ask for it in any order, or not at all.

use std::fs::{self, File, Metadata};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

/// What a predicate may ask about a file.
pub trait FileFacts {
    fn full_path(&self) -> &Path;

    fn is_read_only(&self) -> bool;

    /// Up to `count` leading lines of text, line terminators stripped.
    ///
    /// Fails only when the file cannot be opened or read; undecodable bytes
    /// become U+FFFD.
    fn leading_lines(&self, count: usize) -> io::Result<Vec<String>>;
}

/// A file on the local file system.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    metadata: Metadata,
}

impl LocalFile {
    /// Wrap a path whose metadata has already been read (e.g. by a directory walk).
    pub fn new(path: PathBuf, metadata: Metadata) -> Self {
        Self { path, metadata }
    }

    /// Stat `path` and wrap it.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path)?;
        Ok(Self { path, metadata })
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl FileFacts for LocalFile {
    fn full_path(&self) -> &Path {
        &self.path
    }

    fn is_read_only(&self) -> bool {
        self.metadata.permissions().readonly()
    }

    fn leading_lines(&self, count: usize) -> io::Result<Vec<String>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let encoding = TextEncoding::sniff(&mut reader)?;
        let mut lines = Vec::with_capacity(count);
        while lines.len() < count {
            match encoding.read_line(&mut reader)? {
                Some(line) => lines.push(line),
                None => break,
            }
        }
        Ok(lines)
    }
}

// ── Text decoding ───────────────────────────────────────────────────

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Encoding chosen by byte order mark; no mark means UTF-8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Detect the encoding and consume its byte order mark.
    fn sniff(reader: &mut impl BufRead) -> io::Result<Self> {
        let head = reader.fill_buf()?;
        let (encoding, bom_len) = if head.starts_with(UTF8_BOM) {
            (TextEncoding::Utf8, UTF8_BOM.len())
        } else if head.starts_with(UTF16LE_BOM) {
            (TextEncoding::Utf16Le, UTF16LE_BOM.len())
        } else if head.starts_with(UTF16BE_BOM) {
            (TextEncoding::Utf16Be, UTF16BE_BOM.len())
        } else {
            (TextEncoding::Utf8, 0)
        };
        reader.consume(bom_len);
        Ok(encoding)
    }

    /// Next line without its `\n` / `\r\n` terminator, `None` at end of file.
    fn read_line(self, reader: &mut impl BufRead) -> io::Result<Option<String>> {
        match self {
            TextEncoding::Utf8 => {
                let mut buf = Vec::new();
                if reader.read_until(b'\n', &mut buf)? == 0 {
                    return Ok(None);
                }
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                }
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
            }
            TextEncoding::Utf16Le | TextEncoding::Utf16Be => {
                let mut units = Vec::new();
                let mut read_any = false;
                loop {
                    let mut pair = [0u8; 2];
                    match reader.read_exact(&mut pair) {
                        Ok(()) => {}
                        // A trailing odd byte ends the text as well.
                        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
                        Err(e) => return Err(e),
                    }
                    read_any = true;
                    let unit = if self == TextEncoding::Utf16Le {
                        u16::from_le_bytes(pair)
                    } else {
                        u16::from_be_bytes(pair)
                    };
                    if unit == u16::from(b'\n') {
                        break;
                    }
                    units.push(unit);
                }
                if !read_any {
                    return Ok(None);
                }
                if units.last() == Some(&u16::from(b'\r')) {
                    units.pop();
                }
                Ok(Some(
                    char::decode_utf16(units)
                        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                        .collect(),
                ))
            }
        }
    }
}
