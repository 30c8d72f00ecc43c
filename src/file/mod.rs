//! Log file access.
//!
//! Taint logs routinely reach hundreds of megabytes, so they are read through a
//! memory mapping rather than buffered into the heap. [`LogFile`] abstracts over
//! the data source and hands out the log line by line.
//!
//! # Key Components
//!
//! - [`crate::file::LogFile`] - A loaded log with a line iterator
//! - [`crate::file::Backend`] - Trait for different data sources
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend
//! - [`crate::file::memory::Memory`] - In-memory buffer backend
//!
//! # Examples
//!
//! ```rust,no_run
//! use taintpath::file::LogFile;
//! use std::path::Path;
//!
//! let log = LogFile::from_file(Path::new("logcat.txt"))?;
//! for line in log.lines().take(3) {
//!     println!("{line}");
//! }
//! # Ok::<(), taintpath::Error>(())
//! ```

pub mod memory;
pub mod physical;

use std::{borrow::Cow, fs, path::Path};

use crate::Result;
use memory::Memory;
use physical::Physical;

/// Backend trait for log data sources.
///
/// Implementors expose the raw bytes of a log; [`LogFile`] does the line splitting.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;

    /// Returns `true` if the backend holds no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded taint log.
pub struct LogFile {
    data: Box<dyn Backend>,
}

impl LogFile {
    /// Maps the log at `path` into memory.
    ///
    /// Zero-length files cannot be mapped and are loaded as an empty buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn from_file(path: &Path) -> Result<LogFile> {
        if fs::metadata(path)?.len() == 0 {
            return Ok(Self::from_mem(Vec::new()));
        }

        Ok(LogFile {
            data: Box::new(Physical::new(path)?),
        })
    }

    /// Wraps an in-memory log.
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> LogFile {
        LogFile {
            data: Box::new(Memory::new(data)),
        }
    }

    /// Size of the log in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterates over the lines of the log.
    ///
    /// Both `\n` and `\r\n` terminators are accepted. Invalid UTF-8 is replaced
    /// rather than rejected, device logs occasionally contain truncated multi-byte
    /// sequences.
    pub fn lines(&self) -> impl Iterator<Item = Cow<'_, str>> {
        split_lines(self.data.data())
    }
}

pub(crate) fn split_lines(data: &[u8]) -> impl Iterator<Item = Cow<'_, str>> {
    let body = data.strip_suffix(b"\n").unwrap_or(data);
    let limit = if data.is_empty() { 0 } else { usize::MAX };

    body.split(|b| *b == b'\n')
        .take(limit)
        .map(|raw| String::from_utf8_lossy(raw.strip_suffix(b"\r").unwrap_or(raw)))
}
