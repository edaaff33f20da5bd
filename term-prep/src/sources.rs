//! Table inputs that can be scanned more than once.
//!
//! The profiler sweeps its input twice and the encoder once more, so a source
//! hands out a fresh reader on every [`TableSource::open`] call instead of
//! being a stream itself.

use std::fmt::Debug;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

use crate::error::{PrepError, Result};

/// A re-openable delimited text input.
pub trait TableSource: Debug + Send + Sync {
    /// Opens a new reader positioned at the start of the table.
    fn open(&self) -> Result<Box<dyn BufRead + Send>>;

    /// Size of the raw input in bytes, if known.
    fn size_bytes(&self) -> Option<u64>;

    /// Human readable description used in logs.
    fn description(&self) -> String;
}

/// A table stored in a local file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Creates a source for `path`. The file is not opened until [`TableSource::open`].
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// The path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableSource for FileSource {
    fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(&self.path).map_err(|e| {
            PrepError::input(format!("Cannot open file: {} ({e})", self.path.display()))
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn size_bytes(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    fn description(&self) -> String {
        self.path.display().to_string()
    }
}

/// A table held in memory, mostly useful for tests and small inputs.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    text: String,
}

impl InMemorySource {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl TableSource for InMemorySource {
    fn open(&self) -> Result<Box<dyn BufRead + Send>> {
        Ok(Box::new(Cursor::new(self.text.clone().into_bytes())))
    }

    fn size_bytes(&self) -> Option<u64> {
        Some(self.text.len() as u64)
    }

    fn description(&self) -> String {
        format!("<memory: {} bytes>", self.text.len())
    }
}

/// Reads lines ending in `\n`, `\r\n` or a lone `\r`.
///
/// A last line without terminator is returned; a trailing terminator does not
/// yield an extra empty line. Invalid UTF-8 is replaced rather than rejected.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(256),
        }
    }

    /// Reads the next line into `line`, returning false at end of input.
    pub fn read_line(&mut self, line: &mut String) -> Result<bool> {
        self.buf.clear();
        line.clear();
        loop {
            let (consumed, done) = {
                let available = self.inner.fill_buf()?;
                if available.is_empty() {
                    if self.buf.is_empty() {
                        return Ok(false);
                    }
                    break;
                }
                match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                    Some(pos) => {
                        self.buf.extend_from_slice(&available[..pos]);
                        (pos + 1, Some(available[pos]))
                    }
                    None => {
                        self.buf.extend_from_slice(available);
                        (available.len(), None)
                    }
                }
            };
            self.inner.consume(consumed);
            match done {
                Some(b'\r') => {
                    // swallow the \n of a \r\n pair
                    let next = self.inner.fill_buf()?;
                    if next.first() == Some(&b'\n') {
                        self.inner.consume(1);
                    }
                    break;
                }
                Some(_) => break,
                None => continue,
            }
        }
        line.push_str(&String::from_utf8_lossy(&self.buf));
        Ok(true)
    }
}
