//! Positioned reads and line reassembly.

use std::borrow::Cow;
use std::io::{ErrorKind, SeekFrom};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// One complete record from the tailed file, without its trailing newline.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Line(Vec<u8>);

impl Line {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decodes the line, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Line {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&str> for Line {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Line({:?})", self.to_string_lossy())
    }
}

/// Carries the unterminated tail of one read into the next.
#[derive(Debug, Default)]
pub(crate) struct LineAssembler {
    partial: Vec<u8>,
}

impl LineAssembler {
    /// Appends `chunk` and returns every line it completes, in order.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut rest = chunk;

        while let Some(i) = rest.iter().position(|&b| b == b'\n') {
            let mut bytes = std::mem::take(&mut self.partial);
            bytes.extend_from_slice(&rest[..i]);
            lines.push(Line(bytes));
            rest = &rest[i + 1..];
        }

        self.partial.extend_from_slice(rest);
        lines
    }

    /// Bytes received after the last newline.
    pub(crate) fn pending(&self) -> &[u8] {
        &self.partial
    }
}

/// Reads up to `buf.len()` bytes starting at `offset`.
///
/// Returns 0 at end of file. Interrupted reads are retried.
pub(crate) async fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    file.seek(SeekFrom::Start(offset)).await?;
    loop {
        match file.read(buf).await {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Detect if the file was truncated by comparing current size with last position
pub(crate) fn detect_file_truncation(current_size: u64, last_position: u64) -> bool {
    current_size < last_position
}
