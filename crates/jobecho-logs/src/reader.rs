use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::EchoError;

/// Read position and unterminated tail of one capture file
///
/// The file is appended to by another process while we read it. Every flush
/// picks up the bytes written since the previous one, hands out the lines that
/// are complete and keeps the trailing fragment as residue until its newline
/// shows up (or the stream is flushed for the last time).
#[derive(Debug)]
pub struct StreamCursor {
    /// Capture file location
    path: PathBuf,

    /// Read handle, opened on first use
    file: Option<File>,

    /// Bytes after the last newline seen so far. Never contains `\n`.
    residue: Vec<u8>,
}

impl StreamCursor {
    /// Create a cursor for a capture file; nothing is opened yet
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            residue: Vec::new(),
        }
    }

    /// Capture file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the read handle is currently held
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Unterminated trailing fragment carried to the next flush
    pub fn residue(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.residue)
    }

    /// Open the capture file unless it is already open
    pub fn open(&mut self) -> Result<(), EchoError> {
        if self.file.is_none() {
            self.file = Some(open_capture(&self.path)?);
        }
        Ok(())
    }

    /// Read everything appended since the last flush and return the complete lines.
    ///
    /// Each returned line ends with exactly one `\n`. When `is_final` is set, a
    /// pending unterminated fragment is returned as a last line with a newline
    /// appended, leaving the residue empty.
    ///
    /// Lines are decoded lossily: invalid UTF-8 becomes U+FFFD, so joining the
    /// returned lines reproduces the file byte for byte only when it is valid
    /// UTF-8.
    pub fn flush(&mut self, is_final: bool) -> Result<Vec<String>, EchoError> {
        let file = match self.file.take() {
            Some(file) => file,
            None => open_capture(&self.path)?,
        };
        let file = self.file.insert(file);

        let mut chunk = Vec::new();
        // Seeking to the current offset drops any cached size, so bytes the
        // writer appended since the last read become visible.
        file.seek(SeekFrom::Current(0))
            .and_then(|_| file.read_to_end(&mut chunk))
            .map_err(|source| EchoError::Read {
                path: self.path.clone(),
                source,
            })?;

        let lines = split_lines(&mut self.residue, &chunk, is_final);
        trace!(
            path = %self.path.display(),
            bytes = chunk.len(),
            lines = lines.len(),
            residue = self.residue.len(),
            "flushed capture file"
        );
        Ok(lines)
    }

    /// Release the read handle and discard the residue
    pub fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), "closed capture file");
        }
        self.residue.clear();
    }
}

fn open_capture(path: &Path) -> Result<File, EchoError> {
    let file = File::open(path).map_err(|source| EchoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "opened capture file");
    Ok(file)
}

/// Split `chunk`, prefixed by `residue`, into newline-terminated lines.
///
/// The unterminated tail is left in `residue`. With `is_final` the tail is
/// emitted as a line of its own with a synthetic newline instead. Complete
/// lines are decoded with [`String::from_utf8_lossy`].
pub fn split_lines(residue: &mut Vec<u8>, chunk: &[u8], is_final: bool) -> Vec<String> {
    let mut pending = std::mem::take(residue);
    pending.extend_from_slice(chunk);

    let mut lines = Vec::new();
    let mut start = 0;
    while let Some(offset) = pending[start..].iter().position(|&b| b == b'\n') {
        let end = start + offset + 1;
        lines.push(String::from_utf8_lossy(&pending[start..end]).into_owned());
        start = end;
    }
    pending.drain(..start);

    if is_final && !pending.is_empty() {
        pending.push(b'\n');
        lines.push(String::from_utf8_lossy(&pending).into_owned());
        pending.clear();
    }

    *residue = pending;
    lines
}
