//! A line-oriented reader for Linux pseudo-files
//!
//! Linux pseudo-files, such as those from /proc, have a number of special
//! characteristics that are best accounted for through a special abstraction:
//!
//! - They are small (a few kB at most) and generated on the host CPU, so
//!   there is no benefit in reading them asynchronously.
//! - They almost exclusively contain ASCII-encoded text, but some fields (such
//!   as process names) are copied verbatim from user space and may thus hold
//!   arbitrary bytes.
//! - Their format is part of the kernel ABI, and is thus expected to only be
//!   modified through backwards-compatible extensions.
//!
//! The parsers of this crate consume pseudo-files one line at a time, from any
//! buffered stream. The LineReader provided here is the shared way of doing
//! so, and ProcFileReader takes care of the file handle's lifecycle when we
//! are the ones opening the pseudo-file.

use crate::error::Result;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
#[cfg(test)]
use std::io::Read;
use std::path::Path;


/// Line-by-line reader of a pseudo-file, reusing its readout buffers
pub(crate) struct LineReader<R: BufRead> {
    /// Stream which we are reading from
    reader: R,

    /// Buffer in which the raw bytes of the current line are read out
    byte_buffer: Vec<u8>,

    /// Text of the current line, with invalid UTF-8 sequences replaced
    line_buffer: String,

    /// Number of lines that were read so far
    line_number: usize,
}
//
impl<R: BufRead> LineReader<R> {
    /// Start reading lines from a buffered stream
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            byte_buffer: Vec::new(),
            line_buffer: String::new(),
            line_number: 0,
        }
    }

    /// Read the next line, without its terminating newline. Returns None once
    /// the end of the stream has been reached.
    pub fn next_line(&mut self) -> io::Result<Option<&str>> {
        // Read the raw bytes of the next line, if any
        self.byte_buffer.clear();
        if self.reader.read_until(b'\n', &mut self.byte_buffer)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        // Drop the line terminator
        if self.byte_buffer.last() == Some(&b'\n') {
            self.byte_buffer.pop();
        }

        // Decode the line, tolerating stray non-UTF-8 bytes
        self.line_buffer.clear();
        self.line_buffer.push_str(&String::from_utf8_lossy(&self.byte_buffer));
        Ok(Some(&self.line_buffer))
    }

    /// Tell the 1-based number of the line last returned by next_line()
    pub fn line_number(&self) -> usize {
        self.line_number
    }
}


/// Scoped access to a pseudo-file that we opened ourselves
///
/// The file handle lives exactly as long as this struct, and parse() consumes
/// it, so the handle is released however the parser exits.
///
pub(crate) struct ProcFileReader {
    /// Lines of the file being parsed
    lines: LineReader<BufReader<File>>,
}
//
impl ProcFileReader {
    /// Attempt to open a proc pseudo-file
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file_handle = File::open(path)?;
        Ok(
            Self {
                lines: LineReader::new(BufReader::new(file_handle)),
            }
        )
    }

    /// Hand the contents of the file to a parser, then close the file
    pub fn parse<F, T>(mut self, parser: F) -> Result<T>
        where F: FnOnce(&mut LineReader<BufReader<File>>) -> Result<T>
    {
        parser(&mut self.lines)
    }
}


/// Stream which yields some text, then fails, like a pseudo-file whose
/// process exits while it is being read
#[cfg(test)]
pub(crate) struct FailingReader {
    /// Bytes which are yet to be read out before the failure
    remaining: &'static [u8],
}
//
#[cfg(test)]
impl FailingReader {
    /// Yield "text", then fail
    pub fn new(text: &'static str) -> Self {
        Self { remaining: text.as_bytes() }
    }
}
//
#[cfg(test)]
impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Other, "process vanished"));
        }
        let len = self.remaining.len().min(buf.len());
        buf[..len].copy_from_slice(&self.remaining[..len]);
        self.remaining = &self.remaining[len..];
        Ok(len)
    }
}
