//! Line-oriented sources: text files (optionally compressed) and readers.

use super::buffers::input_buffer_size;
use super::compression::Compression;
use crate::error::{Result, SeqError};
use crate::handle::{Release, ResourceHandle};
use crate::process;
use crate::sequence::{Sequence, Source};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Reader whose release is a plain drop.
pub(crate) struct OwnedReader<R>(pub(crate) R);

impl<R: Read> Read for OwnedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<R> Release for OwnedReader<R> {
    fn release(self) -> io::Result<()> {
        drop(self);
        Ok(())
    }
}

/// Yields one `String` per line with the line terminator stripped.
///
/// A read error (including invalid UTF-8) is logged with the source label and
/// line number, then the source releases its reader and reports exhaustion.
pub(crate) struct LineSource<R: Release> {
    handle: ResourceHandle<R>,
    line_number: usize,
    failed: bool,
}

impl<R: BufRead + Release> LineSource<R> {
    pub(crate) fn new(handle: ResourceHandle<R>) -> Self {
        Self {
            handle,
            line_number: 0,
            failed: false,
        }
    }

    /// True if the source ended because of a read error.
    pub(crate) fn failed(&self) -> bool {
        self.failed
    }
}

impl<R> Source<String> for LineSource<R>
where
    R: BufRead + Release + Send,
{
    fn pull(&mut self) -> Option<String> {
        let reader = self.handle.get_mut()?;
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                self.handle.close_logged();
                None
            }
            Ok(_) => {
                self.line_number += 1;
                trim_line_end(&mut line);
                Some(line)
            }
            Err(e) => {
                tracing::warn!(
                    source = %self.handle.label(),
                    line = self.line_number + 1,
                    error = %e,
                    "read failed, ending sequence"
                );
                self.failed = true;
                self.handle.close_logged();
                None
            }
        }
    }

    fn close(&mut self) {
        self.handle.close_logged();
    }
}

/// Strip one trailing `\n` or `\r\n`.
#[inline]
fn trim_line_end(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

/// Lines of a text file. `.gz` and `.bz2` files are decompressed on the fly.
///
/// Fails immediately if `path` does not exist or is a directory.
///
/// # Example
///
/// ```rust,no_run
/// use pullseq::io::read_lines;
///
/// let words = read_lines("words.txt.gz").unwrap().filter(|w| !w.is_empty());
/// for word in words {
///     println!("{}", word);
/// }
/// ```
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Sequence<String>> {
    let path = path.as_ref();
    read_lines_with(path, Compression::from_path(path))
}

/// Lines of a text file with an explicit codec.
pub fn read_lines_with<P: AsRef<Path>>(
    path: P,
    compression: Compression,
) -> Result<Sequence<String>> {
    let path = path.as_ref();
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            return Err(SeqError::InvalidArgument(format!(
                "{} is a directory",
                path.display()
            )));
        }
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(SeqError::NotFound(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    }

    match compression.decompress_command(path) {
        Some(command) => process::spawn_lines(command).map(|(lines, _)| lines),
        None => {
            let file = File::open(path)?;
            let reader = BufReader::with_capacity(input_buffer_size(), file);
            let handle = ResourceHandle::new(reader, path.display().to_string());
            Ok(Sequence::from_source(LineSource::new(handle)))
        }
    }
}

/// Lines of any reader, e.g. stdin or a socket.
pub fn lines_from_reader<R>(reader: R, label: impl Into<String>) -> Sequence<String>
where
    R: Read + Send + 'static,
{
    let reader = BufReader::with_capacity(input_buffer_size(), OwnedReader(reader));
    Sequence::from_source(LineSource::new(ResourceHandle::new(reader, label)))
}
