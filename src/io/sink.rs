//! File-write terminal: newline-delimited text, one element per line.

use super::buffers::{output_buffer_size, PIPE_BUFFER};
use super::compression::Compression;
use crate::error::{Result, SeqError};
use crate::sequence::Sequence;
use crate::text::{contains_line_break, ToLine};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::process::Stdio;

/// How [`write_lines`] opens its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// The target must not exist yet.
    Create,
    /// The target must already exist; lines are appended.
    Append,
}

/// Drain `seq` into `out`, one line per element. Returns the number of lines.
///
/// Stops at the first element whose text contains a line break. On any error
/// the sequence is closed before returning.
pub fn write_to<T, W>(seq: &mut Sequence<T>, out: &mut W) -> Result<usize>
where
    T: ToLine + Send + 'static,
    W: Write,
{
    let result = write_each(seq, out);
    if result.is_err() {
        seq.close();
    }
    result
}

fn write_each<T, W>(seq: &mut Sequence<T>, out: &mut W) -> Result<usize>
where
    T: ToLine + Send + 'static,
    W: Write,
{
    let mut written = 0;
    while let Some(item) = seq.next() {
        let line = item.to_line();
        if contains_line_break(&line) {
            return Err(SeqError::EmbeddedNewline { index: written });
        }
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        written += 1;
    }
    Ok(written)
}

fn open_for_write(path: &Path, mode: WriteMode) -> Result<File> {
    let mut options = OpenOptions::new();
    match mode {
        WriteMode::Create => options.write(true).create_new(true),
        WriteMode::Append => options.append(true),
    };
    options.open(path).map_err(|e| match e.kind() {
        io::ErrorKind::AlreadyExists => SeqError::AlreadyExists(path.to_path_buf()),
        io::ErrorKind::NotFound => SeqError::NotFound(path.to_path_buf()),
        _ => SeqError::Io(e),
    })
}

/// Write every element of `seq` to `path`, one per line.
///
/// With a codec other than [`Compression::None`], lines are streamed through
/// the codec's command-line tool into the file; appending to a compressed
/// file adds a new compressed member, which both `gzip` and `bzip2` read back
/// as one stream.
///
/// # Example
///
/// ```rust,no_run
/// use pullseq::io::{write_lines, Compression, WriteMode};
/// use pullseq::Sequence;
///
/// let n = write_lines(Sequence::from_iter(1..=3), "out.txt", WriteMode::Create, Compression::None)
///     .unwrap();
/// assert_eq!(n, 3);
/// ```
pub fn write_lines<T, P>(
    mut seq: Sequence<T>,
    path: P,
    mode: WriteMode,
    compression: Compression,
) -> Result<usize>
where
    T: ToLine + Send + 'static,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = match open_for_write(path, mode) {
        Ok(file) => file,
        Err(e) => {
            seq.close();
            return Err(e);
        }
    };

    let Some(mut command) = compression.compress_command() else {
        let mut out = BufWriter::with_capacity(output_buffer_size(), file);
        let written = write_to(&mut seq, &mut out)?;
        out.flush()?;
        return Ok(written);
    };

    let label = compression.program().unwrap_or_default().to_string();
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::from(file))
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|source| SeqError::Spawn {
            command: label.clone(),
            source,
        })?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("codec stdin was not captured"))?;

    let mut out = BufWriter::with_capacity(PIPE_BUFFER, stdin);
    let written = write_to(&mut seq, &mut out).and_then(|n| {
        out.flush()?;
        Ok(n)
    });
    drop(out);

    let status = child.wait()?;
    let written = written?;
    if !status.success() {
        return Err(SeqError::ProcessFailed {
            command: label,
            status,
        });
    }
    Ok(written)
}

impl<T: ToLine + Send + 'static> Sequence<T> {
    /// Terminal form of [`write_lines`].
    pub fn write_to_file<P: AsRef<Path>>(
        self,
        path: P,
        mode: WriteMode,
        compression: Compression,
    ) -> Result<usize> {
        write_lines(self, path, mode, compression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_lines;
    use std::fs;

    #[test]
    fn test_write_to_buffer() {
        let mut out = Vec::new();
        let mut seq = Sequence::from_vec(vec!["a", "b"]);
        let n = write_to(&mut seq, &mut out).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, b"a\nb\n");
    }

    #[test]
    fn test_embedded_newline_rejected() {
        let mut out = Vec::new();
        let mut seq = Sequence::from_vec(vec!["ok", "bad\nline", "never"]);
        let err = write_to(&mut seq, &mut out).unwrap_err();
        assert!(matches!(err, SeqError::EmbeddedNewline { index: 1 }));
        assert!(seq.is_closed());
        assert_eq!(out, b"ok\n");
    }

    #[test]
    fn test_create_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("numbers.txt");

        let n = Sequence::from_iter(1..=3)
            .write_to_file(&path, WriteMode::Create, Compression::None)
            .unwrap();
        assert_eq!(n, 3);

        Sequence::from_vec(vec![4])
            .write_to_file(&path, WriteMode::Append, Compression::None)
            .unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "1\n2\n3\n4\n");
    }

    #[test]
    fn test_create_requires_missing_target() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = write_lines(
            Sequence::from_vec(vec!["x"]),
            file.path(),
            WriteMode::Create,
            Compression::None,
        )
        .unwrap_err();
        assert!(matches!(err, SeqError::AlreadyExists(_)));
    }

    #[test]
    fn test_append_requires_existing_target() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_lines(
            Sequence::from_vec(vec!["x"]),
            dir.path().join("missing.txt"),
            WriteMode::Append,
            Compression::None,
        )
        .unwrap_err();
        assert!(matches!(err, SeqError::NotFound(_)));
    }

    #[test]
    fn test_gzip_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt.gz");

        write_lines(
            Sequence::from_vec(vec!["alpha", "beta"]),
            &path,
            WriteMode::Create,
            Compression::Gzip,
        )
        .unwrap();
        write_lines(
            Sequence::from_vec(vec!["gamma"]),
            &path,
            WriteMode::Append,
            Compression::Gzip,
        )
        .unwrap();

        let lines = read_lines(&path).unwrap().to_list();
        assert_eq!(lines, vec!["alpha", "beta", "gamma"]);
    }
}
