//! Error type shared by every fallible operation in the crate.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised by sequence constructors, file sinks and the process bridge.
///
/// Pull-time I/O failures are not surfaced through this type: a sequence that
/// hits a read error logs it and reports exhaustion instead.
#[derive(Error, Debug)]
pub enum SeqError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("File already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Element {index} contains a line break and cannot be written as one line")]
    EmbeddedNewline { index: usize },

    #[error("Command `{command}` exited with {status}")]
    ProcessFailed { command: String, status: ExitStatus },
}

pub type Result<T> = std::result::Result<T, SeqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SeqError::NotFound(PathBuf::from("/tmp/missing.txt"));
        assert_eq!(err.to_string(), "File not found: /tmp/missing.txt");

        let err = SeqError::EmbeddedNewline { index: 3 };
        assert!(err.to_string().starts_with("Element 3"));
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: SeqError = io_err.into();
        assert!(matches!(err, SeqError::Io(_)));
    }
}
