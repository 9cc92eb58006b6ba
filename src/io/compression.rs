//! Compression codecs, delegated to the `gzip` and `bzip2` command-line tools.
//!
//! The crate does not compress anything itself: compressed sources are read
//! through the process bridge and compressed sinks write into a codec child.

use crate::error::SeqError;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Bzip2,
}

impl Compression {
    /// Infer the codec from a `.gz` / `.bz2` extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("bz2") => Compression::Bzip2,
            _ => Compression::None,
        }
    }

    /// The external tool implementing the codec.
    pub fn program(self) -> Option<&'static str> {
        match self {
            Compression::None => None,
            Compression::Gzip => Some("gzip"),
            Compression::Bzip2 => Some("bzip2"),
        }
    }

    /// Command that writes the decompressed content of `path` to stdout.
    pub fn decompress_command(self, path: &Path) -> Option<Command> {
        let mut command = Command::new(self.program()?);
        command.arg("-dc").arg(path);
        Some(command)
    }

    /// Command that compresses stdin to stdout.
    pub fn compress_command(self) -> Option<Command> {
        let mut command = Command::new(self.program()?);
        command.arg("-c");
        Some(command)
    }
}

impl FromStr for Compression {
    type Err = SeqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Compression::None),
            "gz" | "gzip" => Ok(Compression::Gzip),
            "bz2" | "bzip2" => Ok(Compression::Bzip2),
            other => Err(SeqError::InvalidArgument(format!(
                "unknown compression '{}' (expected none, gzip or bzip2)",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Compression::from_path(Path::new("a.txt.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("a.bz2")), Compression::Bzip2);
        assert_eq!(Compression::from_path(Path::new("a.txt")), Compression::None);
        assert_eq!(Compression::from_path(Path::new("noext")), Compression::None);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("GZIP".parse::<Compression>().unwrap(), Compression::Gzip);
        assert_eq!("bz2".parse::<Compression>().unwrap(), Compression::Bzip2);
        assert!("zstd".parse::<Compression>().is_err());
    }

    #[test]
    fn test_commands() {
        assert!(Compression::None.compress_command().is_none());
        let cmd = Compression::Gzip.decompress_command(Path::new("x.gz")).unwrap();
        assert_eq!(cmd.get_program(), "gzip");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["-dc", "x.gz"]);
    }
}
