//! Line-oriented producers and the file-write terminal.
//!
//! - Text files, optionally gzip/bzip2 compressed ([`read_lines`])
//! - Arbitrary readers such as stdin ([`lines_from_reader`])
//! - Newline-delimited file output ([`write_lines`])

pub mod buffers;
pub mod compression;
pub(crate) mod lines;
pub mod sink;

pub use compression::Compression;
pub use lines::{lines_from_reader, read_lines, read_lines_with};
pub use sink::{write_lines, write_to, WriteMode};
