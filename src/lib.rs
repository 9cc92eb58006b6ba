// Clippy allows for the whole crate
#![allow(clippy::should_implement_trait)]
#![allow(clippy::type_complexity)]

//! pullseq: lazy, pull-based sequences
//!
//! This library provides a single-pass [`Sequence`] type and a vocabulary of
//! composable operators over it.
//!
//! # Features
//!
//! - **Lazy pull engine**: map/filter/take/zip and friends do work only when
//!   pulled, and release files and child processes on exhaustion
//! - **Sorted-set algebra**: streaming dedup, diff, intersect, k-way merge and
//!   grouping over pre-sorted inputs
//! - **Windowing**: overlapping and disjoint windows, batching
//! - **Reservoir sampling**: Algorithm L, O(k) memory
//! - **Process bridge**: pipe a sequence through any command-line tool
//! - **Parallel consumer**: fan a consumer callback out to a worker pool
//!
//! # Example
//!
//! ```rust
//! use pullseq::Sequence;
//!
//! let evens = Sequence::from_iter(1..=10).filter(|x| x % 2 == 0);
//! let odds = Sequence::from_iter(1..=10).filter(|x| x % 2 == 1);
//!
//! let all = evens.merge_sorted(vec![odds]).to_list();
//! assert_eq!(all, (1..=10).collect::<Vec<_>>());
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod io;
pub mod parallel;
pub mod process;
pub mod sample;
pub mod sequence;
pub mod sorted;
pub mod text;
pub mod window;

// Re-export commonly used types
pub use error::{Result, SeqError};
pub use handle::{Release, ResourceHandle};
pub use parallel::ParallelReport;
pub use process::ProcessMonitor;
pub use sample::Reservoir;
pub use sequence::{Sequence, Source};
pub use text::ToLine;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, SeqError};
    pub use crate::handle::{Release, ResourceHandle};
    pub use crate::io::{read_lines, write_lines, Compression, WriteMode};
    pub use crate::process::command_lines;
    pub use crate::sequence::{Sequence, Source};
    pub use crate::text::ToLine;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_basic_workflow() {
        use crate::Sequence;

        let words = Sequence::from_vec(vec!["pear", "apple", "fig", "apple"]);
        let unique = words.sorted().dedup_sorted().to_list();

        assert_eq!(unique, vec!["apple", "fig", "pear"]);
    }

    #[test]
    fn test_window_workflow() {
        use crate::Sequence;

        let sums: Vec<i32> = Sequence::from_iter(1..=5)
            .overlapping_window_with_strict_length(2)
            .map(|w| w.iter().sum())
            .to_list();

        assert_eq!(sums, vec![3, 5, 7, 9]);
    }
}
