//! Buffer size constants for line I/O.
//!
//! These constants control memory usage vs I/O throughput tradeoffs.

use crate::config::is_low_memory;

/// Default output buffer size for file sinks (2 MB).
pub const DEFAULT_OUTPUT_BUFFER: usize = 2 * 1024 * 1024;

/// Low-memory output buffer size (256 KB).
pub const LOW_MEMORY_OUTPUT_BUFFER: usize = 256 * 1024;

/// Default input buffer size (256 KB).
pub const DEFAULT_INPUT_BUFFER: usize = 256 * 1024;

/// Low-memory input buffer size (64 KB).
pub const LOW_MEMORY_INPUT_BUFFER: usize = 64 * 1024;

/// Buffer between the pipe writer and a child's stdin (64 KB, one Linux pipe).
pub const PIPE_BUFFER: usize = 64 * 1024;

/// Output buffer size for the current low-memory setting.
#[inline]
pub fn output_buffer_size() -> usize {
    if is_low_memory() {
        LOW_MEMORY_OUTPUT_BUFFER
    } else {
        DEFAULT_OUTPUT_BUFFER
    }
}

/// Input buffer size for the current low-memory setting.
#[inline]
pub fn input_buffer_size() -> usize {
    if is_low_memory() {
        LOW_MEMORY_INPUT_BUFFER
    } else {
        DEFAULT_INPUT_BUFFER
    }
}
