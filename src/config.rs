//! Global configuration for pullseq runtime behavior.
//!
//! Settings here are process-wide, set once at startup and read when a
//! component is built. None of them are consulted on the per-element pull path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Default number of parallel-consumer workers per hardware thread.
pub const DEFAULT_WORKER_MULTIPLIER: usize = 2;

/// Workers per available hardware thread for [`crate::parallel`].
static WORKER_MULTIPLIER: AtomicUsize = AtomicUsize::new(DEFAULT_WORKER_MULTIPLIER);

/// Set how many parallel-consumer workers are started per hardware thread.
///
/// Values below 1 are clamped to 1.
///
/// # Example
///
/// ```
/// use pullseq::config;
///
/// config::set_worker_multiplier(4);
/// assert_eq!(config::worker_multiplier(), 4);
/// config::set_worker_multiplier(config::DEFAULT_WORKER_MULTIPLIER);
/// ```
#[inline]
pub fn set_worker_multiplier(multiplier: usize) {
    WORKER_MULTIPLIER.store(multiplier.max(1), Ordering::Release);
}

/// Current worker multiplier.
#[inline]
pub fn worker_multiplier() -> usize {
    WORKER_MULTIPLIER.load(Ordering::Acquire)
}

/// Use small I/O buffers for file sources and sinks.
static LOW_MEMORY: AtomicBool = AtomicBool::new(false);

/// Switch file sources and sinks to the low-memory buffer sizes in
/// [`crate::io::buffers`]. Affects sequences opened after the call.
#[inline]
pub fn set_low_memory(enabled: bool) {
    LOW_MEMORY.store(enabled, Ordering::Release);
}

#[inline]
pub fn is_low_memory() -> bool {
    LOW_MEMORY.load(Ordering::Acquire)
}

/// Number of hardware threads, falling back to 1 when it cannot be queried.
pub fn hardware_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Size of the worker pool used by the parallel consumer.
pub fn worker_pool_size() -> usize {
    hardware_parallelism().saturating_mul(worker_multiplier())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_default_multiplier() {
        set_worker_multiplier(DEFAULT_WORKER_MULTIPLIER);
        assert_eq!(worker_multiplier(), 2);
        assert_eq!(worker_pool_size(), hardware_parallelism() * 2);
    }

    #[test]
    #[serial]
    fn test_multiplier_clamped() {
        set_worker_multiplier(0);
        assert_eq!(worker_multiplier(), 1);
        assert_eq!(worker_pool_size(), hardware_parallelism());
        set_worker_multiplier(DEFAULT_WORKER_MULTIPLIER); // Reset
    }

    #[test]
    #[serial]
    fn test_low_memory_buffers() {
        use crate::io::buffers::{input_buffer_size, LOW_MEMORY_INPUT_BUFFER};

        set_low_memory(true);
        assert!(is_low_memory());
        assert_eq!(input_buffer_size(), LOW_MEMORY_INPUT_BUFFER);
        set_low_memory(false);
        assert!(!is_low_memory());
    }
}
