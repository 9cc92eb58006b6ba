//! Fixed-size windows and batches.
//!
//! - Overlapping windows slide by one element.
//! - Non-overlapping windows (and [`Sequence::partition`]) step by the window
//!   size.
//!
//! The lenient variants emit trailing windows shorter than the requested size;
//! the `_with_strict_length` variants drop them. That completeness check on
//! the trailing windows is the only difference between the two.

use crate::sequence::{Sequence, Source};
use std::collections::VecDeque;

/// Sliding window, step 1.
///
/// After the source is exhausted the window keeps evicting its oldest element
/// and emits each shrinking tail until empty (lenient) or stops at the first
/// short window (strict).
struct OverlappingWindow<T> {
    upstream: Sequence<T>,
    size: usize,
    window: VecDeque<T>,
    strict: bool,
    exhausted: bool,
    emitted: bool,
}

impl<T> Source<Vec<T>> for OverlappingWindow<T>
where
    T: Clone + Send + 'static,
{
    fn pull(&mut self) -> Option<Vec<T>> {
        if self.emitted {
            self.window.pop_front();
        }
        while !self.exhausted && self.window.len() < self.size {
            match self.upstream.next() {
                Some(item) => self.window.push_back(item),
                None => self.exhausted = true,
            }
        }
        if self.window.is_empty() || (self.strict && self.window.len() < self.size) {
            self.window.clear();
            return None;
        }
        self.emitted = true;
        Some(self.window.iter().cloned().collect())
    }

    fn close(&mut self) {
        self.window.clear();
        self.upstream.close();
    }
}

/// Disjoint blocks of up to `size` elements.
struct Chunks<T> {
    upstream: Sequence<T>,
    size: usize,
    strict: bool,
}

impl<T: Send + 'static> Source<Vec<T>> for Chunks<T> {
    fn pull(&mut self) -> Option<Vec<T>> {
        let mut block = Vec::with_capacity(self.size);
        while block.len() < self.size {
            match self.upstream.next() {
                Some(item) => block.push(item),
                None => break,
            }
        }
        if block.is_empty() || (self.strict && block.len() < self.size) {
            return None;
        }
        Some(block)
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

fn assert_window_size(size: usize) {
    assert!(size > 0, "window size must be greater than zero");
}

impl<T: Clone + Send + 'static> Sequence<T> {
    /// Windows of `size` elements sliding by one, followed by the shrinking
    /// tail windows.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    ///
    /// # Example
    ///
    /// ```
    /// use pullseq::Sequence;
    ///
    /// let windows = Sequence::from_iter(1..=4).overlapping_window(3).to_list();
    /// assert_eq!(windows, vec![vec![1, 2, 3], vec![2, 3, 4], vec![3, 4], vec![4]]);
    /// ```
    pub fn overlapping_window(self, size: usize) -> Sequence<Vec<T>> {
        self.overlapping(size, false)
    }

    /// Windows of exactly `size` elements sliding by one.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn overlapping_window_with_strict_length(self, size: usize) -> Sequence<Vec<T>> {
        self.overlapping(size, true)
    }

    fn overlapping(self, size: usize, strict: bool) -> Sequence<Vec<T>> {
        assert_window_size(size);
        Sequence::from_source(OverlappingWindow {
            upstream: self,
            size,
            window: VecDeque::with_capacity(size),
            strict,
            exhausted: false,
            emitted: false,
        })
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Disjoint windows of `size` elements; the last one may be shorter.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn non_overlapping_window(self, size: usize) -> Sequence<Vec<T>> {
        self.chunks(size, false)
    }

    /// Disjoint windows of exactly `size` elements; a short trailing window is
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn non_overlapping_window_with_strict_length(self, size: usize) -> Sequence<Vec<T>> {
        self.chunks(size, true)
    }

    /// Batches of `size` elements, always including the final partial batch.
    ///
    /// # Panics
    ///
    /// Panics if `size` is 0.
    pub fn partition(self, size: usize) -> Sequence<Vec<T>> {
        self.chunks(size, false)
    }

    fn chunks(self, size: usize, strict: bool) -> Sequence<Vec<T>> {
        assert_window_size(size);
        Sequence::from_source(Chunks {
            upstream: self,
            size,
            strict,
        })
    }
}
