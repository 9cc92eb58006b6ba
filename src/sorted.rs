//! Streaming set algebra over sorted sequences.
//!
//! Every operator here assumes its inputs are already ascending under the
//! comparator in use. This is a caller contract and is not validated; on
//! unsorted input the output is unspecified (but never a panic).
//!
//! All operators stream through dual cursors with one element of look-ahead
//! per input, so memory is O(1) per input except for `group_sorted`, which
//! buffers one group.

use crate::sequence::{Sequence, Source};
use std::cmp::Ordering;

struct DedupSorted<T> {
    upstream: Sequence<T>,
}

impl<T> Source<T> for DedupSorted<T>
where
    T: PartialEq + Send + 'static,
{
    fn pull(&mut self) -> Option<T> {
        let mut current = self.upstream.next()?;
        while let Some(next) = self.upstream.next_if(|next| *next == current) {
            current = next;
        }
        Some(current)
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

struct DiffSorted<T, F> {
    left: Sequence<T>,
    right: Sequence<T>,
    compare: F,
}

impl<T, F> Source<T> for DiffSorted<T, F>
where
    T: Send + 'static,
    F: FnMut(&T, &T) -> Ordering + Send,
{
    fn pull(&mut self) -> Option<T> {
        loop {
            let item = self.left.next()?;
            while self
                .right
                .next_if(|r| (self.compare)(r, &item) == Ordering::Less)
                .is_some()
            {}
            match self.right.peek() {
                Some(r) if (self.compare)(r, &item) == Ordering::Equal => continue,
                _ => return Some(item),
            }
        }
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
    }
}

struct IntersectSorted<T, F> {
    left: Sequence<T>,
    right: Sequence<T>,
    compare: F,
}

impl<T, F> Source<T> for IntersectSorted<T, F>
where
    T: Send + 'static,
    F: FnMut(&T, &T) -> Ordering + Send,
{
    fn pull(&mut self) -> Option<T> {
        loop {
            let order = match (self.left.peek(), self.right.peek()) {
                (Some(l), Some(r)) => (self.compare)(l, r),
                _ => return None,
            };
            match order {
                Ordering::Less => {
                    self.left.next();
                }
                Ordering::Greater => {
                    self.right.next();
                }
                Ordering::Equal => {
                    let key = self.left.next()?;
                    while self
                        .left
                        .next_if(|l| (self.compare)(l, &key) == Ordering::Equal)
                        .is_some()
                    {}
                    while self
                        .right
                        .next_if(|r| (self.compare)(r, &key) == Ordering::Equal)
                        .is_some()
                    {}
                    return Some(key);
                }
            }
        }
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
    }
}

/// k-way merge. Holds the current head of each input.
struct MergeSorted<T, F> {
    inputs: Vec<Sequence<T>>,
    heads: Vec<Option<T>>,
    primed: bool,
    compare: F,
}

impl<T, F> Source<T> for MergeSorted<T, F>
where
    T: Send + 'static,
    F: FnMut(&T, &T) -> Ordering + Send,
{
    fn pull(&mut self) -> Option<T> {
        if !self.primed {
            self.heads = self.inputs.iter_mut().map(|input| input.next()).collect();
            self.primed = true;
        }

        // Linear scan: the number of inputs is small next to the element count.
        // Strict `Less` keeps ties in input order.
        let mut best: Option<usize> = None;
        for (i, head) in self.heads.iter().enumerate() {
            let Some(candidate) = head else { continue };
            best = match best {
                Some(b) => match &self.heads[b] {
                    Some(current) if (self.compare)(candidate, current) != Ordering::Less => {
                        Some(b)
                    }
                    _ => Some(i),
                },
                None => Some(i),
            };
        }

        let index = best?;
        let refill = self.inputs[index].next();
        std::mem::replace(&mut self.heads[index], refill)
    }

    fn close(&mut self) {
        self.heads.clear();
        for input in &mut self.inputs {
            input.close();
        }
    }
}

struct GroupSorted<T, P> {
    upstream: Sequence<T>,
    adjacent: P,
}

impl<T, P> Source<Vec<T>> for GroupSorted<T, P>
where
    T: Send + 'static,
    P: FnMut(&T, &T) -> bool + Send,
{
    fn pull(&mut self) -> Option<Vec<T>> {
        let mut group = vec![self.upstream.next()?];
        loop {
            let next = {
                let last = &group[group.len() - 1];
                let adjacent = &mut self.adjacent;
                self.upstream.next_if(|cur| adjacent(last, cur))
            };
            match next {
                Some(item) => group.push(item),
                None => return Some(group),
            }
        }
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

impl<T: PartialEq + Send + 'static> Sequence<T> {
    /// Collapse runs of equal elements, keeping the last element of each run.
    pub fn dedup_sorted(self) -> Sequence<T> {
        Sequence::from_source(DedupSorted { upstream: self })
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Elements of `self` whose key does not appear in `other`.
    ///
    /// `other` is only advanced past heads smaller than the current element of
    /// `self`. Duplicates in `self` are tested one by one against the same
    /// head of `other`, so either all copies are kept or all are removed.
    pub fn diff_sorted_by<F>(self, other: Sequence<T>, compare: F) -> Sequence<T>
    where
        F: FnMut(&T, &T) -> Ordering + Send + 'static,
    {
        Sequence::from_source(DiffSorted {
            left: self,
            right: other,
            compare,
        })
    }

    /// One element per key present in both inputs: the first of the matching
    /// run in `self`. The matching runs of both inputs are consumed.
    pub fn intersect_sorted_by<F>(self, other: Sequence<T>, compare: F) -> Sequence<T>
    where
        F: FnMut(&T, &T) -> Ordering + Send + 'static,
    {
        Sequence::from_source(IntersectSorted {
            left: self,
            right: other,
            compare,
        })
    }

    /// Merge `self` and `others` into one ascending sequence. Duplicates are
    /// preserved; equal elements come out in input order.
    pub fn merge_sorted_by<F>(self, others: Vec<Sequence<T>>, compare: F) -> Sequence<T>
    where
        F: FnMut(&T, &T) -> Ordering + Send + 'static,
    {
        let mut inputs = Vec::with_capacity(others.len() + 1);
        inputs.push(self);
        inputs.extend(others);
        Sequence::from_source(MergeSorted {
            heads: Vec::new(),
            inputs,
            primed: false,
            compare,
        })
    }

    /// Group consecutive elements while `adjacent(previous, current)` holds.
    pub fn group_sorted<P>(self, adjacent: P) -> Sequence<Vec<T>>
    where
        P: FnMut(&T, &T) -> bool + Send + 'static,
    {
        Sequence::from_source(GroupSorted {
            upstream: self,
            adjacent,
        })
    }
}

impl<T: Ord + Send + 'static> Sequence<T> {
    pub fn diff_sorted(self, other: Sequence<T>) -> Sequence<T> {
        self.diff_sorted_by(other, Ord::cmp)
    }

    pub fn intersect_sorted(self, other: Sequence<T>) -> Sequence<T> {
        self.intersect_sorted_by(other, Ord::cmp)
    }

    pub fn merge_sorted(self, others: Vec<Sequence<T>>) -> Sequence<T> {
        self.merge_sorted_by(others, Ord::cmp)
    }
}
