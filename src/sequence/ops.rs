//! Lazy base operators.
//!
//! Each operator owns its upstream sequence, does work only when pulled, and
//! forwards `close` to everything it owns.

use super::{Sequence, Source};
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::hash::Hash;

pub struct Map<T, F> {
    upstream: Sequence<T>,
    f: F,
}

impl<T, U, F> Source<U> for Map<T, F>
where
    T: Send + 'static,
    F: FnMut(T) -> U + Send,
{
    fn pull(&mut self) -> Option<U> {
        self.upstream.next().map(&mut self.f)
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct Filter<T, P> {
    upstream: Sequence<T>,
    predicate: P,
}

impl<T, P> Source<T> for Filter<T, P>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send,
{
    fn pull(&mut self) -> Option<T> {
        loop {
            let item = self.upstream.next()?;
            if (self.predicate)(&item) {
                return Some(item);
            }
        }
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct FilterMap<T, F> {
    upstream: Sequence<T>,
    f: F,
}

impl<T, U, F> Source<U> for FilterMap<T, F>
where
    T: Send + 'static,
    F: FnMut(T) -> Option<U> + Send,
{
    fn pull(&mut self) -> Option<U> {
        loop {
            let item = self.upstream.next()?;
            if let Some(mapped) = (self.f)(item) {
                return Some(mapped);
            }
        }
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct FlatMap<T, F, C: IntoIterator> {
    upstream: Sequence<T>,
    f: F,
    current: Option<C::IntoIter>,
}

impl<T, U, F, C> Source<U> for FlatMap<T, F, C>
where
    T: Send + 'static,
    F: FnMut(T) -> C + Send,
    C: IntoIterator<Item = U>,
    C::IntoIter: Send,
{
    fn pull(&mut self) -> Option<U> {
        loop {
            if let Some(inner) = self.current.as_mut() {
                if let Some(item) = inner.next() {
                    return Some(item);
                }
                self.current = None;
            }
            let outer = self.upstream.next()?;
            self.current = Some((self.f)(outer).into_iter());
        }
    }

    fn close(&mut self) {
        self.current = None;
        self.upstream.close();
    }
}

pub struct Inspect<T, F> {
    upstream: Sequence<T>,
    f: F,
}

impl<T, F> Source<T> for Inspect<T, F>
where
    T: Send + 'static,
    F: FnMut(&T) + Send,
{
    fn pull(&mut self) -> Option<T> {
        let item = self.upstream.next()?;
        (self.f)(&item);
        Some(item)
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct Take<T> {
    upstream: Sequence<T>,
    remaining: usize,
}

impl<T: Send + 'static> Source<T> for Take<T> {
    fn pull(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let item = self.upstream.next();
        if self.remaining == 0 {
            // Nothing more will be pulled; release upstream now.
            self.upstream.close();
        }
        item
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct Skip<T> {
    upstream: Sequence<T>,
    remaining: usize,
}

impl<T: Send + 'static> Source<T> for Skip<T> {
    fn pull(&mut self) -> Option<T> {
        while self.remaining > 0 {
            self.remaining -= 1;
            self.upstream.next()?;
        }
        self.upstream.next()
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct TakeWhile<T, P> {
    upstream: Sequence<T>,
    predicate: P,
    done: bool,
}

impl<T, P> Source<T> for TakeWhile<T, P>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send,
{
    fn pull(&mut self) -> Option<T> {
        if self.done {
            return None;
        }
        match self.upstream.next() {
            Some(item) if (self.predicate)(&item) => Some(item),
            _ => {
                self.done = true;
                self.upstream.close();
                None
            }
        }
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct DropWhile<T, P> {
    upstream: Sequence<T>,
    predicate: P,
    dropping: bool,
}

impl<T, P> Source<T> for DropWhile<T, P>
where
    T: Send + 'static,
    P: FnMut(&T) -> bool + Send,
{
    fn pull(&mut self) -> Option<T> {
        if self.dropping {
            self.dropping = false;
            loop {
                let item = self.upstream.next()?;
                if !(self.predicate)(&item) {
                    return Some(item);
                }
            }
        }
        self.upstream.next()
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

pub struct Concat<T> {
    first: Sequence<T>,
    second: Sequence<T>,
}

impl<T: Send + 'static> Source<T> for Concat<T> {
    fn pull(&mut self) -> Option<T> {
        self.first.next().or_else(|| self.second.next())
    }

    fn close(&mut self) {
        self.first.close();
        self.second.close();
    }
}

pub struct Zip<A, B> {
    left: Sequence<A>,
    right: Sequence<B>,
}

impl<A, B> Source<(A, B)> for Zip<A, B>
where
    A: Send + 'static,
    B: Send + 'static,
{
    fn pull(&mut self) -> Option<(A, B)> {
        let a = self.left.next()?;
        let b = self.right.next()?;
        Some((a, b))
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
    }
}

pub struct Index<T> {
    upstream: Sequence<T>,
    position: usize,
}

impl<T: Send + 'static> Source<(usize, T)> for Index<T> {
    fn pull(&mut self) -> Option<(usize, T)> {
        let item = self.upstream.next()?;
        let position = self.position;
        self.position += 1;
        Some((position, item))
    }

    fn close(&mut self) {
        self.upstream.close();
    }
}

/// Buffers the whole upstream on first pull, then yields it sorted.
struct Sorted<T, F> {
    upstream: Sequence<T>,
    compare: F,
    buffer: Option<std::vec::IntoIter<T>>,
}

impl<T, F> Source<T> for Sorted<T, F>
where
    T: Send + 'static,
    F: Fn(&T, &T) -> Ordering + Send + Sync,
{
    fn pull(&mut self) -> Option<T> {
        if self.buffer.is_none() {
            let items = super::terminal::sort_parallel(&mut self.upstream, &self.compare);
            self.buffer = Some(items.into_iter());
        }
        self.buffer.as_mut()?.next()
    }

    fn close(&mut self) {
        self.buffer = None;
        self.upstream.close();
    }
}

/// Drops elements already seen, keeping first occurrences.
struct Distinct<T> {
    upstream: Sequence<T>,
    seen: FxHashSet<T>,
}

impl<T> Source<T> for Distinct<T>
where
    T: Eq + Hash + Clone + Send + 'static,
{
    fn pull(&mut self) -> Option<T> {
        loop {
            let item = self.upstream.next()?;
            if self.seen.insert(item.clone()) {
                return Some(item);
            }
        }
    }

    fn close(&mut self) {
        self.seen.clear();
        self.upstream.close();
    }
}

impl<T: Send + 'static> Sequence<T> {
    pub fn map<U, F>(self, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Sequence::from_source(Map { upstream: self, f })
    }

    pub fn filter<P>(self, predicate: P) -> Sequence<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        Sequence::from_source(Filter {
            upstream: self,
            predicate,
        })
    }

    pub fn filter_map<U, F>(self, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> Option<U> + Send + 'static,
    {
        Sequence::from_source(FilterMap { upstream: self, f })
    }

    /// Map each element to a collection and flatten the results in order.
    pub fn flat_map<U, C, F>(self, f: F) -> Sequence<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> C + Send + 'static,
        C: IntoIterator<Item = U> + 'static,
        C::IntoIter: Send + 'static,
    {
        Sequence::from_source(FlatMap::<T, F, C> {
            upstream: self,
            f,
            current: None,
        })
    }

    pub fn inspect<F>(self, f: F) -> Sequence<T>
    where
        F: FnMut(&T) + Send + 'static,
    {
        Sequence::from_source(Inspect { upstream: self, f })
    }

    /// First `n` elements. Upstream is closed as soon as the n-th is pulled.
    pub fn take(self, n: usize) -> Sequence<T> {
        let mut upstream = self;
        if n == 0 {
            upstream.close();
        }
        Sequence::from_source(Take {
            upstream,
            remaining: n,
        })
    }

    /// Discard the first `n` elements.
    pub fn skip(self, n: usize) -> Sequence<T> {
        Sequence::from_source(Skip {
            upstream: self,
            remaining: n,
        })
    }

    /// Elements up to (excluding) the first that fails `predicate`.
    /// The failing element is consumed and upstream is closed.
    pub fn take_while<P>(self, predicate: P) -> Sequence<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        Sequence::from_source(TakeWhile {
            upstream: self,
            predicate,
            done: false,
        })
    }

    pub fn drop_while<P>(self, predicate: P) -> Sequence<T>
    where
        P: FnMut(&T) -> bool + Send + 'static,
    {
        Sequence::from_source(DropWhile {
            upstream: self,
            predicate,
            dropping: true,
        })
    }

    /// All of `self` followed by all of `other`.
    pub fn concat(self, other: Sequence<T>) -> Sequence<T> {
        Sequence::from_source(Concat {
            first: self,
            second: other,
        })
    }

    /// Pairs elements positionally; ends with the shorter input.
    pub fn zip<U>(self, other: Sequence<U>) -> Sequence<(T, U)>
    where
        U: Send + 'static,
    {
        Sequence::from_source(Zip {
            left: self,
            right: other,
        })
    }

    /// Pair every element with its 0-based position.
    pub fn index(self) -> Sequence<(usize, T)> {
        Sequence::from_source(Index {
            upstream: self,
            position: 0,
        })
    }

    /// Buffering: sorts the whole upstream on first pull.
    pub fn sorted_by<F>(self, compare: F) -> Sequence<T>
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Sequence::from_source(Sorted {
            upstream: self,
            compare,
            buffer: None,
        })
    }
}

impl<T: Ord + Send + 'static> Sequence<T> {
    pub fn sorted(self) -> Sequence<T> {
        self.sorted_by(Ord::cmp)
    }
}

impl<T> Sequence<T>
where
    T: Eq + Hash + Clone + Send + 'static,
{
    /// First occurrence of every distinct element, in order. Buffers the set
    /// of elements seen so far.
    pub fn distinct(self) -> Sequence<T> {
        Sequence::from_source(Distinct {
            upstream: self,
            seen: FxHashSet::default(),
        })
    }
}
