//! The lazy pull engine.
//!
//! A [`Sequence`] is an ordered, single-pass, possibly infinite series of
//! elements produced on demand by a boxed [`Source`]. Every operator consumes
//! its input sequence and returns a new one that pulls from it, so a cursor
//! can never be shared between two views: duplicating a sequence requires
//! materializing it first.
//!
//! # Resource release
//!
//! Whenever a source reports end-of-data, the sequence observing it closes
//! the whole upstream chain, so draining a sequence always releases files and
//! child processes without client action. A sequence abandoned early releases
//! its resources when dropped; [`Sequence::close`] does it explicitly.

mod ops;
mod terminal;

pub use ops::{
    Concat, DropWhile, Filter, FilterMap, FlatMap, Index, Inspect, Map, Skip, Take, TakeWhile,
    Zip,
};

use crate::handle::{Release, ResourceHandle};

/// Producer behind a [`Sequence`].
///
/// `pull` returns the next element or `None` once the source is exhausted.
/// `close` releases whatever the source owns; it may be called more than once
/// and after exhaustion, and must be a no-op the second time.
pub trait Source<T>: Send {
    fn pull(&mut self) -> Option<T>;

    fn close(&mut self) {}
}

/// A lazy, pull-based, single-pass sequence of `T`.
///
/// `Sequence` implements [`Iterator`], so it works with `for` loops and the
/// standard adapters; the inherent operators (`map`, `filter`, `take`, ...)
/// keep the result a `Sequence` and propagate `close` upstream.
pub struct Sequence<T> {
    source: Box<dyn Source<T>>,
    peeked: Option<T>,
    closed: bool,
}

/// Source over any `Send` iterator. Closing drops the iterator.
struct IterSource<I> {
    iter: Option<I>,
}

impl<I> Source<I::Item> for IterSource<I>
where
    I: Iterator + Send,
{
    fn pull(&mut self) -> Option<I::Item> {
        self.iter.as_mut()?.next()
    }

    fn close(&mut self) {
        self.iter = None;
    }
}

/// Source reading from an owned resource through a caller-supplied step.
struct ResourceSource<R: Release, F> {
    handle: ResourceHandle<R>,
    read: F,
}

impl<T, R, F> Source<T> for ResourceSource<R, F>
where
    R: Release + Send,
    F: FnMut(&mut R) -> Option<T> + Send,
{
    fn pull(&mut self) -> Option<T> {
        let resource = self.handle.get_mut()?;
        let item = (self.read)(resource);
        if item.is_none() {
            self.handle.close_logged();
        }
        item
    }

    fn close(&mut self) {
        self.handle.close_logged();
    }
}

/// Iterator paired with the resource it reads from. The resource is released
/// when the iterator ends or the source is closed.
struct WithResource<I, R: Release> {
    iter: Option<I>,
    handle: ResourceHandle<R>,
}

impl<I, R> Source<I::Item> for WithResource<I, R>
where
    I: Iterator + Send,
    R: Release + Send,
{
    fn pull(&mut self) -> Option<I::Item> {
        let item = self.iter.as_mut()?.next();
        if item.is_none() {
            self.close();
        }
        item
    }

    fn close(&mut self) {
        self.iter = None;
        self.handle.close_logged();
    }
}

struct FromFn<F> {
    next: F,
}

impl<T, F> Source<T> for FromFn<F>
where
    F: FnMut() -> Option<T> + Send,
{
    fn pull(&mut self) -> Option<T> {
        (self.next)()
    }
}

struct Iterate<T, F> {
    state: Option<T>,
    step: F,
}

impl<T, F> Source<T> for Iterate<T, F>
where
    T: Send,
    F: FnMut(&T) -> T + Send,
{
    fn pull(&mut self) -> Option<T> {
        let current = self.state.take()?;
        self.state = Some((self.step)(&current));
        Some(current)
    }

    fn close(&mut self) {
        self.state = None;
    }
}

impl<T: Send + 'static> Sequence<T> {
    /// Wrap a custom [`Source`].
    pub fn from_source<S>(source: S) -> Self
    where
        S: Source<T> + 'static,
    {
        Self {
            source: Box::new(source),
            peeked: None,
            closed: false,
        }
    }

    /// Lazily pull from an iterator.
    pub fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::from_source(IterSource {
            iter: Some(iter.into_iter()),
        })
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self::from_iter(items)
    }

    pub fn empty() -> Self {
        Self::from_iter(std::iter::empty())
    }

    pub fn once(item: T) -> Self {
        Self::from_iter(std::iter::once(item))
    }

    /// Produce elements from a closure until it returns `None`.
    pub fn from_fn<F>(next: F) -> Self
    where
        F: FnMut() -> Option<T> + Send + 'static,
    {
        Self::from_source(FromFn { next })
    }

    /// Infinite sequence `seed, step(seed), step(step(seed)), ...`.
    pub fn iterate<F>(seed: T, step: F) -> Self
    where
        F: FnMut(&T) -> T + Send + 'static,
    {
        Self::from_source(Iterate {
            state: Some(seed),
            step,
        })
    }

    /// Read elements out of an owned resource.
    ///
    /// `read` is called once per pull; returning `None` ends the sequence and
    /// releases the resource. Closing or dropping the sequence early releases
    /// it as well.
    pub fn from_resource<R, F>(handle: ResourceHandle<R>, read: F) -> Self
    where
        R: Release + Send + 'static,
        F: FnMut(&mut R) -> Option<T> + Send + 'static,
    {
        Self::from_source(ResourceSource { handle, read })
    }

    /// Pull from `iter`, releasing `handle` once it ends.
    ///
    /// For iterators that borrow nothing from the resource but depend on it
    /// staying alive, such as a lock file or a server-side cursor.
    pub fn with_resource<I, R>(iter: I, handle: ResourceHandle<R>) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
        R: Release + Send + 'static,
    {
        Self::from_source(WithResource {
            iter: Some(iter.into_iter()),
            handle,
        })
    }

    /// Pull the next element, closing the upstream chain on exhaustion.
    fn advance(&mut self) -> Option<T> {
        if self.closed {
            return None;
        }
        match self.source.pull() {
            Some(item) => Some(item),
            None => {
                self.close();
                None
            }
        }
    }

    /// Look at the next element without consuming it.
    pub fn peek(&mut self) -> Option<&T> {
        if self.peeked.is_none() {
            self.peeked = self.advance();
        }
        self.peeked.as_ref()
    }

    /// True if another element is available. Pulls at most one element ahead.
    pub fn has_next(&mut self) -> bool {
        self.peek().is_some()
    }

    /// Consume the next element only if it satisfies `accept`.
    pub fn next_if(&mut self, accept: impl FnOnce(&T) -> bool) -> Option<T> {
        match self.peek() {
            Some(item) if accept(item) => self.peeked.take(),
            _ => None,
        }
    }

    /// Release the upstream chain. Idempotent; afterwards the sequence is
    /// exhausted and any peeked element is discarded.
    pub fn close(&mut self) {
        self.peeked = None;
        if !self.closed {
            self.closed = true;
            self.source.close();
        }
    }

    /// True once the sequence has been closed, either explicitly or because
    /// its source reported end-of-data.
    pub fn is_closed(&self) -> bool {
        self.closed && self.peeked.is_none()
    }
}

impl<T: Clone + Send + 'static> Sequence<T> {
    /// Infinite sequence of clones of `item`.
    pub fn repeat(item: T) -> Self {
        Self::from_iter(std::iter::repeat(item))
    }
}

impl<T: Send + 'static> Iterator for Sequence<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        match self.peeked.take() {
            Some(item) => Some(item),
            None => self.advance(),
        }
    }
}

/// A sequence is itself a source, which is how operators chain.
impl<T: Send + 'static> Source<T> for Sequence<T> {
    fn pull(&mut self) -> Option<T> {
        Iterator::next(self)
    }

    fn close(&mut self) {
        Sequence::close(self);
    }
}

impl<T> std::fmt::Debug for Sequence<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequence")
            .field("closed", &self.closed)
            .field("peeked", &self.peeked.is_some())
            .finish()
    }
}
