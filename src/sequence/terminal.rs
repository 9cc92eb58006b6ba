//! Terminal materializers. All of them drain the sequence, so all of them
//! leave it closed.

use super::Sequence;
use crate::text::ToLine;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::cmp::Ordering;
use std::hash::Hash;

/// Drain `upstream` and sort with rayon's parallel stable sort.
pub(super) fn sort_parallel<T, F>(upstream: &mut Sequence<T>, compare: &F) -> Vec<T>
where
    T: Send + 'static,
    F: Fn(&T, &T) -> Ordering + Sync,
{
    let mut items: Vec<T> = upstream.by_ref().collect();
    items.par_sort_by(compare);
    items
}

impl<T: Send + 'static> Sequence<T> {
    pub fn to_list(self) -> Vec<T> {
        self.collect()
    }

    pub fn to_sorted_list_by<F>(mut self, compare: F) -> Vec<T>
    where
        F: Fn(&T, &T) -> Ordering + Sync,
    {
        sort_parallel(&mut self, &compare)
    }

    /// The first element; the rest of the sequence is closed unread.
    pub fn first(mut self) -> Option<T> {
        let item = self.next();
        self.close();
        item
    }
}

impl<T: Ord + Send + 'static> Sequence<T> {
    pub fn to_sorted_list(self) -> Vec<T> {
        self.to_sorted_list_by(Ord::cmp)
    }
}

impl<T: Eq + Hash + Send + 'static> Sequence<T> {
    pub fn to_set(self) -> FxHashSet<T> {
        self.collect()
    }
}

impl<T: ToLine + Send + 'static> Sequence<T> {
    /// Concatenate the text form of every element, separated by `separator`.
    pub fn join(self, separator: &str) -> String {
        let mut out = String::new();
        for (i, item) in self.enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            out.push_str(&item.to_line());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_list_closes() {
        let mut seq = Sequence::from_vec(vec![1, 2, 3]);
        let items: Vec<i32> = seq.by_ref().collect();
        assert_eq!(items, vec![1, 2, 3]);
        assert!(seq.is_closed());
    }

    #[test]
    fn test_to_set() {
        let set = Sequence::from_vec(vec![1, 2, 2, 3]).to_set();
        assert_eq!(set.len(), 3);
        assert!(set.contains(&2));
    }

    #[test]
    fn test_to_sorted_list() {
        let sorted = Sequence::from_vec(vec!["b", "c", "a"]).to_sorted_list();
        assert_eq!(sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_to_sorted_list_is_stable() {
        let pairs = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let sorted = Sequence::from_vec(pairs).to_sorted_list_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(sorted, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn test_join() {
        assert_eq!(Sequence::from_iter(1..=3).join(","), "1,2,3");
        assert_eq!(Sequence::<u8>::empty().join(","), "");
    }

    #[test]
    fn test_first() {
        assert_eq!(Sequence::from_iter(5..).first(), Some(5));
        assert_eq!(Sequence::<u8>::empty().first(), None);
    }
}
