//! Bounded query cache shared by the search and cash-flow stages.

use std::collections::VecDeque;

use crate::search::SearchQuery;

/// FIFO cache of query results: inserting past capacity evicts the
/// oldest-inserted entry. Invalidation is wholesale via `clear`, driven by
/// upstream change notifications.
#[derive(Debug)]
pub(crate) struct BoundedCache<T> {
    entries: VecDeque<(SearchQuery, T)>,
    capacity: usize,
}

impl<T> BoundedCache<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Field-wise query equality, including the period by value.
    pub(crate) fn get(&self, query: &SearchQuery) -> Option<&T> {
        self.entries
            .iter()
            .find(|(cached, _)| cached == query)
            .map(|(_, value)| value)
    }

    pub(crate) fn insert(&mut self, query: SearchQuery, value: T) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((query, value));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(category: &str) -> SearchQuery {
        SearchQuery {
            category_name: Some(category.to_string()),
            ..SearchQuery::default()
        }
    }

    #[test]
    fn evicts_the_oldest_entry_at_capacity() {
        let mut cache = BoundedCache::new(2);
        cache.insert(query("a"), 1);
        cache.insert(query("b"), 2);
        cache.insert(query("c"), 3);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&query("a")), None);
        assert_eq!(cache.get(&query("b")), Some(&2));
        assert_eq!(cache.get(&query("c")), Some(&3));
    }

    #[test]
    fn clear_drops_every_entry() {
        let mut cache = BoundedCache::new(2);
        cache.insert(query("a"), 1);
        cache.clear();
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.get(&query("a")), None);
    }
}
