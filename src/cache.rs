//! Build-once image caches keyed by configuration values.

use std::borrow::Borrow;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

/// Map from a key to a value built on first request.
///
/// Entries stay put until removed, so references handed out by
/// [`ImageCache::get_or_insert_with`] stay valid for as long as the cache is
/// not mutated. `builds` counts how many times a value was actually built,
/// which is what callers inspect to confirm repeated lookups hit the cache.
#[derive(Debug)]
pub struct ImageCache<K, V> {
    entries: HashMap<K, V>,
    builds: usize,
}

impl<K, V> Default for ImageCache<K, V> {
    fn default() -> Self {
        ImageCache { entries: HashMap::new(), builds: 0 }
    }
}

impl<K: Hash + Eq, V> ImageCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Return the cached value for `key`, building it with `build` on a miss.
    pub fn get_or_insert_with<Q, F>(&mut self, key: &Q, build: F) -> &V
    where
        K: Borrow<Q>,
        Q: ToOwned<Owned = K> + Hash + Eq + ?Sized,
        F: FnOnce() -> V,
    {
        if !self.entries.contains_key(key) {
            return self.insert(key.to_owned(), build());
        }
        &self.entries[key]
    }

    /// Store a value under a key that is not cached yet. Two distinct
    /// configurations must never share a key, so a collision is a bug.
    pub fn insert(&mut self, key: K, value: V) -> &V {
        self.builds += 1;
        match self.entries.entry(key) {
            Entry::Vacant(slot) => slot.insert(value),
            Entry::Occupied(mut slot) => {
                debug_assert!(false, "image cache key inserted twice");
                slot.insert(value);
                slot.into_mut()
            }
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key)
    }

    /// Drop every entry `stale` returns true for; returns how many went.
    pub fn invalidate(&mut self, mut stale: impl FnMut(&K, &V) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, v| !stale(k, v));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of values built since the cache was created.
    pub fn builds(&self) -> usize {
        self.builds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_once_per_key() {
        let mut cache: ImageCache<String, usize> = ImageCache::new();
        assert_eq!(*cache.get_or_insert_with("a", || 1), 1);
        assert_eq!(*cache.get_or_insert_with("a", || panic!("rebuilt")), 1);
        assert_eq!(*cache.get_or_insert_with("b", || 2), 2);
        assert_eq!(cache.builds(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn repeated_lookups_return_same_entry() {
        let mut cache: ImageCache<u32, Vec<u8>> = ImageCache::new();
        let first = cache.get_or_insert_with(&7, || vec![1, 2, 3]) as *const Vec<u8>;
        let second = cache.get_or_insert_with(&7, Vec::new) as *const Vec<u8>;
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn invalidate_drops_matching_entries() {
        let mut cache: ImageCache<u32, u32> = ImageCache::new();
        for i in 0..6 {
            cache.get_or_insert_with(&i, || i * 10);
        }
        assert_eq!(cache.invalidate(|k, _| k % 2 == 0), 3);
        assert_eq!(cache.len(), 3);
        assert!(cache.get(&2).is_none());
        assert_eq!(cache.get(&3), Some(&30));

        // Rebuilding counts as a fresh build.
        cache.get_or_insert_with(&2, || 99);
        assert_eq!(cache.builds(), 7);
    }

    #[test]
    fn insert_and_remove() {
        let mut cache: ImageCache<String, u8> = ImageCache::new();
        cache.insert("x".to_string(), 4);
        assert_eq!(cache.remove("x"), Some(4));
        assert!(cache.is_empty());
        cache.clear();
        assert_eq!(cache.builds(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "inserted twice")]
    fn colliding_insert_is_caught() {
        let mut cache: ImageCache<u32, u32> = ImageCache::new();
        cache.get_or_insert_with(&1, || 1);
        cache.insert(1, 2);
    }
}
