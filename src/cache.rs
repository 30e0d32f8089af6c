use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};

use crate::error::LoadError;

/// What the cache remembers for a key: the value, or the error its batch failed with.
pub type CachedResult<V> = Result<V, LoadError>;

/// Memoizes resolved keys for the lifetime of one loader, which is one inbound request. There
/// is no eviction.
pub trait Cache {
    type K;
    type V;

    fn get(&self, key: &Self::K) -> Option<&CachedResult<Self::V>>;

    fn insert(&mut self, key: Self::K, value: CachedResult<Self::V>);
    fn insert_many<I: IntoIterator<Item = (Self::K, CachedResult<Self::V>)>>(&mut self, entries: I);

    fn remove(&mut self, key: &Self::K);
    fn flush(&mut self);
}

impl<K, V, S: BuildHasher> Cache for HashMap<K, CachedResult<V>, S>
where
    K: Eq + Hash,
{
    type K = K;
    type V = V;

    fn get(&self, key: &Self::K) -> Option<&CachedResult<Self::V>> {
        HashMap::get(self, key)
    }

    fn insert(&mut self, key: Self::K, value: CachedResult<Self::V>) {
        HashMap::insert(self, key, value);
    }

    fn insert_many<I: IntoIterator<Item = (Self::K, CachedResult<Self::V>)>>(&mut self, entries: I) {
        for (key, value) in entries.into_iter() {
            HashMap::insert(self, key, value);
        }
    }

    fn remove(&mut self, key: &Self::K) {
        HashMap::remove(self, key);
    }

    fn flush(&mut self) {
        self.clear();
    }
}
