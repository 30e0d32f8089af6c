use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::mem;

use crate::{cache::CachedResult, error::LoadError, loader_op::LoadRequest};

/// The open batch of a loader: pending requests collected since the last flush.
///
/// Keys are deduplicated as they arrive. Each distinct key gets a slot index, and every pending
/// request remembers the slot of its key, so the result for a key is matched back to every
/// request that asked for it regardless of the order the batch function answers in.
#[derive(Debug)]
pub struct Batch<K, V> {
    keys: Vec<K>,
    slots: HashMap<K, usize>,
    requests: Vec<(usize, LoadRequest<K, V>)>,
}

impl<K, V> Default for Batch<K, V> {
    fn default() -> Self {
        Self { keys: Vec::new(), slots: HashMap::new(), requests: Vec::new() }
    }
}

impl<K, V> Batch<K, V>
where
    K: Eq + Hash + Copy + Debug,
    V: Send + Debug,
{
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Number of distinct keys, which is what the batch function will receive.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Appends a pending request. Returns true if it is the first request of a fresh batch.
    pub fn push(&mut self, request: LoadRequest<K, V>) -> bool {
        let first = self.requests.is_empty();
        let keys = &mut self.keys;
        let slot = *self.slots.entry(request.key).or_insert_with(|| {
            keys.push(request.key);
            keys.len() - 1
        });
        self.requests.push((slot, request));
        first
    }

    /// Closes this batch and leaves an empty one in its place.
    pub fn seal(&mut self) -> SealedBatch<K, V> {
        let Batch { keys, slots, requests } = mem::take(self);
        SealedBatch { keys, slots, requests }
    }
}

/// A batch that no longer accepts keys and is waiting on its batch function.
#[derive(Debug)]
pub struct SealedBatch<K, V> {
    keys: Vec<K>,
    slots: HashMap<K, usize>,
    requests: Vec<(usize, LoadRequest<K, V>)>,
}

impl<K, V> SealedBatch<K, V>
where
    K: Eq + Hash + Copy + Debug,
    V: Send + Debug + Clone + Default,
{
    /// Distinct keys, in the order they were first requested.
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Delivers the batch function's outcome to every pending request and returns the entries
    /// the cache should remember, one per distinct key.
    ///
    /// An error fails every request in the batch. On success keys the batch function did not
    /// return resolve to `V::default()`.
    pub fn resolve(self, outcome: Result<Vec<(K, V)>, LoadError>) -> Vec<(K, CachedResult<V>)> {
        let SealedBatch { keys, slots, requests } = self;

        let resolved: Vec<CachedResult<V>> = match outcome {
            Err(error) => keys.iter().map(|_| Err(error.clone())).collect(),
            Ok(loaded) => {
                let mut values: Vec<Option<V>> = keys.iter().map(|_| None).collect();
                for (key, value) in loaded {
                    match slots.get(&key) {
                        Some(slot) => values[*slot] = Some(value),
                        None => tracing::debug!(?key, "batch function returned an unrequested key"),
                    }
                }
                values.into_iter().map(|value| Ok(value.unwrap_or_default())).collect()
            }
        };

        for (slot, request) in requests {
            request.send_response(resolved[slot].clone());
        }

        keys.into_iter().zip(resolved).collect()
    }
}
