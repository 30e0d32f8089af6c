use tokio::sync::oneshot;

use crate::cache::CachedResult;

/// Set of possible requests that can be sent to the [`LoaderWorker`](crate::loader_worker::LoaderWorker).
#[derive(Debug)]
pub enum LoaderOp<K, V> {
    /// Fetch data from the resource wrapped by this data loader (or the cache).
    Load(LoadRequest<K, V>),
    /// Add a value to the cache that was fetched from elsewhere.
    Prime(K, V),
    /// Remove a value from the cache so that it is reloaded when it is next requested.
    Clear(K),
    /// Empty the cache.
    ClearAll,
}

/// A single pending `load` call: the requested key and the slot its result is delivered on.
#[derive(Debug)]
pub struct LoadRequest<K, V> {
    pub key: K,
    response_tx: oneshot::Sender<CachedResult<V>>,
}

impl<K, V> LoadRequest<K, V>
where
    K: std::fmt::Debug,
    V: Send + std::fmt::Debug,
{
    pub fn new(key: K) -> (Self, oneshot::Receiver<CachedResult<V>>) {
        let (response_tx, response_rx) = oneshot::channel();
        (Self { key, response_tx }, response_rx)
    }

    pub fn send_response(self, response: CachedResult<V>) {
        if let Err(e) = self.response_tx.send(response) {
            tracing::error!(key = ?self.key, ?e, "receiver dropped");
        }
    }
}
