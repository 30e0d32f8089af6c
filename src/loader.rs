use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Drop;
use std::sync::Arc;

use futures::future;
use tokio::sync::mpsc;

use crate::{
    batch_function::BatchFunction,
    cache::CachedResult,
    config::LoaderSettings,
    error::LoadError,
    loader_op::{LoadRequest, LoaderOp},
    loader_worker::LoaderWorker,
};

/// Batch loads values from the backing store, primarily intended for mitigating GraphQL's N+1
/// problem. One `Loader` lives for one inbound request.
///
/// Users call [`Loader::load`] and [`Loader::load_many`] to fetch values from the underlying
/// resource or cache. Values can be added to the cache out-of-band with [`Loader::prime`] and
/// dropped from it with [`Loader::clear`] and [`Loader::clear_all`].
///
/// The `Loader` struct acts as an intermediary between the async domain in which `load` calls are
/// invoked and the pseudo-single-threaded domain of the `LoaderWorker`. Callers can invoke the
/// `Loader` from multiple parallel tasks, and the loader will enqueue the requested operations on
/// the request queue for processing by its `LoaderWorker`. The worker batches keys and provides
/// results via response oneshot channels back to the Loader.
///
/// Dropping the `Loader` aborts its worker. Loads still waiting at that point resolve to
/// [`LoadError::Cancelled`].
pub struct Loader<K, V>
where
    K: 'static + Eq + Debug + Copy + Send,
    V: 'static + Send + Debug + Clone,
{
    request_tx: mpsc::UnboundedSender<LoaderOp<K, V>>,
    load_task_handle: tokio::task::JoinHandle<()>,
}

impl<K, V> Drop for Loader<K, V>
where
    K: 'static + Eq + Debug + Copy + Send,
    V: 'static + Send + Debug + Clone,
{
    fn drop(&mut self) {
        self.load_task_handle.abort();
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Hash + Debug + Copy + Send + Sync,
    V: 'static + Send + Debug + Clone + Default,
{
    /// Creates a new Loader with default batching settings for the provided BatchFunction and
    /// Context type. Must be called from within a tokio runtime.
    ///
    /// Note: the batch function is passed in as a marker for type inference.
    pub fn new<F, ContextT>(batch_function: F, context: ContextT) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        Self::with_settings(batch_function, Arc::new(context), LoaderSettings::default())
    }

    /// Creates a new Loader sharing `context` with other loaders and batching per `settings`.
    pub fn with_settings<F, ContextT>(
        _: F,
        context: Arc<ContextT>,
        settings: LoaderSettings,
    ) -> Self
    where
        ContextT: Send + Sync + 'static,
        F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = LoaderWorker::<K, V, F, HashMap<K, CachedResult<V>>, ContextT>::new(
            HashMap::new(),
            rx,
            context,
            settings,
        );
        Self { request_tx: tx, load_task_handle: tokio::task::spawn(worker.start()) }
    }
}

impl<K, V> Loader<K, V>
where
    K: 'static + Eq + Debug + Copy + Send + Sync,
    V: 'static + Send + Debug + Clone,
{
    /// Loads a value from the underlying resource.
    ///
    /// If the key is already in the loader cache, the cached value (or cached error) is returned
    /// as soon as the request is processed. Otherwise the key joins the open batch and the call
    /// suspends until that batch is resolved. Keys the batch function did not return resolve to
    /// `V::default()`.
    pub async fn load(&self, key: K) -> Result<V, LoadError> {
        let (request, response_rx) = LoadRequest::new(key);
        if self.request_tx.send(LoaderOp::Load(request)).is_err() {
            return Err(LoadError::Cancelled);
        }
        response_rx.await.unwrap_or(Err(LoadError::Cancelled))
    }

    /// Loads many values at once. Results are in the order of `keys`.
    ///
    /// Every key is requested concurrently, so keys that are not cached land in the same batch
    /// (unless it fills up).
    pub async fn load_many(&self, keys: Vec<K>) -> Vec<Result<V, LoadError>> {
        future::join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Adds a value to the cache.
    pub fn prime(&self, key: K, value: V) {
        if self.request_tx.send(LoaderOp::Prime(key, value)).is_err() {
            tracing::debug!(?key, "prime on a stopped loader");
        }
    }

    /// Removes a value from the cache.
    ///
    /// This key will be reloaded when it is next requested.
    pub fn clear(&self, key: K) {
        if self.request_tx.send(LoaderOp::Clear(key)).is_err() {
            tracing::debug!(?key, "clear on a stopped loader");
        }
    }

    /// Empties the cache. Every key is reloaded when it is next requested.
    pub fn clear_all(&self) {
        if self.request_tx.send(LoaderOp::ClearAll).is_err() {
            tracing::debug!("clear_all on a stopped loader");
        }
    }

    /// Stops the worker. Pending and future loads resolve to [`LoadError::Cancelled`]; a batch
    /// function that is already running is dropped at its next await point.
    pub fn cancel(&self) {
        self.load_task_handle.abort();
    }
}
