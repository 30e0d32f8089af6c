use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{self, Instant};
use tracing::{span, Level};
use tracing_futures::Instrument;

#[cfg(feature = "stats")]
use crate::worker_stats::WorkerStats;
use crate::{
    batch::{Batch, SealedBatch},
    batch_function::BatchFunction,
    cache::Cache,
    config::LoaderSettings,
    error::LoadError,
    loader_op::LoaderOp,
};

type FetchOutcome<K, V> = (SealedBatch<K, V>, Result<Vec<(K, V)>, LoadError>);

/// A `LoaderWorker` is the "single-thread" worker task that owns the open batch and the cache
/// of one loader.
///
/// Once started, it runs in a loop until the parent Loader aborts its `JoinHandle` or drops the
/// request queue tx channel. Each turn of the loop handles whichever of these happens first:
///
/// 1. An op arrives on the request queue. Prime and Clear ops are applied to the cache. A Load
///    op is answered from the cache if the key is there, otherwise it joins the open batch. The
///    first key of a fresh batch arms the flush deadline, and a batch that reaches
///    `max_batch_size` distinct keys is dispatched on the spot.
/// 2. The flush deadline (`max_wait` after the batch's first key) passes and the open batch is
///    dispatched.
/// 3. A dispatched batch function completes. Its values (or its error) are delivered to every
///    request of that batch and stored in the cache.
///
/// Dispatching seals the open batch, opens an empty one, and pushes the batch function call onto
/// a set of in-flight fetches, so collection continues while earlier batches are loading.
pub struct LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Hash + Debug + Copy + Send + Sync,
    V: 'static + Send + Debug + Clone + Default,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache,
    ContextT: Send + Sync + 'static,
{
    cache: CacheT,
    request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V>>,
    batch: Batch<K, V>,
    deadline: Option<Instant>,
    in_flight: FuturesUnordered<BoxFuture<'static, FetchOutcome<K, V>>>,
    context: Arc<ContextT>,
    settings: LoaderSettings,
    phantom_batch_function: PhantomData<F>,
    debug_name: &'static str,
    #[cfg(feature = "stats")]
    stats: WorkerStats,
}

impl<K, V, F, CacheT, ContextT> LoaderWorker<K, V, F, CacheT, ContextT>
where
    K: 'static + Eq + Hash + Debug + Copy + Send + Sync,
    V: 'static + Send + Debug + Clone + Default,
    F: 'static + BatchFunction<K, V, Context = ContextT> + Send,
    CacheT: Cache<K = K, V = V>,
    ContextT: Send + Sync + 'static,
{
    pub fn new(
        cache: CacheT,
        request_rx: mpsc::UnboundedReceiver<LoaderOp<K, V>>,
        context: Arc<ContextT>,
        settings: LoaderSettings,
    ) -> Self {
        let debug_name = std::any::type_name::<F>();
        Self {
            cache,
            request_rx,
            batch: Batch::default(),
            deadline: None,
            in_flight: FuturesUnordered::new(),
            context,
            settings,
            phantom_batch_function: PhantomData,
            debug_name,
            #[cfg(feature = "stats")]
            stats: WorkerStats::new(debug_name),
        }
    }

    pub async fn start(self) {
        let span = span!(Level::TRACE, "LoaderWorker", loader = self.debug_name);
        self.run().instrument(span).await
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                op = self.request_rx.recv() => match op {
                    None => {
                        tracing::info!("Tx channel closed. Terminating LoaderWorker.");
                        return;
                    }
                    Some(op) => self.mux_op(op),
                },
                _ = time::sleep_until(self.deadline.unwrap_or_else(Instant::now)),
                    if self.deadline.is_some() => self.dispatch(),
                Some((batch, outcome)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.complete(batch, outcome)
                }
            }
        }
    }

    #[tracing::instrument(skip(self))]
    fn mux_op(&mut self, op: LoaderOp<K, V>) {
        match op {
            LoaderOp::Load(request) => {
                #[cfg(feature = "stats")]
                self.stats.record_load_request(1);

                if let Some(cached) = self.cache.get(&request.key) {
                    #[cfg(feature = "stats")]
                    self.stats.record_cache_hits(1);
                    let response = cached.clone();
                    request.send_response(response);
                    return;
                }

                tracing::debug!(key = ?request.key, "queued for batch");
                if self.batch.push(request) {
                    self.deadline = Some(Instant::now() + self.settings.max_wait);
                }
                if self.batch.len() >= self.settings.max_batch_size.max(1) {
                    self.dispatch();
                }
            }
            LoaderOp::Prime(key, value) => self.cache.insert(key, Ok(value)),
            LoaderOp::Clear(key) => self.cache.remove(&key),
            LoaderOp::ClearAll => self.cache.flush(),
        }
    }

    #[tracing::instrument(skip(self))]
    fn dispatch(&mut self) {
        self.deadline = None;
        if self.batch.is_empty() {
            return;
        }

        let batch = self.batch.seal();
        tracing::debug!(keys = ?batch.keys(), requests = batch.request_count(), "dispatching batch");
        #[cfg(feature = "stats")]
        self.stats.record_load_exec(batch.request_count() as u32);

        let context = Arc::clone(&self.context);
        let span = tracing::debug_span!("batch_function", keys = batch.keys().len());
        let fetch = async move {
            let outcome = F::load(batch.keys(), &*context).await.map_err(LoadError::fetch);
            (batch, outcome)
        };
        self.in_flight.push(fetch.instrument(span).boxed());
    }

    fn complete(&mut self, batch: SealedBatch<K, V>, outcome: Result<Vec<(K, V)>, LoadError>) {
        match &outcome {
            Ok(loaded) => tracing::debug!(keys = ?batch.keys(), loaded = loaded.len(), "batch loaded"),
            Err(error) => tracing::debug!(keys = ?batch.keys(), %error, "batch failed"),
        }
        #[cfg(feature = "stats")]
        self.stats.record_load_exec_completed(
            batch.keys().len() as u32,
            outcome.as_ref().map(|loaded| loaded.len() as u32).unwrap_or(0),
        );

        let entries = batch.resolve(outcome);
        self.cache.insert_many(entries);
    }
}
