use async_trait::async_trait;

/// A `BatchFunction` defines the method through which some `Loader` fetches batched data from
/// the backing store. It receives the distinct keys collected in the loader's most recent batch
/// and some user defined context struct (usually a connection pool).
///
/// The function returns loaded key value pairs, in any order it chooses. Requesters of keys
/// whose values are not returned receive `V::default()`, so aggregate loaders (tallies, pages)
/// resolve an empty entity instead of an error.
///
/// Returning `Err` fails the whole batch: every pending `load` whose key was part of it
/// receives the same [`LoadError::Fetch`](crate::LoadError::Fetch).
///
/// Multiple `BatchFunctions` (and therefore loaders) can share the same context (likely through
/// an `Arc` or a cloneable pool handle).
#[async_trait]
pub trait BatchFunction<K, V> {
    type Context;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn load(keys: &[K], context: &Self::Context) -> Result<Vec<(K, V)>, Self::Error>;
}
