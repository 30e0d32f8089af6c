mod batch;
mod batch_function;
mod cache;
pub mod config;
mod error;
mod loader;
mod loader_op;
mod loader_worker;
pub mod loaders;
pub mod model;
mod registry;
pub mod resolvers;
pub mod validate;
#[cfg(feature = "stats")]
mod worker_stats;

pub use batch_function::BatchFunction;
pub use config::{Config, LoaderConfig, LoaderKind, LoaderSettings};
pub use error::{Error, LoadError, Result};
pub use loader::Loader;
pub use registry::{LoaderRegistry, Loaders, RequestContext, LOADERS_KEY};
