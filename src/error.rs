use std::sync::Arc;

use thiserror::Error;

/// Message shown to clients when a lookup matched no rows.
pub const NOT_FOUND_MESSAGE: &str = "No matching data found in database";
/// Message shown to clients for every failure whose details must stay server-side.
pub const UNAVAILABLE_MESSAGE: &str = "data unavailable";

/// Failure delivered to a `load` caller.
///
/// Cloneable so that one fetch failure can be handed to every request in the batch. All the
/// callers of a failed batch share the same underlying error through the `Arc`.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// The batch function failed for the batch this key was part of.
    #[error("batch fetch failed: {0}")]
    Fetch(Arc<dyn std::error::Error + Send + Sync + 'static>),
    /// The loader was cancelled or dropped before the key was resolved.
    #[error("load cancelled before the batch was resolved")]
    Cancelled,
}

impl LoadError {
    pub(crate) fn fetch<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        LoadError::Fetch(Arc::new(error))
    }

    /// Returns true when both errors originate from the same failed batch.
    pub fn same_failure(&self, other: &LoadError) -> bool {
        match (self, other) {
            (LoadError::Fetch(a), LoadError::Fetch(b)) => Arc::ptr_eq(a, b),
            (LoadError::Cancelled, LoadError::Cancelled) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A resolver asked for the loaders before the registry attached them to the request.
    #[error("dataloaders are not attached to the request context")]
    LoadersUnavailable,

    #[error(transparent)]
    Load(#[from] LoadError),

    /// Input rejected by one of the validation helpers. The message is client-safe.
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Text that may be returned to a client. Validation failures pass through, missing rows
    /// get a generic not-found message and anything else is hidden.
    pub fn public_message(&self) -> &str {
        match self {
            Error::Validation(message) => message.as_str(),
            Error::Database(sqlx::Error::RowNotFound) => NOT_FOUND_MESSAGE,
            Error::Load(LoadError::Fetch(source)) => {
                match source.downcast_ref::<sqlx::Error>() {
                    Some(sqlx::Error::RowNotFound) => NOT_FOUND_MESSAGE,
                    _ => UNAVAILABLE_MESSAGE,
                }
            }
            _ => UNAVAILABLE_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_public() {
        let err = Error::Validation("Must use a valid email address".to_owned());
        assert_eq!(err.public_message(), "Must use a valid email address");
    }

    #[test]
    fn missing_rows_report_not_found() {
        assert_eq!(Error::Database(sqlx::Error::RowNotFound).public_message(), NOT_FOUND_MESSAGE);
        let err = Error::Load(LoadError::fetch(sqlx::Error::RowNotFound));
        assert_eq!(err.public_message(), NOT_FOUND_MESSAGE);
    }

    #[test]
    fn other_failures_are_hidden() {
        assert_eq!(Error::LoadersUnavailable.public_message(), UNAVAILABLE_MESSAGE);
        assert_eq!(Error::Load(LoadError::Cancelled).public_message(), UNAVAILABLE_MESSAGE);
        let err = Error::Load(LoadError::fetch(sqlx::Error::PoolTimedOut));
        assert_eq!(err.public_message(), UNAVAILABLE_MESSAGE);
    }

    #[test]
    fn same_failure_compares_batches() {
        let a = LoadError::fetch(sqlx::Error::PoolTimedOut);
        let b = a.clone();
        let c = LoadError::fetch(sqlx::Error::PoolTimedOut);
        assert!(a.same_failure(&b));
        assert!(!a.same_failure(&c));
        assert!(!a.same_failure(&LoadError::Cancelled));
    }
}
