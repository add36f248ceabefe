//! Error types for the LRU pools

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool is not bound to a manager - call init() first")]
    NotInitialized,
}

/// A rejected push. Ownership of the object goes back to the caller.
///
/// # Examples
///
/// ```
/// use lru_objectpool::{LruPool, PoolError};
///
/// let mut pool: LruPool<u32, String> = LruPool::new();
/// let err = pool.push(1, "buffer".to_string()).unwrap_err();
///
/// assert_eq!(err.error(), PoolError::NotInitialized);
/// assert_eq!(err.into_inner(), "buffer");
/// ```
#[derive(Error)]
#[error("{error}")]
pub struct PushError<T> {
    error: PoolError,
    object: T,
}

impl<T> PushError<T> {
    pub(crate) fn new(error: PoolError, object: T) -> Self {
        Self { error, object }
    }

    /// The reason the push was rejected
    pub fn error(&self) -> PoolError {
        self.error
    }

    /// Take back the object that was not pooled
    pub fn into_inner(self) -> T {
        self.object
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<T> From<PushError<T>> for PoolError {
    fn from(err: PushError<T>) -> Self {
        err.error
    }
}
