//! # Request-Scoped Batch Loading
//!
//! Coalesces per-item lookups made while resolving one request into batched
//! fetches, so resolving N parents issues one query for their children
//! instead of N.
//!
//! - [`BatchLoader`] - debounced, memoizing loader for one key/value pair
//! - [`BatchFn`] - the bulk fetch a loader calls
//! - [`CancellationSignal`] - request lifetime shared by all loaders of a request
//!
//! ```rust
//! use async_trait::async_trait;
//! use examhub_core::config::LoaderConfig;
//! use examhub_core::loader::{BatchFn, BatchLoader, CancellationSignal, LoadError};
//!
//! struct Squares;
//!
//! #[async_trait]
//! impl BatchFn<i64, i64> for Squares {
//!     async fn load(&self, keys: &[i64]) -> Result<Vec<Option<i64>>, LoadError> {
//!         Ok(keys.iter().map(|key| Some(key * key)).collect())
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! let loader = BatchLoader::new(
//!     "squares",
//!     Squares,
//!     &LoaderConfig::default(),
//!     CancellationSignal::new(),
//! );
//!
//! let (three, four) = tokio::join!(loader.load(3), loader.load(4));
//! assert_eq!(three, Ok(Some(9)));
//! assert_eq!(four, Ok(Some(16)));
//! assert_eq!(loader.dispatch_count(), 1);
//! # });
//! ```

pub mod batch_loader;
pub mod cancel;

pub use batch_loader::BatchLoader;
pub use cancel::CancellationSignal;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("batch fetch failed: {0}")]
    FetchFailed(String),
    #[error("request was cancelled before the batch completed")]
    Cancelled,
}

impl From<sqlx::Error> for LoadError {
    fn from(error: sqlx::Error) -> Self {
        LoadError::FetchFailed(error.to_string())
    }
}

impl From<crate::error::ExamhubError> for LoadError {
    fn from(error: crate::error::ExamhubError) -> Self {
        match error {
            crate::error::ExamhubError::LoadError(inner) => inner,
            other => LoadError::FetchFailed(other.to_string()),
        }
    }
}

/// Bulk fetch behind a [`BatchLoader`]
///
/// Implementations receive distinct keys and return one entry per key in the
/// same order; `None` marks a key with no row. A shorter result leaves the
/// trailing keys absent.
#[async_trait]
pub trait BatchFn<K, V>: Send + Sync + 'static {
    async fn load(&self, keys: &[K]) -> Result<Vec<Option<V>>, LoadError>;
}

#[async_trait]
impl<K, V, T> BatchFn<K, V> for Arc<T>
where
    K: Sync + 'static,
    V: 'static,
    T: BatchFn<K, V> + ?Sized,
{
    async fn load(&self, keys: &[K]) -> Result<Vec<Option<V>>, LoadError> {
        (**self).load(keys).await
    }
}
