use super::{BatchFn, CancellationSignal, LoadError};
use crate::config::LoaderConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Notify};
use tracing::{debug, warn};

type LoadResult<V> = Result<Option<V>, LoadError>;

/// Keys collected during one debounce window
struct PendingBatch<K, V> {
    id: u64,
    keys: Vec<K>,
    waiters: HashMap<K, Vec<oneshot::Sender<LoadResult<V>>>>,
    flush: Arc<Notify>,
}

struct LoaderState<K, V> {
    cache: HashMap<K, Option<V>>,
    pending: Option<PendingBatch<K, V>>,
    next_batch_id: u64,
}

struct LoaderInner<K, V> {
    name: &'static str,
    fetch: Arc<dyn BatchFn<K, V>>,
    wait: Duration,
    max_batch: usize,
    cancel: CancellationSignal,
    state: Mutex<LoaderState<K, V>>,
    dispatches: AtomicU64,
}

/// What a caller has to do after enqueueing, decided under the lock
enum Enqueued<K, V> {
    /// Started a new window; a timer must be spawned for it
    Opened { id: u64, flush: Arc<Notify> },
    Joined,
    /// The window reached `max_batch` and was taken for immediate dispatch
    Full(PendingBatch<K, V>),
}

/// Request-scoped, debounced batch loader with memoization
///
/// Concurrent `load` calls within the wait window are coalesced into one call
/// of the [`BatchFn`] with distinct keys. Successful results, including
/// absent ones, are cached for the life of the loader; failures are not, so a
/// later `load` of the same key fetches again.
pub struct BatchLoader<K, V> {
    inner: Arc<LoaderInner<K, V>>,
}

impl<K, V> Clone for BatchLoader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> BatchLoader<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        fetch: impl BatchFn<K, V>,
        config: &LoaderConfig,
        cancel: CancellationSignal,
    ) -> Self {
        Self::from_arc(name, Arc::new(fetch), config, cancel)
    }

    pub fn from_arc(
        name: &'static str,
        fetch: Arc<dyn BatchFn<K, V>>,
        config: &LoaderConfig,
        cancel: CancellationSignal,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                name,
                fetch,
                wait: config.wait(),
                max_batch: config.max_batch,
                cancel,
                state: Mutex::new(LoaderState {
                    cache: HashMap::new(),
                    pending: None,
                    next_batch_id: 0,
                }),
                dispatches: AtomicU64::new(0),
            }),
        }
    }

    /// Resolve one key, joining the current batch window if it is not cached
    pub async fn load(&self, key: K) -> LoadResult<V> {
        let (receiver, enqueued) = {
            let mut state = self.inner.state.lock();
            if let Some(cached) = state.cache.get(&key) {
                return Ok(cached.clone());
            }
            if self.inner.cancel.is_cancelled() {
                return Err(LoadError::Cancelled);
            }

            let (sender, receiver) = oneshot::channel();
            let enqueued = self.inner.enqueue(&mut state, key, sender);
            (receiver, enqueued)
        };

        match enqueued {
            Enqueued::Opened { id, flush } => self.spawn_timer(id, flush),
            Enqueued::Full(batch) => {
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move { inner.dispatch(batch).await });
            }
            Enqueued::Joined => {}
        }

        // A delivered value wins over a cancellation observed in the same poll
        tokio::select! {
            biased;
            result = receiver => result.unwrap_or(Err(LoadError::Cancelled)),
            _ = self.inner.cancel.cancelled() => Err(LoadError::Cancelled),
        }
    }

    /// Resolve several keys, returning results in input order
    pub async fn load_many(&self, keys: Vec<K>) -> Vec<LoadResult<V>> {
        futures::future::join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    /// Seed the cache; an existing entry wins
    pub fn prime(&self, key: K, value: Option<V>) {
        self.inner.state.lock().cache.entry(key).or_insert(value);
    }

    /// Forget a cached result so the next `load` fetches again
    pub fn clear(&self, key: &K) {
        self.inner.state.lock().cache.remove(key);
    }

    /// Dispatch the open window now instead of waiting out the timer
    pub fn flush(&self) {
        if let Some(pending) = &self.inner.state.lock().pending {
            pending.flush.notify_one();
        }
    }

    /// Number of batch function invocations so far
    pub fn dispatch_count(&self) -> u64 {
        self.inner.dispatches.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    fn spawn_timer(&self, id: u64, flush: Arc<Notify>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(inner.wait) => {}
                _ = flush.notified() => {}
                _ = inner.cancel.cancelled() => {}
            }

            let batch = {
                let mut state = inner.state.lock();
                let current = state.pending.as_ref().is_some_and(|p| p.id == id);
                if current {
                    state.pending.take()
                } else {
                    None
                }
            };

            if let Some(batch) = batch {
                inner.dispatch(batch).await;
            }
        });
    }
}

impl<K, V> LoaderInner<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn enqueue(
        &self,
        state: &mut LoaderState<K, V>,
        key: K,
        sender: oneshot::Sender<LoadResult<V>>,
    ) -> Enqueued<K, V> {
        let mut opened = None;
        if state.pending.is_none() {
            let id = state.next_batch_id;
            state.next_batch_id += 1;
            let flush = Arc::new(Notify::new());
            opened = Some((id, Arc::clone(&flush)));
            state.pending = Some(PendingBatch {
                id,
                keys: Vec::new(),
                waiters: HashMap::new(),
                flush,
            });
        }

        let full = match state.pending.as_mut() {
            Some(pending) => {
                if !pending.waiters.contains_key(&key) {
                    pending.keys.push(key.clone());
                }
                pending.waiters.entry(key).or_default().push(sender);
                self.max_batch > 0 && pending.keys.len() >= self.max_batch
            }
            None => false,
        };

        if full {
            if let Some(batch) = state.pending.take() {
                return Enqueued::Full(batch);
            }
        }

        match opened {
            Some((id, flush)) => Enqueued::Opened { id, flush },
            None => Enqueued::Joined,
        }
    }

    async fn dispatch(&self, batch: PendingBatch<K, V>) {
        let PendingBatch {
            id, keys, waiters, ..
        } = batch;

        if self.cancel.is_cancelled() {
            debug!(loader = self.name, batch = id, "Dropping batch for cancelled request");
            fail_all(waiters, LoadError::Cancelled);
            return;
        }

        self.dispatches.fetch_add(1, Ordering::Relaxed);
        debug!(loader = self.name, batch = id, keys = keys.len(), "Dispatching batch");

        let result = tokio::select! {
            biased;
            result = self.fetch.load(&keys) => result,
            _ = self.cancel.cancelled() => Err(LoadError::Cancelled),
        };

        match result {
            Ok(values) => {
                if values.len() > keys.len() {
                    warn!(
                        loader = self.name,
                        keys = keys.len(),
                        values = values.len(),
                        "Batch function returned more values than keys"
                    );
                }

                let mut values = values.into_iter();
                let resolved: Vec<(K, Option<V>)> = keys
                    .into_iter()
                    .map(|key| (key, values.next().flatten()))
                    .collect();

                {
                    let mut state = self.state.lock();
                    for (key, value) in &resolved {
                        state.cache.insert(key.clone(), value.clone());
                    }
                }

                let mut waiters = waiters;
                for (key, value) in resolved {
                    for sender in waiters.remove(&key).unwrap_or_default() {
                        let _ = sender.send(Ok(value.clone()));
                    }
                }
            }
            Err(error) => {
                warn!(loader = self.name, batch = id, error = %error, "Batch load failed");
                fail_all(waiters, error);
            }
        }
    }
}

fn fail_all<K, V>(waiters: HashMap<K, Vec<oneshot::Sender<LoadResult<V>>>>, error: LoadError) {
    for sender in waiters.into_values().flatten() {
        let _ = sender.send(Err(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Doubles each key; records every batch it sees
    #[derive(Default)]
    struct Doubler {
        batches: Mutex<Vec<Vec<i32>>>,
    }

    #[async_trait]
    impl BatchFn<i32, i32> for Doubler {
        async fn load(&self, keys: &[i32]) -> Result<Vec<Option<i32>>, LoadError> {
            self.batches.lock().push(keys.to_vec());
            Ok(keys
                .iter()
                .map(|key| if *key < 0 { None } else { Some(key * 2) })
                .collect())
        }
    }

    struct Failing {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl BatchFn<i32, i32> for Failing {
        async fn load(&self, _keys: &[i32]) -> Result<Vec<Option<i32>>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(LoadError::FetchFailed("connection reset".to_string()))
        }
    }

    /// Answers only the first key of each batch
    struct FirstOnly;

    #[async_trait]
    impl BatchFn<i32, i32> for FirstOnly {
        async fn load(&self, keys: &[i32]) -> Result<Vec<Option<i32>>, LoadError> {
            Ok(keys.first().map(|key| Some(*key)).into_iter().collect())
        }
    }

    /// Cancels the request from inside a fetch that still succeeds
    struct CancelsWhileLoading {
        cancel: CancellationSignal,
    }

    #[async_trait]
    impl BatchFn<i32, i32> for CancelsWhileLoading {
        async fn load(&self, keys: &[i32]) -> Result<Vec<Option<i32>>, LoadError> {
            self.cancel.cancel();
            Ok(keys.iter().map(|key| Some(key + 1)).collect())
        }
    }

    fn config(max_batch: usize) -> LoaderConfig {
        LoaderConfig {
            wait_ms: 2,
            max_batch,
        }
    }

    #[tokio::test]
    async fn test_concurrent_loads_share_one_batch() {
        let source = Arc::new(Doubler::default());
        let loader = BatchLoader::new("double", source.clone(), &config(0), CancellationSignal::new());

        let (a, b, c) = tokio::join!(loader.load(1), loader.load(2), loader.load(1));

        assert_eq!(a, Ok(Some(2)));
        assert_eq!(b, Ok(Some(4)));
        assert_eq!(c, Ok(Some(2)));
        assert_eq!(loader.dispatch_count(), 1);
        assert_eq!(*source.batches.lock(), vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn test_results_are_memoized() {
        let source = Arc::new(Doubler::default());
        let loader = BatchLoader::new("double", source.clone(), &config(0), CancellationSignal::new());

        assert_eq!(loader.load(5).await, Ok(Some(10)));
        assert_eq!(loader.load(5).await, Ok(Some(10)));
        assert_eq!(loader.load(-1).await, Ok(None));
        assert_eq!(loader.load(-1).await, Ok(None));
        assert_eq!(loader.dispatch_count(), 2);
    }

    #[tokio::test]
    async fn test_failures_reach_every_waiter_and_are_not_cached() {
        let source = Arc::new(Failing {
            calls: AtomicUsize::new(0),
        });
        let loader = BatchLoader::new("failing", source.clone(), &config(0), CancellationSignal::new());

        let (a, b) = tokio::join!(loader.load(1), loader.load(2));
        let expected = Err(LoadError::FetchFailed("connection reset".to_string()));
        assert_eq!(a, expected);
        assert_eq!(b, expected);

        assert!(loader.load(1).await.is_err());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_batch_dispatches_immediately() {
        let source = Arc::new(Doubler::default());
        let loader = BatchLoader::new("double", source.clone(), &config(2), CancellationSignal::new());

        let results = loader.load_many(vec![1, 2, 3]).await;

        assert_eq!(results, vec![Ok(Some(2)), Ok(Some(4)), Ok(Some(6))]);
        assert_eq!(*source.batches.lock(), vec![vec![1, 2], vec![3]]);
    }

    #[tokio::test]
    async fn test_prime_and_clear() {
        let source = Arc::new(Doubler::default());
        let loader = BatchLoader::new("double", source.clone(), &config(0), CancellationSignal::new());

        loader.prime(7, Some(70));
        assert_eq!(loader.load(7).await, Ok(Some(70)));
        assert_eq!(loader.dispatch_count(), 0);

        loader.clear(&7);
        assert_eq!(loader.load(7).await, Ok(Some(14)));
        assert_eq!(loader.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_loader_rejects_new_keys() {
        let cancel = CancellationSignal::new();
        let source = Arc::new(Doubler::default());
        let loader = BatchLoader::new("double", source.clone(), &config(0), cancel.clone());

        loader.prime(1, Some(100));
        cancel.cancel();

        assert_eq!(loader.load(1).await, Ok(Some(100)));
        assert_eq!(loader.load(2).await, Err(LoadError::Cancelled));
        assert_eq!(loader.dispatch_count(), 0);
    }

    #[tokio::test]
    async fn test_completed_batch_wins_over_late_cancellation() {
        let cancel = CancellationSignal::new();
        let source = CancelsWhileLoading {
            cancel: cancel.clone(),
        };
        let loader = BatchLoader::new("plus_one", source, &config(0), cancel.clone());

        assert_eq!(loader.load(7).await, Ok(Some(8)));
        assert!(cancel.is_cancelled());
        assert_eq!(loader.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn test_short_results_leave_trailing_keys_absent() {
        let loader = BatchLoader::new("first_only", FirstOnly, &config(0), CancellationSignal::new());

        let (a, b) = tokio::join!(loader.load(3), loader.load(4));

        assert_eq!(a, Ok(Some(3)));
        assert_eq!(b, Ok(None));
    }

    #[tokio::test]
    async fn test_flush_dispatches_before_the_window_closes() {
        let source = Arc::new(Doubler::default());
        let slow = LoaderConfig {
            wait_ms: 60_000,
            max_batch: 0,
        };
        let loader = BatchLoader::new("double", source.clone(), &slow, CancellationSignal::new());

        let pending = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.load(9).await })
        };
        while source.batches.lock().is_empty() {
            tokio::task::yield_now().await;
            loader.flush();
        }

        assert_eq!(pending.await.unwrap(), Ok(Some(18)));
        assert_eq!(loader.dispatch_count(), 1);
    }
}
