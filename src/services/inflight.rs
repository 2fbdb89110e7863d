use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors surfaced to callers waiting on a shared computation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InFlightError {
    #[error("In-flight computation aborted: {0}")]
    Aborted(String),
}

type SharedCall<V> = Shared<BoxFuture<'static, Result<V, InFlightError>>>;
type CallMap<V> = Arc<Mutex<HashMap<String, SharedCall<V>>>>;

/// At-most-one computation per key
///
/// The first caller for a key becomes the leader: its computation is spawned
/// onto the runtime and registered under the key. Concurrent callers for the
/// same key attach to the registered handle and receive the same value.
/// The spawned task owns the computation, so a caller giving up on its wait
/// never cancels it. The key is unregistered as soon as the computation
/// finishes, whether it returned or panicked.
pub struct InFlight<V> {
    calls: CallMap<V>,
}

impl<V> Clone for InFlight<V> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<V> Default for InFlight<V> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<V> InFlight<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `compute` for `key`, or join the computation already running for it
    ///
    /// `compute` is only polled when this caller becomes the leader.
    pub async fn run<F>(&self, key: &str, compute: F) -> Result<V, InFlightError>
    where
        F: Future<Output = V> + Send + 'static,
    {
        // The map lock is never held across an await point
        let call = {
            let mut calls = lock(&self.calls);
            match calls.get(key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight computation: {}", key);
                    existing.clone()
                }
                None => {
                    tracing::debug!("Starting computation: {}", key);
                    let guard = Unregister {
                        calls: Arc::clone(&self.calls),
                        key: key.to_string(),
                    };
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        compute.await
                    });
                    let call = async move {
                        handle
                            .await
                            .map_err(|e| InFlightError::Aborted(e.to_string()))
                    }
                    .boxed()
                    .shared();
                    calls.insert(key.to_string(), call.clone());
                    call
                }
            }
        };

        call.await
    }

    /// Number of keys with a computation currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        lock(&self.calls).contains_key(key)
    }
}

fn lock<V>(calls: &CallMap<V>) -> MutexGuard<'_, HashMap<String, SharedCall<V>>> {
    calls.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes the key when the leader's task finishes or unwinds
struct Unregister<V> {
    calls: CallMap<V>,
    key: String,
}

impl<V> Drop for Unregister<V> {
    fn drop(&mut self) {
        lock(&self.calls).remove(&self.key);
    }
}
