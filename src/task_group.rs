//! Concurrent Section producers
//!
//! `TaskGroup` runs a small fixed set of producers at once and hands results
//! back in submission order, whatever order they finish in. The first fatal
//! error cancels the rest. `bounded_map` is the per-item variant for
//! fan-outs over arbitrarily many files, capped by a semaphore.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::ReconError;
use crate::section::Section;

/// Default worker pool size for per-item fan-outs
pub const FANOUT_POOL: usize = 10;

/// A set of Section producers sharing one cancellation scope
pub struct TaskGroup {
    cancel: CancellationToken,
    tasks: JoinSet<(usize, Result<Section, ReconError>)>,
    names: Vec<String>,
}

impl TaskGroup {
    /// New group whose token is a child of `parent`
    ///
    /// Cancelling the parent (interrupt, timeout) reaches every producer;
    /// cancelling the group never touches the parent.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            cancel: parent.child_token(),
            tasks: JoinSet::new(),
            names: Vec::new(),
        }
    }

    /// Token producers should pass to the invoker
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Start a producer; its result lands in slot `self.len()` at spawn time
    pub fn spawn<F>(&mut self, name: impl Into<String>, producer: F)
    where
        F: Future<Output = Result<Section, ReconError>> + Send + 'static,
    {
        let index = self.names.len();
        self.names.push(name.into());
        self.tasks.spawn(async move { (index, producer.await) });
    }

    /// Wait for every producer, or for the first fatal error
    ///
    /// On error the remaining producers are cancelled and their results,
    /// including ones that already finished, are discarded.
    pub async fn join(mut self) -> Result<Vec<Section>, ReconError> {
        let mut slots: Vec<Option<Section>> = (0..self.names.len()).map(|_| None).collect();

        while let Some(joined) = self.tasks.join_next().await {
            let (index, result) = match joined {
                Ok(pair) => pair,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => return Err(self.abort(panic_error(e))),
            };

            match result {
                Ok(section) => slots[index] = Some(section),
                // Subsumed by whatever caused the cancellation
                Err(e) if e.is_cancelled() => {
                    log::trace!("producer '{}' cancelled", self.names[index]);
                }
                Err(e) => {
                    log::debug!("producer '{}' failed: {}", self.names[index], e);
                    let name = self.names[index].clone();
                    return Err(self.abort(e.in_producer(&name)));
                }
            }
        }

        // Any empty slot means the scope was cancelled from outside
        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or(ReconError::Cancelled)
    }

    fn abort(&mut self, error: ReconError) -> ReconError {
        self.cancel.cancel();
        self.tasks.abort_all();
        error
    }
}

fn panic_error(e: JoinError) -> ReconError {
    ReconError::Internal(format!("producer task panicked: {e}"))
}

/// Run `f` over every item with at most `pool` in flight
///
/// Output order follows input order. The first non-cancellation error
/// cancels the remaining items and is returned.
pub async fn bounded_map<T, R, F, Fut>(
    items: Vec<T>,
    pool: usize,
    parent: &CancellationToken,
    f: F,
) -> Result<Vec<R>, ReconError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T, CancellationToken) -> Fut,
    Fut: Future<Output = Result<R, ReconError>> + Send + 'static,
{
    let cancel = parent.child_token();
    let semaphore = Arc::new(Semaphore::new(pool.max(1)));
    let mut tasks: JoinSet<(usize, Result<R, ReconError>)> = JoinSet::new();
    let total = items.len();

    for (index, item) in items.into_iter().enumerate() {
        let semaphore = semaphore.clone();
        let token = cancel.clone();
        let work = f(item, cancel.clone());

        tasks.spawn(async move {
            let permit = tokio::select! {
                permit = semaphore.acquire_owned() => permit,
                _ = token.cancelled() => return (index, Err(ReconError::Cancelled)),
            };
            let Ok(_permit) = permit else {
                return (index, Err(ReconError::Cancelled));
            };
            (index, work.await)
        });
    }

    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();

    while let Some(joined) = tasks.join_next().await {
        let (index, result) = match joined {
            Ok(pair) => pair,
            Err(e) if e.is_cancelled() => continue,
            Err(e) => {
                cancel.cancel();
                tasks.abort_all();
                return Err(panic_error(e));
            }
        };

        match result {
            Ok(value) => slots[index] = Some(value),
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                cancel.cancel();
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    slots
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or(ReconError::Cancelled)
}
