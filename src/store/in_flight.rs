//! Cancellation tokens of requests that are still running

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Id;
use tracing::debug;

#[derive(Debug)]
struct Entry {
    generation: u64,
    token: CancellationToken,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Mutex<HashMap<Id, Entry>>,
    next_generation: AtomicU64,
}

/// Table of cancellable requests keyed by request id.
///
/// Lookup and mutation happen under one exclusive lock. Entries are added
/// through [`register`](Self::register) and removed when the returned
/// [`Registration`] is dropped.
#[derive(Debug, Clone, Default)]
pub struct InFlightRequests {
    inner: Arc<Inner>,
}

impl InFlightRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `token` under `id`.
    ///
    /// Returns `None` when a live entry already exists for `id`; the existing
    /// entry is left in place.
    pub fn register(&self, id: Id, token: CancellationToken) -> Option<Registration> {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.lock();
        if entries.contains_key(&id) {
            return None;
        }
        debug!("Registering in-flight request {}", id);
        entries.insert(id.clone(), Entry { generation, token });

        Some(Registration {
            table: self.clone(),
            id,
            generation,
        })
    }

    /// Cancels the request registered under `id`.
    ///
    /// Returns whether an entry existed. Unknown ids are ignored.
    pub fn cancel(&self, id: &Id) -> bool {
        let entries = self.lock();
        match entries.get(id) {
            Some(entry) => {
                debug!("Cancelling in-flight request {}", id);
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every registered request
    pub fn cancel_all(&self) {
        let entries = self.lock();
        debug!("Cancelling {} in-flight requests", entries.len());
        for entry in entries.values() {
            entry.token.cancel();
        }
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: &Id, generation: u64) {
        let mut entries = self.lock();
        if entries
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(id);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Id, Entry>> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a request in the [`InFlightRequests`] table; dropping it removes the
/// entry.
#[derive(Debug)]
pub struct Registration {
    table: InFlightRequests,
    id: Id,
    generation: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        debug!("Request {} is no longer in flight", self.id);
        self.table.remove(&self.id, self.generation);
    }
}
