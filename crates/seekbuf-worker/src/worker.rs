#![forbid(unsafe_code)]

use std::{
    sync::{Arc, Weak},
    thread,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use seekbuf_core::{CacheError, CacheResult};
use tracing::{debug, trace};

use crate::{client::ClientShared, registry::RegistryInner};

struct WorkerState {
    /// In registration order; scanned front to back.
    clients: Vec<Arc<ClientShared>>,
    stopped: bool,
    /// Set when the last client leaves, cleared by the next registration.
    idle_since: Option<Instant>,
}

/// One loader thread and the clients it serves, for a single source type.
///
/// Lock order: registry map, then worker state, then a client queue. Callers
/// enqueueing a request release the queue before touching the worker state.
pub(crate) struct WorkerShared {
    type_name: String,
    grace: Duration,
    registry: Weak<RegistryInner>,
    state: Mutex<WorkerState>,
    wake: Condvar,
}

impl WorkerShared {
    pub(crate) fn spawn(
        type_name: &str,
        grace: Duration,
        registry: Weak<RegistryInner>,
    ) -> CacheResult<Arc<Self>> {
        let shared = Arc::new(Self {
            type_name: type_name.to_owned(),
            grace,
            registry,
            state: Mutex::new(WorkerState {
                clients: Vec::new(),
                stopped: false,
                idle_since: None,
            }),
            wake: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        thread::Builder::new()
            .name(format!("seekbuf-loader-{type_name}"))
            .spawn(move || worker.run())
            .map_err(|e| CacheError::Spawn(Arc::new(e)))?;

        Ok(shared)
    }

    pub(crate) fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Add a client. Called with the registry map locked.
    pub(crate) fn attach(&self, client: Arc<ClientShared>) {
        let mut state = self.state.lock();
        state.clients.push(client);
        state.idle_since = None;
        self.wake.notify_all();
    }

    pub(crate) fn deregister(&self, client_id: u64) {
        let mut state = self.state.lock();
        state.clients.retain(|c| c.id() != client_id);
        if state.clients.is_empty() && state.idle_since.is_none() {
            state.idle_since = Some(Instant::now());
            debug!(type_name = %self.type_name, grace = ?self.grace, "loader idle");
        }
        self.wake.notify_all();
    }

    /// Signal that a client queued a request.
    pub(crate) fn wake(&self) {
        let _state = self.state.lock();
        self.wake.notify_all();
    }

    pub(crate) fn client_count(&self) -> usize {
        self.state.lock().clients.len()
    }

    fn run(self: Arc<Self>) {
        debug!(type_name = %self.type_name, "loader started");
        while let Some((client, index)) = self.next_job() {
            trace!(type_name = %self.type_name, client = client.id(), block = index, "loading");
            client.run_job(index);
        }
        debug!(type_name = %self.type_name, "loader stopped");
    }

    fn next_job(self: &Arc<Self>) -> Option<(Arc<ClientShared>, u64)> {
        let mut state = self.state.lock();
        loop {
            if state.stopped {
                return None;
            }
            if let Some(job) = pick(&state.clients) {
                return Some(job);
            }

            if state.clients.is_empty() {
                let since = *state.idle_since.get_or_insert_with(Instant::now);
                let deadline = since + self.grace;
                if Instant::now() >= deadline {
                    drop(state);
                    if self.try_retire() {
                        return None;
                    }
                    state = self.state.lock();
                    continue;
                }
                self.wake.wait_until(&mut state, deadline);
            } else {
                self.wake.wait(&mut state);
            }
        }
    }

    /// Stop and leave the registry if still idle past the grace period.
    fn try_retire(self: &Arc<Self>) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            self.state.lock().stopped = true;
            return true;
        };

        let mut workers = registry.workers.lock();
        let mut state = self.state.lock();
        if !state.clients.is_empty() {
            return false;
        }
        if let Some(since) = state.idle_since
            && since.elapsed() < self.grace
        {
            return false;
        }

        state.stopped = true;
        if workers
            .get(&self.type_name)
            .is_some_and(|w| Arc::ptr_eq(w, self))
        {
            workers.remove(&self.type_name);
        }
        true
    }
}

/// First blocking request across all clients, else the first request of any kind.
fn pick(clients: &[Arc<ClientShared>]) -> Option<(Arc<ClientShared>, u64)> {
    for blocking_only in [true, false] {
        for client in clients {
            if let Some(index) = client.take_job(blocking_only) {
                return Some((Arc::clone(client), index));
            }
        }
    }
    None
}
