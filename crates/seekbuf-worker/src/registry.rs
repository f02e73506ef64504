#![forbid(unsafe_code)]

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
    time::Duration,
};

use parking_lot::Mutex;
use seekbuf_core::CacheResult;
use tracing::debug;

use crate::{
    client::{BlockLoader, Client, ClientShared},
    worker::WorkerShared,
};

/// How long a worker with no clients lingers before its thread exits.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(2);

pub(crate) struct RegistryInner {
    pub(crate) workers: Mutex<HashMap<String, Arc<WorkerShared>>>,
    grace: Duration,
}

/// Map from source type name to the loader thread serving that type.
///
/// Every cache registered under the same type name shares one thread, so the
/// backing transport of that type is never read concurrently. Cloning is cheap
/// and yields a handle to the same registry.
#[derive(Clone)]
pub struct WorkerRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::with_grace(DEFAULT_GRACE)
    }

    /// Registry whose idle workers exit after `grace`.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                workers: Mutex::new(HashMap::new()),
                grace,
            }),
        }
    }

    /// Process-wide registry, created on first use.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<WorkerRegistry> = OnceLock::new();
        GLOBAL.get_or_init(Self::new).clone()
    }

    pub fn grace(&self) -> Duration {
        self.inner.grace
    }

    /// Register a loader under `type_name`, starting that type's worker if needed.
    pub fn register(&self, type_name: &str, loader: Arc<dyn BlockLoader>) -> CacheResult<Client> {
        let mut workers = self.inner.workers.lock();
        let worker = if let Some(worker) = workers.get(type_name) {
            Arc::clone(worker)
        } else {
            let worker =
                WorkerShared::spawn(type_name, self.inner.grace, Arc::downgrade(&self.inner))?;
            workers.insert(type_name.to_owned(), Arc::clone(&worker));
            worker
        };

        let client = Arc::new(ClientShared::new(loader));
        worker.attach(Arc::clone(&client));
        drop(workers);

        debug!(type_name, client = client.id(), "client registered");
        Ok(Client::new(client, worker))
    }

    /// Number of live workers.
    pub fn worker_count(&self) -> usize {
        self.inner.workers.lock().len()
    }

    pub fn has_worker(&self, type_name: &str) -> bool {
        self.inner.workers.lock().contains_key(type_name)
    }

    /// Clients currently registered under `type_name`.
    pub fn client_count(&self, type_name: &str) -> usize {
        self.inner
            .workers
            .lock()
            .get(type_name)
            .map_or(0, |w| w.client_count())
    }

    /// Whether both handles refer to the same registry.
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("grace", &self.inner.grace)
            .field("workers", &self.worker_count())
            .finish()
    }
}
