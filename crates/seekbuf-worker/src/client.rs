#![forbid(unsafe_code)]

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use bytes::Bytes;
use kanal::{Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use seekbuf_core::{CacheError, CacheResult};
use tracing::{debug, trace, warn};

use crate::worker::WorkerShared;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Physical fill of one block, run on the loader thread.
///
/// Returns the block contents; a block shorter than the configured size marks
/// end-of-stream.
pub trait BlockLoader: Send + Sync + 'static {
    fn load_block(&self, index: u64) -> CacheResult<Bytes>;
}

type Reply = Sender<CacheResult<Bytes>>;

struct Pending {
    index: u64,
    /// `Some` for blocking requests.
    reply: Option<Reply>,
}

#[derive(Default)]
struct Queue {
    pending: VecDeque<Pending>,
    active: Option<u64>,
    closed: bool,
}

/// Client state shared with the worker thread.
pub(crate) struct ClientShared {
    id: u64,
    loader: Arc<dyn BlockLoader>,
    queue: Mutex<Queue>,
    idle: Condvar,
}

impl ClientShared {
    pub(crate) fn new(loader: Arc<dyn BlockLoader>) -> Self {
        Self {
            id: NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed),
            loader,
            queue: Mutex::new(Queue::default()),
            idle: Condvar::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Pick the oldest request (the oldest blocking one if `blocking_only`) and
    /// mark it active. Requests stay queued until the fill completes so later
    /// duplicates are answered by the same fill.
    pub(crate) fn take_job(&self, blocking_only: bool) -> Option<u64> {
        let mut queue = self.queue.lock();
        if queue.closed || queue.active.is_some() {
            return None;
        }
        let index = queue
            .pending
            .iter()
            .find(|p| !blocking_only || p.reply.is_some())?
            .index;
        queue.active = Some(index);
        Some(index)
    }

    /// Fill block `index` and answer every request queued for it.
    pub(crate) fn run_job(&self, index: u64) {
        let result = self.loader.load_block(index);

        let mut queue = self.queue.lock();
        let mut answered = 0usize;
        queue.pending.retain_mut(|p| {
            if p.index != index {
                return true;
            }
            if let Some(reply) = p.reply.take() {
                // Waiter may have gone away; nothing to report then.
                let _ = reply.send(result.clone());
                answered += 1;
            }
            false
        });
        queue.active = None;
        drop(queue);
        self.idle.notify_all();

        match &result {
            Ok(bytes) => trace!(client = self.id, block = index, len = bytes.len(), answered, "block filled"),
            Err(e) if answered == 0 => {
                warn!(client = self.id, block = index, err = %e, "prefetch failed, dropping");
            }
            Err(e) => debug!(client = self.id, block = index, err = %e, answered, "block fill failed"),
        }
    }
}

/// Pending blocking load; [`wait`](Self::wait) parks the caller until the block is filled.
#[must_use = "a blocking load must be waited on"]
pub struct LoadTicket {
    index: u64,
    rx: Receiver<CacheResult<Bytes>>,
}

impl LoadTicket {
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Block until the fill completes.
    ///
    /// Fails with [`CacheError::Abandoned`] if the owning client closed before the
    /// request was started.
    pub fn wait(self) -> CacheResult<Bytes> {
        match self.rx.recv() {
            Ok(result) => result,
            Err(_) => Err(CacheError::Abandoned { block: self.index }),
        }
    }
}

/// Registration of one cache with the worker of its source type.
///
/// Dropping the client closes it.
pub struct Client {
    shared: Arc<ClientShared>,
    worker: Arc<WorkerShared>,
}

impl Client {
    pub(crate) fn new(shared: Arc<ClientShared>, worker: Arc<WorkerShared>) -> Self {
        Self { shared, worker }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn type_name(&self) -> &str {
        self.worker.type_name()
    }

    /// Queue a blocking load of block `index`.
    pub fn request_load(&self, index: u64) -> CacheResult<LoadTicket> {
        let (tx, rx) = kanal::bounded(1);
        self.enqueue(index, Some(tx))?;
        Ok(LoadTicket { index, rx })
    }

    /// Queue a speculative load of block `index`; the result is not reported.
    pub fn request_prefetch(&self, index: u64) -> CacheResult<()> {
        self.enqueue(index, None)
    }

    /// Whether a request for `index` is queued or being filled.
    pub fn has_request_for(&self, index: u64) -> bool {
        let queue = self.shared.queue.lock();
        queue.active == Some(index) || queue.pending.iter().any(|p| p.index == index)
    }

    /// Number of queued requests, including the one being filled.
    pub fn pending_len(&self) -> usize {
        self.shared.queue.lock().pending.len()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.queue.lock().closed
    }

    fn enqueue(&self, index: u64, reply: Option<Reply>) -> CacheResult<()> {
        {
            let mut queue = self.shared.queue.lock();
            if queue.closed {
                return Err(CacheError::Closed);
            }
            queue.pending.push_back(Pending { index, reply });
        }
        self.worker.wake();
        Ok(())
    }

    /// Deregister from the worker and wait for the active fill, if any.
    ///
    /// Requests that have not started are dropped; their blocking waiters get
    /// [`CacheError::Abandoned`]. Idempotent.
    pub fn close(&self) {
        self.worker.deregister(self.shared.id);

        let mut queue = self.shared.queue.lock();
        if !queue.closed {
            queue.closed = true;
            let active = queue.active;
            let queued = queue.pending.len();
            queue.pending.retain(|p| Some(p.index) == active);
            debug!(
                client = self.shared.id,
                type_name = self.worker.type_name(),
                dropped = queued - queue.pending.len(),
                active,
                "client closed"
            );
        }
        while queue.active.is_some() {
            self.shared.idle.wait(&mut queue);
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.shared.id)
            .field("type_name", &self.worker.type_name())
            .finish_non_exhaustive()
    }
}
