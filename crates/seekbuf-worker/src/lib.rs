//! Background loader scheduling shared across caches.
//!
//! One thread per source type performs every physical block fill for all caches
//! of that type:
//!
//! - **`WorkerRegistry`**: type name → worker, explicit and injectable, with a
//!   lazily created process-wide default
//! - **`Client`**: one per cache; owns the request queue the worker drains
//! - **`LoadTicket`**: handle a blocking reader waits on
//!
//! The worker always services the oldest blocking request across all clients
//! before any speculative one, and answers every queued request for a block
//! with a single fill. A worker with no clients exits after a grace period
//! unless a new client registers first.

#![forbid(unsafe_code)]

mod client;
mod registry;
mod worker;

pub use client::{BlockLoader, Client, LoadTicket};
pub use registry::{DEFAULT_GRACE, WorkerRegistry};
