#![forbid(unsafe_code)]

//! Configuration for [`BufferedSource`](crate::BufferedSource).

use seekbuf_core::BufferConfig;
use seekbuf_worker::WorkerRegistry;

/// Construction options for a [`BufferedSource`](crate::BufferedSource).
///
/// Both fields are optional; unset values are resolved against the creator at
/// construction time.
///
/// # Example
///
/// ```ignore
/// use seekbuf::{SourceConfig, common::BufferConfig, worker::WorkerRegistry};
///
/// // Block size from the creator's preferred chunk size, global registry
/// let config = SourceConfig::default();
///
/// // Explicit layout and an isolated registry
/// let config = SourceConfig::default()
///     .with_buffer(BufferConfig::new(64 * 1024, 16, 4))
///     .with_registry(WorkerRegistry::new());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SourceConfig {
    /// Block layout. When unset, derived from the creator's preferred chunk
    /// size, falling back to [`BufferConfig::default`].
    pub buffer: Option<BufferConfig>,
    /// Registry providing the loader thread. When unset, [`WorkerRegistry::global`].
    pub registry: Option<WorkerRegistry>,
}

impl SourceConfig {
    #[must_use]
    pub fn with_buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = Some(buffer);
        self
    }

    #[must_use]
    pub fn with_registry(mut self, registry: WorkerRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub(crate) fn resolve_buffer(&self, preferred_chunk_size: Option<usize>) -> BufferConfig {
        match (self.buffer, preferred_chunk_size) {
            (Some(buffer), _) => buffer,
            (None, Some(chunk_size)) if chunk_size > 0 => BufferConfig::for_chunk_size(chunk_size),
            (None, _) => BufferConfig::default(),
        }
    }

    pub(crate) fn resolve_registry(&self) -> WorkerRegistry {
        self.registry.clone().unwrap_or_else(WorkerRegistry::global)
    }
}
