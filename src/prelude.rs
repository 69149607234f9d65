pub use crate::builder::RingCacheBuilder;
pub use crate::cache::entry::CacheEntry;
pub use crate::cache::sink::{DiagnosticSink, TracingSink};
pub use crate::cache::{DEFAULT_CAPACITY, RingCache, RingSnapshot, SnapshotEntry};
pub use crate::ds::{RingBuffer, Slot, SlotCursor};
pub use crate::error::{CacheMiss, ConfigError, WorkerError};
pub use crate::metrics::CacheMetrics;
