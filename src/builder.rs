//! Builder for [`RingCache`] construction.
//!
//! Validates user-configurable parameters before the worker thread is
//! spawned, and lets embedders install their own diagnostic sink.
//!
//! ## Example
//!
//! ```rust
//! use ringcache::builder::RingCacheBuilder;
//!
//! let cache = RingCacheBuilder::new(100).try_build::<u64, String>().unwrap();
//! cache.set(1, "hello".to_string());
//! assert_eq!(*cache.get(&1).unwrap(), "hello");
//! ```

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::RingCache;
use crate::cache::sink::{DiagnosticSink, TracingSink};
use crate::error::ConfigError;

/// Configures and constructs a [`RingCache`].
#[derive(Clone)]
pub struct RingCacheBuilder {
    capacity: usize,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl RingCacheBuilder {
    /// Starts a builder for a cache with `capacity` ring slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            sink: None,
        }
    }

    /// Installs a diagnostic sink for worker processing failures.
    ///
    /// Defaults to [`TracingSink`].
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validates the configuration and builds the cache, spawning its
    /// worker thread.
    ///
    /// Unlike [`RingCache::new`], which clamps, a zero capacity is rejected
    /// here with [`ConfigError`].
    pub fn try_build<K, V>(self) -> Result<RingCache<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        let sink = self.sink.unwrap_or_else(|| Arc::new(TracingSink));
        Ok(RingCache::with_parts(self.capacity, sink))
    }
}
