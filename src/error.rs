//! Error types for the ringcache library.
//!
//! ## Key Components
//!
//! - [`CacheMiss`]: Returned by [`RingCache::get`](crate::cache::RingCache::get)
//!   when a key is absent and no producer was supplied. Surfaced synchronously
//!   to the caller, never retried.
//! - [`WorkerError`]: Describes a single instruction the background worker
//!   failed to process. Reported to the configured
//!   [`DiagnosticSink`](crate::cache::sink::DiagnosticSink); the worker then
//!   moves on to the next instruction.
//! - [`ConfigError`]: Returned when cache configuration parameters are invalid
//!   (e.g. zero capacity).
//!
//! ## Example Usage
//!
//! ```
//! use ringcache::builder::RingCacheBuilder;
//! use ringcache::error::ConfigError;
//! use ringcache::cache::RingCache;
//!
//! // Fallible constructor for user-configurable parameters
//! let cache: Result<RingCache<String, i32>, ConfigError> =
//!     RingCacheBuilder::new(100).try_build();
//! assert!(cache.is_ok());
//!
//! // Zero capacity is caught without panicking
//! let bad = RingCacheBuilder::new(0).try_build::<String, i32>();
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// CacheMiss
// ---------------------------------------------------------------------------

/// Error returned when a key is absent and no value-producer was supplied.
///
/// Produced by [`RingCache::get`](crate::cache::RingCache::get). Carries a
/// human-readable description naming the missing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMiss(String);

impl CacheMiss {
    /// Creates a new `CacheMiss` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CacheMiss {}

// ---------------------------------------------------------------------------
// WorkerError
// ---------------------------------------------------------------------------

/// Error describing one instruction the background worker could not process.
///
/// A single malformed or unexpected instruction never stops the pipeline:
/// the worker reports the failure to its diagnostic sink and continues with
/// the next instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerError(String);

impl WorkerError {
    /// Creates a new `WorkerError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for WorkerError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`RingCacheBuilder::try_build`](crate::builder::RingCacheBuilder::try_build).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use ringcache::builder::RingCacheBuilder;
///
/// let err = RingCacheBuilder::new(0).try_build::<u64, u64>().unwrap_err();
/// assert!(err.to_string().contains("capacity"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
