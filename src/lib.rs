//! ringcache: a fixed-capacity key-value cache over a circular buffer, with
//! lazily computed misses and an asynchronous single-writer eviction
//! pipeline.
//!
//! See the [`cache`] module for the consistency contract.

pub mod builder;
pub mod cache;
pub mod ds;
pub mod error;
pub mod metrics;
pub mod prelude;
