//! Pluggable cache layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Settings   │────▶│  Registry   │────▶│   Backend   │
//! │ (cache.*)   │     │  (resolve)  │     │ (tagged enum)│
//! └─────────────┘     └─────────────┘     └─────────────┘
//!                                                │
//!                     ┌──────────────────────────┼──────────────┐
//!                     ▼              ▼           ▼              ▼
//!               null / array     file      process / redis   chained
//! ```
//!
//! # Modules
//!
//! - [`backend`]: `CacheBackend` trait implemented by every backend
//! - [`backends`]: Concrete backends (null, array, file, process, redis, chained)
//! - [`registry`]: Resolves backend names from settings into a [`registry::Backend`]
//! - [`eager`]: Request-scoped cache persisted through a backend in one write
//! - [`error`]: Error type for cache operations

pub mod backend;
pub mod backends;
pub mod eager;
pub mod error;
pub mod registry;
