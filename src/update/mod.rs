//! Update checking for new platform releases
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Checker   │────▶│ Update API  │     │   Semver    │
//! │ (rate-limit)│     │ (HTTP GET)  │     │  (compare)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       ▲
//!        ▼                                       │
//! ┌─────────────┐                                │
//! │ OptionStore │────────────────────────────────┘
//! │  (SQLite)   │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`checker`]: Rate-limited check and newest-version lookup
//! - [`channel`]: Release channels and their URLs
//! - [`options`]: Persistent option storage
//! - [`semver`]: Version string comparison
//! - [`error`]: Error types for option storage and update checks

pub mod channel;
pub mod checker;
pub mod error;
pub mod options;
pub mod semver;
