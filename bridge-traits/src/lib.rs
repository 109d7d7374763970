//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the cache core and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform.
//!
//! ## Traits
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - File I/O for save records
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! and keep the failing path in the message where one exists.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.

pub mod error;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use storage::{FileMetadata, FileSystemAccess};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
