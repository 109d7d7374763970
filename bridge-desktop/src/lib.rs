//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`, with write-then-rename replacement
//!   so save records are never observed half-written
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::TokioFileSystem;
//! use bridge_traits::FileSystemAccess;
//! use std::sync::Arc;
//!
//! let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
//! // Hand it to CoreConfig::builder().file_system(fs)
//! ```

mod filesystem;

pub use filesystem::TokioFileSystem;
