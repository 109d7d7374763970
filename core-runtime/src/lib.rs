//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media cache core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Cache storages depend on this crate for the host bridges they persist
//! through, the shared event bus they publish lifecycle events on, and the
//! logging conventions used throughout the workspace.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, FeatureFlags};
pub use error::{Error, Result};
pub use events::{CacheEvent, CoreEvent, EventBus, EventStream};
