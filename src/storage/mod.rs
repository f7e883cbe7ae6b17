//! Storage abstractions for monitor state.
//!
//! The monitor keeps a single durable value, the notice watermark, behind a
//! small key-value interface so the core runs the same against a state file
//! or an in-memory map.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Monitor configuration
//! └── state.json            # Durable key-value state (watermark)
//! ```

pub mod local;
pub mod memory;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Synchronous string key-value store.
///
/// `set` must be durable when it returns `Ok`.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
