//! Self-synchronizing typed key-value store persisted as a single document.
//!
//! A [`Store`] keeps a `String -> Value` mapping in memory and mirrors it to
//! one binary document supplied by a [`StampProvider`]. The provider also
//! hands out a cheap, comparable *stamp* describing the backend's current
//! version; the store remembers the stamp of its last load or save and
//! treats any difference as an outside change.
//!
//! # Providers
//!
//! - [`FileStampProvider`] -- a file on disk, stamped by mtime and length
//! - [`MemoryStampProvider`] -- shared in-memory buffer for tests and embedding
//!
//! # Rules
//!
//! 1. Construction starts a background load and returns immediately.
//! 2. Every accessor waits for an in-flight load, then works on the mapping
//!    under the store's lock. Nobody sees a half-loaded mapping.
//! 3. Loads merge: keys missing from the document are kept.
//! 4. At most one load runs at a time; saves and loads never overlap.
//! 5. Mutations stay in memory until `commit()` or `apply()`.
//! 6. Failures degrade: a failed load still marks the store loaded, a failed
//!    commit returns `false` and leaves memory and stamp untouched.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod provider;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::{FileProviderConfig, FileStamp, FileStampProvider, SyncMode};
pub use memory::{MemoryStampProvider, MemoryWriter};
pub use provider::StampProvider;
pub use stampdb_codec::{FromValue, Value, ValueKind};
pub use store::Store;
