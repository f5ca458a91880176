//! Config Entries
//!
//! Persistence for finished configuration flows. A config entry is the
//! record an integration instance is created from: a title, the data the
//! flow collected, and bookkeeping (ids, versions, timestamps).
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntries`] - Indexed, storage-backed collection of entries
//! - [`Storage`] - Versioned JSON files under `.storage/`
//!
//! # Storage
//!
//! Config entries are persisted in `.storage/core.config_entries` with
//! version tracking.

pub mod entry;
pub mod manager;
pub mod storage;

// Re-export main types
pub use entry::ConfigEntry;

pub use manager::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, STORAGE_KEY,
    STORAGE_MINOR_VERSION, STORAGE_VERSION,
};

pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};
