//! Snapshot persistence of a session manager.
//!
//! `snapshot` defines the versioned encoding, `file_storage` moves it to and from disk.

pub mod file_storage;
pub mod snapshot;

pub use file_storage::SnapshotFile;
pub use snapshot::{SessionRecord, Snapshot, SNAPSHOT_VERSION};
