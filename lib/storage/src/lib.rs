//! Persistence for the vismatch catalog: a JSON-lines write-ahead log,
//! gzip snapshots with SHA-256 checksums, and the [`StorageManager`] that
//! ties them to an in-memory catalog.

pub mod manager;
pub mod snapshot;
pub mod wal;

pub use manager::{
    CatalogStats, Pagination, ProductPage, ProductView, StorageManager, CATALOG_NAME,
    DEFAULT_PAGE_SIZE,
};
pub use snapshot::{CatalogSnapshot, SnapshotDescription, SnapshotManager};
pub use wal::{WalRecord, WriteAheadLog};
