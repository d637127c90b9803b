//! Persistence traits for wetland records.
//!
//! Reads that do not feed the reconciler go straight through
//! [`WetlandStore`]. Every write happens inside a [`WetlandTransaction`]:
//! the existence scan that feeds [`crate::GeometryReconciler`] and the write
//! of its result must observe the same state, so both run on the
//! transaction. Dropping a transaction without calling
//! [`WetlandTransaction::commit`] discards its writes.

#[cfg(feature = "store-sqlite")]
mod schema;
#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
use std::path::PathBuf;

use thiserror::Error;

use crate::{
    AreaCover, GeometryError, GeometryUpdate, Wetland, WetlandDraft, WetlandGeometryRecord,
    WetlandId,
};

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteTransaction, SqliteWetlandStore};

/// Errors raised by wetland stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No wetland carries the requested id.
    #[error("wetland {id} does not exist")]
    NotFound {
        /// Requested identifier.
        id: WetlandId,
    },
    /// A persisted geometry could not be decoded.
    #[error("stored geometry of wetland {id} is invalid: {source}")]
    Geometry {
        /// Wetland whose geometry failed to decode.
        id: WetlandId,
        /// Decoder failure.
        #[source]
        source: GeometryError,
    },
    /// A persisted column held an unexpected value.
    #[error("column {column} of wetland {id} is corrupt: {message}")]
    CorruptRow {
        /// Wetland whose row is corrupt.
        id: WetlandId,
        /// Offending column.
        column: &'static str,
        /// Decoder message.
        message: String,
    },
    /// Opening the SQLite database failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to open SQLite database at {path}: {source}")]
    OpenDatabase {
        /// Location of the database on disk.
        path: PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// A schema migration step failed.
    #[cfg(feature = "store-sqlite")]
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Name of the failing step.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The database was created by an incompatible schema version.
    #[cfg(feature = "store-sqlite")]
    #[error("expected wetland schema version {expected} but found {found}")]
    SchemaVersion {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
    /// Generic SQLite failure.
    #[cfg(feature = "store-sqlite")]
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
}

/// Read access to the contours the reconciler compares against.
pub trait WetlandGeometryRepository {
    /// Every persisted wetland contour, ordered by id.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails or a contour cannot be
    /// decoded.
    fn list_all(&self) -> Result<Vec<WetlandGeometryRecord>, StoreError>;
}

/// Unit of work over a [`WetlandStore`].
///
/// Implementations must isolate the transaction from concurrent writers for
/// its whole lifetime, so that a contour inserted elsewhere cannot slip in
/// between [`WetlandGeometryRepository::list_all`] and the write.
pub trait WetlandTransaction: WetlandGeometryRepository {
    /// Fetch a wetland as seen by this transaction.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn get(&self, id: WetlandId) -> Result<Option<Wetland>, StoreError>;

    /// Insert a draft and return the persisted wetland.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn insert(&mut self, draft: WetlandDraft) -> Result<Wetland, StoreError>;

    /// Replace the contour of a wetland.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn update_geometry(
        &mut self,
        id: WetlandId,
        update: &GeometryUpdate,
    ) -> Result<Wetland, StoreError>;

    /// Remove a wetland with its co-authors, criteria and area covers.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] for an unknown id.
    fn delete(&mut self, id: WetlandId) -> Result<(), StoreError>;

    /// Replace the reference-area covers recorded for a wetland.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn replace_area_covers(&mut self, id: WetlandId, covers: &[AreaCover])
    -> Result<(), StoreError>;

    /// Make every write of the transaction visible.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend refuses the commit; nothing
    /// is persisted in that case.
    fn commit(self) -> Result<(), StoreError>;
}

/// Transactional wetland persistence.
///
/// The store itself is a [`WetlandGeometryRepository`] over committed
/// contours. Reading through it takes no write lock, which suits previews
/// that never persist their result.
pub trait WetlandStore: WetlandGeometryRepository {
    /// Transaction type borrowed from the store.
    type Transaction<'a>: WetlandTransaction
    where
        Self: 'a;

    /// Start a serialised transaction.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend cannot start one.
    fn begin(&mut self) -> Result<Self::Transaction<'_>, StoreError>;

    /// Fetch a committed wetland.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn get(&self, id: WetlandId) -> Result<Option<Wetland>, StoreError>;

    /// Number of committed wetlands.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn count(&self) -> Result<u64, StoreError>;

    /// Committed wetlands ordered by id, skipping `offset` and returning at
    /// most `limit`.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn page(&self, limit: u32, offset: u64) -> Result<Vec<Wetland>, StoreError>;

    /// Reference-area covers recorded for a wetland.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backend fails.
    fn area_covers(&self, id: WetlandId) -> Result<Vec<AreaCover>, StoreError>;
}
