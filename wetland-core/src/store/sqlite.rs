//! SQLite-backed wetland store.
//!
//! Geometries are persisted as WKT text in SRID 4326. Write transactions are
//! opened with `BEGIN IMMEDIATE`, which takes the database write lock up
//! front: a second writer blocks (up to the busy timeout) before it can read
//! the contours it would reconcile against.

use std::{collections::BTreeSet, path::Path, time::Duration};

use chrono::{DateTime, Utc};
use rusqlite::{
    Connection, OptionalExtension, Row, Transaction, TransactionBehavior, params,
};
use uuid::Uuid;

use crate::geometry::{from_wkt, to_wkt};
use crate::{
    AreaCover, DatasetActor, DatasetDirectory, DatasetId, DirectoryError, GeometryUpdate,
    OrganismId, UserId, Wetland, WetlandDraft, WetlandGeometryRecord, WetlandId,
};

use super::schema::initialise_schema;
use super::{StoreError, WetlandGeometryRepository, WetlandStore, WetlandTransaction};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const WETLAND_COLUMNS: &str = "id, code, main_name, secondary_name, create_author, \
    update_author, create_date, update_date, geom_wkt, area_ha, is_intersected, sdage_id, \
    delimitation_list_id, dataset_id";

/// Wetland store persisted in a SQLite database.
///
/// # Examples
/// ```
/// use wetland_core::{SqliteWetlandStore, WetlandStore};
///
/// let store = SqliteWetlandStore::open_in_memory().expect("create store");
/// assert_eq!(store.count().expect("count"), 0);
/// ```
#[derive(Debug)]
pub struct SqliteWetlandStore {
    connection: Connection,
}

impl SqliteWetlandStore {
    /// Open (creating if needed) the database at `path`.
    ///
    /// # Errors
    /// Returns [`StoreError::OpenDatabase`] when the file cannot be opened
    /// and [`StoreError::Migration`] or [`StoreError::SchemaVersion`] when the
    /// schema cannot be prepared.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let location = path.as_ref();
        let connection = Connection::open(location).map_err(|source| StoreError::OpenDatabase {
            path: location.to_path_buf(),
            source,
        })?;
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the schema cannot be prepared.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, StoreError> {
        connection.busy_timeout(BUSY_TIMEOUT)?;
        initialise_schema(&mut connection)?;
        Ok(Self { connection })
    }

    /// Record that `actor` may act on `dataset`.
    ///
    /// # Errors
    /// Returns [`StoreError::Database`] when the insert fails.
    pub fn add_dataset_actor(
        &self,
        dataset: DatasetId,
        actor: DatasetActor,
    ) -> Result<(), StoreError> {
        let (user, organism) = match actor {
            DatasetActor::User(user) => (Some(user.0), None),
            DatasetActor::Organism(organism) => (None, Some(organism.0)),
        };
        self.connection.execute(
            "INSERT INTO dataset_actors (dataset_id, user_id, organism_id) VALUES (?1, ?2, ?3)",
            params![dataset.0, user, organism],
        )?;
        Ok(())
    }
}

// Autocommit read of committed contours; takes no write lock.
impl WetlandGeometryRepository for SqliteWetlandStore {
    fn list_all(&self) -> Result<Vec<WetlandGeometryRecord>, StoreError> {
        list_geometries(&self.connection)
    }
}

impl WetlandStore for SqliteWetlandStore {
    type Transaction<'a>
        = SqliteTransaction<'a>
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Transaction<'_>, StoreError> {
        let inner = self
            .connection
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteTransaction { inner })
    }

    fn get(&self, id: WetlandId) -> Result<Option<Wetland>, StoreError> {
        fetch_wetland(&self.connection, id)
    }

    fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = self
            .connection
            .query_row("SELECT COUNT(*) FROM wetlands", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn page(&self, limit: u32, offset: u64) -> Result<Vec<Wetland>, StoreError> {
        let sql = format!("SELECT {WETLAND_COLUMNS} FROM wetlands ORDER BY id LIMIT ?1 OFFSET ?2");
        let mut statement = self.connection.prepare(&sql)?;
        let rows = statement
            .query_map(
                params![i64::from(limit), i64::try_from(offset).unwrap_or(i64::MAX)],
                read_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|row| hydrate(&self.connection, row))
            .collect()
    }

    fn area_covers(&self, id: WetlandId) -> Result<Vec<AreaCover>, StoreError> {
        let mut statement = self.connection.prepare(
            "SELECT area_id, kind, cover_percent FROM wetland_area_covers
                WHERE wetland_id = ?1 ORDER BY kind, area_id",
        )?;
        let rows = statement
            .query_map([id.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u8>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(area_id, label, cover_percent)| {
                let kind = label.parse().map_err(|err: crate::ReferenceAreaError| {
                    StoreError::CorruptRow {
                        id,
                        column: "kind",
                        message: err.to_string(),
                    }
                })?;
                Ok(AreaCover {
                    area_id,
                    kind,
                    cover_percent,
                })
            })
            .collect()
    }
}

impl DatasetDirectory for SqliteWetlandStore {
    fn user_datasets(
        &self,
        user: UserId,
        organism: Option<OrganismId>,
        only_own: bool,
    ) -> Result<BTreeSet<DatasetId>, DirectoryError> {
        let lookup = || -> rusqlite::Result<BTreeSet<DatasetId>> {
            let mut statement = self.connection.prepare(
                "SELECT DISTINCT dataset_id FROM dataset_actors
                    WHERE user_id = ?1
                       OR (?3 = 0 AND organism_id IS NOT NULL AND organism_id = ?2)",
            )?;
            statement
                .query_map(
                    params![user.0, organism.map(|id| id.0), only_own],
                    |row| row.get::<_, i64>(0).map(DatasetId),
                )?
                .collect()
        };
        lookup().map_err(|err| DirectoryError {
            user,
            message: err.to_string(),
        })
    }
}

/// Write transaction over a [`SqliteWetlandStore`].
///
/// Rolled back when dropped without [`WetlandTransaction::commit`].
#[derive(Debug)]
pub struct SqliteTransaction<'a> {
    inner: Transaction<'a>,
}

impl WetlandGeometryRepository for SqliteTransaction<'_> {
    fn list_all(&self) -> Result<Vec<WetlandGeometryRecord>, StoreError> {
        list_geometries(&self.inner)
    }
}

impl WetlandTransaction for SqliteTransaction<'_> {
    fn get(&self, id: WetlandId) -> Result<Option<Wetland>, StoreError> {
        fetch_wetland(&self.inner, id)
    }

    fn insert(&mut self, draft: WetlandDraft) -> Result<Wetland, StoreError> {
        self.inner.execute(
            "INSERT INTO wetlands (code, main_name, secondary_name, create_author,
                update_author, create_date, update_date, geom_wkt, area_ha, is_intersected,
                sdage_id, delimitation_list_id, dataset_id)
             VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                draft.code,
                draft.main_name,
                draft.secondary_name,
                draft.author.0,
                draft.created_at,
                to_wkt(&draft.geom),
                draft.area_ha,
                draft.is_intersected,
                draft.sdage_id,
                draft.delimitation_list_id.to_string(),
                draft.dataset_id.map(|id| id.0),
            ],
        )?;
        let id = WetlandId(self.inner.last_insert_rowid());
        {
            let mut statement = self.inner.prepare(
                "INSERT OR IGNORE INTO wetland_delimitations (delimitation_list_id, criterion_id)
                    VALUES (?1, ?2)",
            )?;
            let list_id = draft.delimitation_list_id.to_string();
            for criterion in &draft.delimitation_criteria {
                statement.execute(params![list_id, criterion])?;
            }
        }
        Ok(draft.into_wetland(id))
    }

    fn update_geometry(
        &mut self,
        id: WetlandId,
        update: &GeometryUpdate,
    ) -> Result<Wetland, StoreError> {
        let changed = self.inner.execute(
            "UPDATE wetlands
                SET geom_wkt = ?1, area_ha = ?2, is_intersected = ?3,
                    update_author = ?4, update_date = ?5
              WHERE id = ?6",
            params![
                to_wkt(&update.geom),
                update.area_ha,
                update.is_intersected,
                update.author.0,
                update.updated_at,
                id.0,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id });
        }
        self.inner.execute(
            "INSERT OR IGNORE INTO wetland_coauthors (wetland_id, user_id) VALUES (?1, ?2)",
            params![id.0, update.author.0],
        )?;
        fetch_wetland(&self.inner, id)?.ok_or(StoreError::NotFound { id })
    }

    fn delete(&mut self, id: WetlandId) -> Result<(), StoreError> {
        let list_id: String = self
            .inner
            .query_row(
                "SELECT delimitation_list_id FROM wetlands WHERE id = ?1",
                [id.0],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound { id })?;
        self.inner.execute(
            "DELETE FROM wetland_delimitations WHERE delimitation_list_id = ?1",
            [list_id],
        )?;
        self.inner
            .execute("DELETE FROM wetlands WHERE id = ?1", [id.0])?;
        Ok(())
    }

    fn replace_area_covers(
        &mut self,
        id: WetlandId,
        covers: &[AreaCover],
    ) -> Result<(), StoreError> {
        self.inner
            .execute("DELETE FROM wetland_area_covers WHERE wetland_id = ?1", [id.0])?;
        let mut statement = self.inner.prepare(
            "INSERT INTO wetland_area_covers (wetland_id, area_id, kind, cover_percent)
                VALUES (?1, ?2, ?3, ?4)",
        )?;
        for cover in covers {
            statement.execute(params![
                id.0,
                cover.area_id,
                cover.kind.as_str(),
                cover.cover_percent
            ])?;
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()?;
        Ok(())
    }
}

struct WetlandRow {
    id: i64,
    code: String,
    main_name: String,
    secondary_name: Option<String>,
    create_author: i64,
    update_author: i64,
    create_date: DateTime<Utc>,
    update_date: DateTime<Utc>,
    geom_wkt: String,
    area_ha: f64,
    is_intersected: bool,
    sdage_id: Option<i64>,
    delimitation_list_id: String,
    dataset_id: Option<i64>,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<WetlandRow> {
    Ok(WetlandRow {
        id: row.get(0)?,
        code: row.get(1)?,
        main_name: row.get(2)?,
        secondary_name: row.get(3)?,
        create_author: row.get(4)?,
        update_author: row.get(5)?,
        create_date: row.get(6)?,
        update_date: row.get(7)?,
        geom_wkt: row.get(8)?,
        area_ha: row.get(9)?,
        is_intersected: row.get(10)?,
        sdage_id: row.get(11)?,
        delimitation_list_id: row.get(12)?,
        dataset_id: row.get(13)?,
    })
}

fn list_geometries(connection: &Connection) -> Result<Vec<WetlandGeometryRecord>, StoreError> {
    let mut statement = connection.prepare("SELECT id, geom_wkt FROM wetlands ORDER BY id")?;
    let rows = statement
        .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter()
        .map(|(raw_id, wkt)| {
            let id = WetlandId(raw_id);
            let geom = from_wkt(&wkt).map_err(|source| StoreError::Geometry { id, source })?;
            Ok(WetlandGeometryRecord::persisted(id, geom))
        })
        .collect()
}

fn fetch_wetland(connection: &Connection, id: WetlandId) -> Result<Option<Wetland>, StoreError> {
    let sql = format!("SELECT {WETLAND_COLUMNS} FROM wetlands WHERE id = ?1");
    connection
        .query_row(&sql, [id.0], read_row)
        .optional()?
        .map(|row| hydrate(connection, row))
        .transpose()
}

fn hydrate(connection: &Connection, row: WetlandRow) -> Result<Wetland, StoreError> {
    let id = WetlandId(row.id);
    let geom = from_wkt(&row.geom_wkt).map_err(|source| StoreError::Geometry { id, source })?;
    let delimitation_list_id =
        Uuid::parse_str(&row.delimitation_list_id).map_err(|err| StoreError::CorruptRow {
            id,
            column: "delimitation_list_id",
            message: err.to_string(),
        })?;

    let mut criteria = connection.prepare_cached(
        "SELECT criterion_id FROM wetland_delimitations
            WHERE delimitation_list_id = ?1 ORDER BY criterion_id",
    )?;
    let delimitation_criteria = criteria
        .query_map([&row.delimitation_list_id], |r| r.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;

    let mut authors = connection.prepare_cached(
        "SELECT user_id FROM wetland_coauthors WHERE wetland_id = ?1 ORDER BY user_id",
    )?;
    let coauthors = authors
        .query_map([row.id], |r| r.get::<_, i64>(0).map(UserId))?
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(Wetland {
        id,
        code: row.code,
        main_name: row.main_name,
        secondary_name: row.secondary_name,
        create_author: UserId(row.create_author),
        update_author: UserId(row.update_author),
        create_date: row.create_date,
        update_date: row.update_date,
        geom,
        area_ha: row.area_ha,
        is_intersected: row.is_intersected,
        sdage_id: row.sdage_id,
        delimitation_list_id,
        delimitation_criteria,
        dataset_id: row.dataset_id.map(DatasetId),
        coauthors,
    })
}
