//! SQLite tables backing [`super::SqliteWetlandStore`].

use rusqlite::{Connection, OptionalExtension, Transaction};

use super::StoreError;

/// Version recorded in `wetland_schema_version`.
pub(crate) const SCHEMA_VERSION: i64 = 1;

/// Create the wetland tables if needed and check the recorded version.
pub(crate) fn initialise_schema(connection: &mut Connection) -> Result<(), StoreError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| StoreError::Migration {
            step: "enable foreign keys",
            source,
        })?;

    let transaction = connection
        .transaction()
        .map_err(|source| StoreError::Migration {
            step: "begin schema transaction",
            source,
        })?;

    create_wetland_tables(&transaction)?;
    create_access_tables(&transaction)?;
    ensure_schema_version(&transaction)?;

    transaction
        .commit()
        .map_err(|source| StoreError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_wetland_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create wetlands",
        "CREATE TABLE IF NOT EXISTS wetlands (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            main_name TEXT NOT NULL CHECK (length(trim(main_name)) > 0),
            secondary_name TEXT,
            create_author INTEGER NOT NULL,
            update_author INTEGER NOT NULL,
            create_date TEXT NOT NULL,
            update_date TEXT NOT NULL,
            geom_wkt TEXT NOT NULL,
            srid INTEGER NOT NULL DEFAULT 4326,
            area_ha REAL NOT NULL CHECK (area_ha >= 0),
            is_intersected INTEGER NOT NULL,
            sdage_id INTEGER,
            delimitation_list_id TEXT NOT NULL,
            dataset_id INTEGER
        )",
    )?;
    run_migration_step(
        transaction,
        "create wetland_delimitations",
        "CREATE TABLE IF NOT EXISTS wetland_delimitations (
            delimitation_list_id TEXT NOT NULL,
            criterion_id INTEGER NOT NULL,
            PRIMARY KEY (delimitation_list_id, criterion_id)
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create wetland_coauthors",
        "CREATE TABLE IF NOT EXISTS wetland_coauthors (
            wetland_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            PRIMARY KEY (wetland_id, user_id),
            FOREIGN KEY (wetland_id) REFERENCES wetlands(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create wetland_area_covers",
        "CREATE TABLE IF NOT EXISTS wetland_area_covers (
            wetland_id INTEGER NOT NULL,
            area_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            cover_percent INTEGER NOT NULL CHECK (cover_percent BETWEEN 0 AND 100),
            PRIMARY KEY (wetland_id, kind, area_id),
            FOREIGN KEY (wetland_id) REFERENCES wetlands(id) ON DELETE CASCADE
        ) WITHOUT ROWID",
    )
}

fn create_access_tables(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create dataset_actors",
        "CREATE TABLE IF NOT EXISTS dataset_actors (
            dataset_id INTEGER NOT NULL,
            user_id INTEGER,
            organism_id INTEGER,
            CHECK ((user_id IS NULL) <> (organism_id IS NULL))
        )",
    )?;
    run_migration_step(
        transaction,
        "index dataset_actors",
        "CREATE INDEX IF NOT EXISTS idx_dataset_actors_actor
            ON dataset_actors(user_id, organism_id, dataset_id)",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), StoreError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS wetland_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing_version: Option<i64> = transaction
        .query_row(
            "SELECT version FROM wetland_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| StoreError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing_version {
        Some(SCHEMA_VERSION) => Ok(()),
        Some(found) => Err(StoreError::SchemaVersion {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO wetland_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| StoreError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), StoreError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| StoreError::Migration { step, source })
}
