//! SQLite schema creation and migration.

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("migration error: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when adding migrations.
pub const CURRENT_VERSION: i32 = 2;

/// The on-disk filename for the store, preserved for compatibility with
/// existing installs.
pub const DATABASE_FILE_NAME: &str = "data.sqllite3";

/// Create all tables and indexes if they don't exist.
///
/// Idempotent — safe to call on an existing database.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    set_schema_version(conn, CURRENT_VERSION)?;
    Ok(())
}

/// Open or create the store at the given path.
pub fn open_database(path: &std::path::Path) -> Result<Connection, SchemaError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let version = get_schema_version(&conn)?;
    if version == 0 {
        create_schema(&conn)?;
    } else if version < CURRENT_VERSION {
        migrate(&conn, version)?;
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for tests.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), SchemaError> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Run migrations from `from_version` up to [`CURRENT_VERSION`]. A
/// fresh install never reaches here — `create_schema` already lays
/// down `CURRENT_VERSION`'s tables in full — this only patches a store
/// opened from an older install.
fn migrate(conn: &Connection, from_version: i32) -> Result<(), SchemaError> {
    if from_version > CURRENT_VERSION {
        return Err(SchemaError::VersionMismatch {
            expected: CURRENT_VERSION,
            found: from_version,
        });
    }

    let mut version = from_version;
    while version < CURRENT_VERSION {
        match version {
            1 => {
                conn.execute_batch(
                    "ALTER TABLE consoles ADD COLUMN language_variable_name TEXT;",
                )?;
            }
            _ => {}
        }
        version += 1;
        set_schema_version(conn, version)?;
    }

    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS user_variables (
    name TEXT PRIMARY KEY,
    value TEXT
);

CREATE TABLE IF NOT EXISTS consoles (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    core_location TEXT NOT NULL,
    single_file BOOLEAN NOT NULL DEFAULT 0,
    is_embedded BOOLEAN NOT NULL DEFAULT 0,
    language_variable_name TEXT
);

CREATE TABLE IF NOT EXISTS console_file_types (
    console_slug TEXT NOT NULL REFERENCES consoles(slug),
    file_type TEXT NOT NULL,
    action TEXT NOT NULL,
    PRIMARY KEY (console_slug, file_type)
);

CREATE TABLE IF NOT EXISTS console_configs (
    console_slug TEXT NOT NULL REFERENCES consoles(slug),
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    level TEXT NOT NULL,
    PRIMARY KEY (console_slug, name, level)
);

CREATE TABLE IF NOT EXISTS console_languages (
    console_slug TEXT NOT NULL REFERENCES consoles(slug),
    tag INTEGER NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (console_slug, tag, name)
);

CREATE TABLE IF NOT EXISTS console_plugins (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    console_slug TEXT NOT NULL REFERENCES consoles(slug),
    plugin_type TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_console_plugins_console ON console_plugins(console_slug);

CREATE TABLE IF NOT EXISTS console_plugin_files (
    plugin_id INTEGER NOT NULL REFERENCES console_plugins(id),
    url TEXT NOT NULL,
    destination TEXT,
    collection_path TEXT,
    PRIMARY KEY (plugin_id, url)
);

CREATE TABLE IF NOT EXISTS games (
    slug TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    console_slug TEXT NOT NULL REFERENCES consoles(slug),
    background_color TEXT,
    background_image TEXT,
    logo TEXT,
    executable TEXT,
    insertion_date TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX IF NOT EXISTS idx_games_console ON games(console_slug);

CREATE TABLE IF NOT EXISTS game_disks (
    game_slug TEXT NOT NULL REFERENCES games(slug),
    disk_number INTEGER NOT NULL,
    url TEXT NOT NULL,
    image TEXT,
    collection_path TEXT,
    PRIMARY KEY (game_slug, disk_number)
);

CREATE TABLE IF NOT EXISTS game_configs (
    game_slug TEXT NOT NULL REFERENCES games(slug),
    name TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (game_slug, name)
);

CREATE TABLE IF NOT EXISTS game_additional_files (
    game_slug TEXT NOT NULL REFERENCES games(slug),
    name TEXT NOT NULL,
    data BLOB NOT NULL,
    PRIMARY KEY (game_slug, name)
);

CREATE TABLE IF NOT EXISTS tools (
    slug TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    collection_path TEXT,
    destination TEXT
);

CREATE TABLE IF NOT EXISTS tool_file_types (
    tool_slug TEXT NOT NULL REFERENCES tools(slug),
    file_type TEXT NOT NULL,
    PRIMARY KEY (tool_slug, file_type)
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_memory_lands_on_current_version() {
        let conn = open_memory().unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn migrate_adds_language_variable_name_to_a_version_one_install() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER NOT NULL, applied_at TEXT NOT NULL DEFAULT (datetime('now')));
             CREATE TABLE consoles (
                 slug TEXT PRIMARY KEY,
                 name TEXT NOT NULL,
                 core_location TEXT NOT NULL,
                 single_file BOOLEAN NOT NULL DEFAULT 0,
                 is_embedded BOOLEAN NOT NULL DEFAULT 0
             );
             INSERT INTO consoles (slug, name, core_location) VALUES ('nes', 'NES', 'nestopia_libretro');
             INSERT INTO schema_version (version) VALUES (1);",
        )
        .unwrap();

        migrate(&conn, 1).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), CURRENT_VERSION);
        conn.execute(
            "UPDATE consoles SET language_variable_name = 'LANG' WHERE slug = 'nes'",
            [],
        )
        .unwrap();
        let value: String = conn
            .query_row(
                "SELECT language_variable_name FROM consoles WHERE slug = 'nes'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(value, "LANG");
    }

    #[test]
    fn migrate_rejects_a_future_version() {
        let conn = open_memory().unwrap();
        assert!(matches!(
            migrate(&conn, CURRENT_VERSION + 1),
            Err(SchemaError::VersionMismatch { .. })
        ));
    }
}
