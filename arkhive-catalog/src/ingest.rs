//! Ties the importer chain to projection: reads the stored content
//! hash, runs the chain, projects on change, and only then persists
//! the new hash — so a crash mid-projection never leaves a committed
//! hash pointing at unprojected data.

use crate::importer::{ImportError, import_catalog};
use crate::project::{ProjectError, project_catalog};
use arkhive_model::DB_HASH_VARIABLE;
use arkhive_store::{Connection, operations, queries};
use base64::Engine;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("catalog import failed: {0}")]
    Import(#[from] ImportError),
    #[error("catalog projection failed: {0}")]
    Project(#[from] ProjectError),
    #[error("store error: {0}")]
    Store(#[from] operations::OperationError),
}

/// Runs one ingest cycle. Returns `true` if a new catalog was projected,
/// `false` if the stored catalog was already current.
pub fn run_ingest(conn: &mut Connection, base_dir: &Path) -> Result<bool, IngestError> {
    let stored_hash = queries::get_user_variable(conn, DB_HASH_VARIABLE)?
        .and_then(|encoded| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(encoded).ok());

    let Some(imported) = import_catalog(base_dir, stored_hash.as_deref())? else {
        return Ok(false);
    };

    project_catalog(conn, &imported.document)?;
    let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&imported.hash);
    operations::set_user_variable(conn, DB_HASH_VARIABLE, Some(&encoded))?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkhive_store::open_memory;

    #[test]
    fn ingest_is_noop_without_any_catalog_file() {
        let mut conn = open_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        assert!(!run_ingest(&mut conn, dir.path()).unwrap());
    }

    #[test]
    fn ingest_projects_and_stores_hash_once() {
        let mut conn = open_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("db.json"),
            br#"{"consoles":{"nes":{"core_location":"nes_libretro","name":"NES"}}}"#,
        )
        .unwrap();

        assert!(run_ingest(&mut conn, dir.path()).unwrap());
        let hash = queries::get_user_variable(&conn, DB_HASH_VARIABLE)
            .unwrap()
            .unwrap();
        assert!(!hash.is_empty());

        // Second run with the same bytes must not re-project.
        assert!(!run_ingest(&mut conn, dir.path()).unwrap());
    }

    #[test]
    fn ingest_reprojects_on_catalog_change() {
        let mut conn = open_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("db.json"),
            br#"{"consoles":{"nes":{"core_location":"nes_libretro","name":"NES"}}}"#,
        )
        .unwrap();
        run_ingest(&mut conn, dir.path()).unwrap();

        std::fs::write(
            dir.path().join("db.json"),
            br#"{"consoles":{"snes":{"core_location":"snes_libretro","name":"SNES"}}}"#,
        )
        .unwrap();
        assert!(run_ingest(&mut conn, dir.path()).unwrap());

        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM consoles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
