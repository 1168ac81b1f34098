//! Write operations for all entity types.
//!
//! Parent rows are upserted; child collections are cleared and
//! re-inserted inside the caller's transaction, so a single call to
//! `upsert_console` (or `upsert_game`, `upsert_tool`) fully replaces an
//! entity's children with the set passed in — the idempotence contract
//! the projection layer depends on.

use arkhive_model::{
    Console, ConsoleConfig, ConsoleFileType, ConsoleLanguage, ConsolePlugin, ConsolePluginsFile,
    Game, GameAdditionalFile, GameConfig, GameDisk, Tool, ToolFilesType,
};
use rusqlite::{Connection, params};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
}

// ── Console ─────────────────────────────────────────────────────────────────

pub fn upsert_console(conn: &Connection, console: &Console) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO consoles (slug, name, core_location, single_file, is_embedded, language_variable_name)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(slug) DO UPDATE SET
             name = excluded.name,
             core_location = excluded.core_location,
             single_file = excluded.single_file,
             is_embedded = excluded.is_embedded,
             language_variable_name = excluded.language_variable_name",
        params![
            console.slug,
            console.name,
            console.core_location,
            console.single_file,
            console.is_embedded,
            console.language_variable_name,
        ],
    )?;
    Ok(())
}

pub fn replace_console_file_types(
    conn: &Connection,
    console_slug: &str,
    file_types: &[ConsoleFileType],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM console_file_types WHERE console_slug = ?1",
        params![console_slug],
    )?;
    for ft in file_types {
        conn.execute(
            "INSERT INTO console_file_types (console_slug, file_type, action) VALUES (?1, ?2, ?3)",
            params![ft.console_slug, ft.file_type, ft.action],
        )?;
    }
    Ok(())
}

pub fn replace_console_configs(
    conn: &Connection,
    console_slug: &str,
    configs: &[ConsoleConfig],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM console_configs WHERE console_slug = ?1",
        params![console_slug],
    )?;
    for cfg in configs {
        conn.execute(
            "INSERT INTO console_configs (console_slug, name, value, level) VALUES (?1, ?2, ?3, ?4)",
            params![cfg.console_slug, cfg.name, cfg.value, cfg.level.as_str()],
        )?;
    }
    Ok(())
}

pub fn replace_console_languages(
    conn: &Connection,
    console_slug: &str,
    languages: &[ConsoleLanguage],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM console_languages WHERE console_slug = ?1",
        params![console_slug],
    )?;
    for lang in languages {
        conn.execute(
            "INSERT INTO console_languages (console_slug, tag, name) VALUES (?1, ?2, ?3)",
            params![lang.console_slug, lang.tag, lang.name],
        )?;
    }
    Ok(())
}

/// Replaces every plugin (and its files) belonging to `console_slug`.
pub fn replace_console_plugins(
    conn: &Connection,
    console_slug: &str,
    plugins: &[(ConsolePlugin, Vec<ConsolePluginsFile>)],
) -> Result<(), OperationError> {
    let existing: Vec<i64> = {
        let mut stmt =
            conn.prepare("SELECT id FROM console_plugins WHERE console_slug = ?1")?;
        let rows = stmt.query_map(params![console_slug], |row| row.get(0))?;
        rows.collect::<Result<_, _>>()?
    };
    for id in existing {
        conn.execute(
            "DELETE FROM console_plugin_files WHERE plugin_id = ?1",
            params![id],
        )?;
        conn.execute("DELETE FROM console_plugins WHERE id = ?1", params![id])?;
    }

    for (plugin, files) in plugins {
        conn.execute(
            "INSERT INTO console_plugins (console_slug, plugin_type) VALUES (?1, ?2)",
            params![plugin.console_slug, plugin.plugin_type],
        )?;
        let plugin_id = conn.last_insert_rowid();
        for file in files {
            conn.execute(
                "INSERT INTO console_plugin_files (plugin_id, url, destination, collection_path)
                 VALUES (?1, ?2, ?3, ?4)",
                params![plugin_id, file.url, file.destination, file.collection_path],
            )?;
        }
    }
    Ok(())
}

// ── Game ────────────────────────────────────────────────────────────────────

pub fn upsert_game(conn: &Connection, game: &Game) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO games (slug, name, console_slug, background_color, background_image, logo, executable, insertion_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(slug) DO UPDATE SET
             name = excluded.name,
             console_slug = excluded.console_slug,
             background_color = excluded.background_color,
             background_image = excluded.background_image,
             logo = excluded.logo,
             executable = excluded.executable",
        params![
            game.slug,
            game.name,
            game.console_slug,
            game.background_color,
            game.background_image,
            game.logo,
            game.executable,
            game.insertion_date,
        ],
    )?;
    Ok(())
}

pub fn replace_game_disks(
    conn: &Connection,
    game_slug: &str,
    disks: &[GameDisk],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM game_disks WHERE game_slug = ?1",
        params![game_slug],
    )?;
    for disk in disks {
        conn.execute(
            "INSERT INTO game_disks (game_slug, disk_number, url, image, collection_path)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![disk.game_slug, disk.disk_number, disk.url, disk.image, disk.collection_path],
        )?;
    }
    Ok(())
}

pub fn replace_game_configs(
    conn: &Connection,
    game_slug: &str,
    configs: &[GameConfig],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM game_configs WHERE game_slug = ?1",
        params![game_slug],
    )?;
    for cfg in configs {
        conn.execute(
            "INSERT INTO game_configs (game_slug, name, value) VALUES (?1, ?2, ?3)",
            params![cfg.game_slug, cfg.name, cfg.value],
        )?;
    }
    Ok(())
}

pub fn replace_game_additional_files(
    conn: &Connection,
    game_slug: &str,
    files: &[GameAdditionalFile],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM game_additional_files WHERE game_slug = ?1",
        params![game_slug],
    )?;
    for file in files {
        conn.execute(
            "INSERT INTO game_additional_files (game_slug, name, data) VALUES (?1, ?2, ?3)",
            params![file.game_slug, file.name, file.data],
        )?;
    }
    Ok(())
}

// ── Tool ────────────────────────────────────────────────────────────────────

pub fn upsert_tool(conn: &Connection, tool: &Tool) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO tools (slug, url, collection_path, destination)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(slug) DO UPDATE SET
             url = excluded.url,
             collection_path = excluded.collection_path,
             destination = excluded.destination",
        params![tool.slug, tool.url, tool.collection_path, tool.destination],
    )?;
    Ok(())
}

pub fn replace_tool_file_types(
    conn: &Connection,
    tool_slug: &str,
    file_types: &[ToolFilesType],
) -> Result<(), OperationError> {
    conn.execute(
        "DELETE FROM tool_file_types WHERE tool_slug = ?1",
        params![tool_slug],
    )?;
    for ft in file_types {
        conn.execute(
            "INSERT INTO tool_file_types (tool_slug, file_type) VALUES (?1, ?2)",
            params![ft.tool_slug, ft.file_type],
        )?;
    }
    Ok(())
}

// ── User variables ──────────────────────────────────────────────────────────

pub fn set_user_variable(
    conn: &Connection,
    name: &str,
    value: Option<&str>,
) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO user_variables (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        params![name, value],
    )?;
    Ok(())
}
