//! Read operations for all entity types.

use crate::operations::OperationError;
use arkhive_model::{
    Console, ConsolePlugin, ConsolePluginsFile, Game, Tool,
};
use rusqlite::{Connection, params};

/// Reads a user variable's value, or `None` if the row doesn't exist.
pub fn get_user_variable(conn: &Connection, name: &str) -> Result<Option<String>, OperationError> {
    let result = conn.query_row(
        "SELECT value FROM user_variables WHERE name = ?1",
        params![name],
        |row| row.get::<_, Option<String>>(0),
    );
    match result {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_consoles(conn: &Connection) -> Result<Vec<Console>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT slug, name, core_location, single_file, is_embedded, language_variable_name
         FROM consoles ORDER BY slug",
    )?;
    let rows = stmt.query_map(params![], |row| {
        Ok(Console {
            slug: row.get(0)?,
            name: row.get(1)?,
            core_location: row.get(2)?,
            single_file: row.get(3)?,
            is_embedded: row.get(4)?,
            language_variable_name: row.get(5)?,
        })
    })?;
    rows.collect::<Result<_, _>>().map_err(Into::into)
}

pub fn find_console(conn: &Connection, slug: &str) -> Result<Option<Console>, OperationError> {
    let result = conn.query_row(
        "SELECT slug, name, core_location, single_file, is_embedded, language_variable_name
         FROM consoles WHERE slug = ?1",
        params![slug],
        |row| {
            Ok(Console {
                slug: row.get(0)?,
                name: row.get(1)?,
                core_location: row.get(2)?,
                single_file: row.get(3)?,
                is_embedded: row.get(4)?,
                language_variable_name: row.get(5)?,
            })
        },
    );
    match result {
        Ok(console) => Ok(Some(console)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Every plugin of type `bios` for `console_slug`, with its files attached.
pub fn list_bios_plugins(
    conn: &Connection,
    console_slug: &str,
) -> Result<Vec<(ConsolePlugin, Vec<ConsolePluginsFile>)>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, console_slug, plugin_type FROM console_plugins
         WHERE console_slug = ?1 ORDER BY id",
    )?;
    let plugins: Vec<ConsolePlugin> = stmt
        .query_map(params![console_slug], |row| {
            Ok(ConsolePlugin {
                id: row.get(0)?,
                console_slug: row.get(1)?,
                plugin_type: row.get(2)?,
            })
        })?
        .collect::<Result<_, _>>()?;

    let mut result = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        let mut file_stmt = conn.prepare(
            "SELECT plugin_id, url, destination, collection_path
             FROM console_plugin_files WHERE plugin_id = ?1 ORDER BY url",
        )?;
        let files: Vec<ConsolePluginsFile> = file_stmt
            .query_map(params![plugin.id], |row| {
                Ok(ConsolePluginsFile {
                    plugin_id: row.get(0)?,
                    url: row.get(1)?,
                    destination: row.get(2)?,
                    collection_path: row.get(3)?,
                })
            })?
            .collect::<Result<_, _>>()?;
        result.push((plugin, files));
    }
    Ok(result)
}

pub fn list_games_for_console(
    conn: &Connection,
    console_slug: &str,
) -> Result<Vec<Game>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT slug, name, console_slug, background_color, background_image, logo, executable, insertion_date
         FROM games WHERE console_slug = ?1 ORDER BY slug",
    )?;
    let rows = stmt.query_map(params![console_slug], |row| {
        Ok(Game {
            slug: row.get(0)?,
            name: row.get(1)?,
            console_slug: row.get(2)?,
            background_color: row.get(3)?,
            background_image: row.get(4)?,
            logo: row.get(5)?,
            executable: row.get(6)?,
            insertion_date: row.get(7)?,
        })
    })?;
    rows.collect::<Result<_, _>>().map_err(Into::into)
}

pub fn list_tools(conn: &Connection) -> Result<Vec<Tool>, OperationError> {
    let mut stmt =
        conn.prepare("SELECT slug, url, collection_path, destination FROM tools ORDER BY slug")?;
    let rows = stmt.query_map(params![], |row| {
        Ok(Tool {
            slug: row.get(0)?,
            url: row.get(1)?,
            collection_path: row.get(2)?,
            destination: row.get(3)?,
        })
    })?;
    rows.collect::<Result<_, _>>().map_err(Into::into)
}
