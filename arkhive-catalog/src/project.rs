//! Projects a decoded [`CatalogDocument`] into the relational store.
//!
//! The whole projection runs inside one transaction so a crash midway
//! never leaves the stored catalog hash pointing at half-written
//! entities (see [`crate::ingest`]).

use arkhive_model::{
    CatalogDocument, Console, ConsoleConfig, ConsoleConfigLevel, ConsoleFileType,
    ConsoleLanguage, ConsolePlugin, ConsolePluginsFile, Game, GameAdditionalFile, GameConfig,
    GameDisk, Tool, ToolFilesType,
};
use arkhive_store::operations;
use base64::Engine;
use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("store error: {0}")]
    Store(#[from] operations::OperationError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("game '{game}' references unknown console '{console}'")]
    UnknownConsole { game: String, console: String },
    #[error("game '{game}' configuration variable '{name}' has the wrong value format")]
    BadConfigValue { game: String, name: String },
    #[error("additional file '{name}' on game '{game}' is not valid base64url: {source}")]
    BadAdditionalFile {
        game: String,
        name: String,
        source: base64::DecodeError,
    },
}

/// Projects every console, game, and tool in `document` into the store.
/// Idempotent: re-running with the same document leaves the store in
/// the same observable state.
pub fn project_catalog(conn: &mut Connection, document: &CatalogDocument) -> Result<(), ProjectError> {
    let tx = conn.unchecked_transaction()?;

    for (slug, dto) in &document.consoles {
        project_console(&tx, slug, dto)?;
    }
    for (slug, dto) in &document.games {
        project_game(&tx, slug, dto)?;
    }
    for (slug, dto) in &document.win_tools {
        project_tool(&tx, slug, dto)?;
    }

    tx.commit()?;
    Ok(())
}

fn project_console(
    conn: &Connection,
    slug: &str,
    dto: &arkhive_model::ConsoleDto,
) -> Result<(), ProjectError> {
    let language_variable_name = dto
        .language
        .as_ref()
        .and_then(|l| l.variable_name.clone());

    operations::upsert_console(
        conn,
        &Console {
            slug: slug.to_string(),
            name: dto.name.clone(),
            core_location: dto.core_location.clone(),
            single_file: dto.single_file,
            is_embedded: dto.is_embedded,
            language_variable_name,
        },
    )?;

    let file_types: Vec<ConsoleFileType> = dto
        .file_types
        .iter()
        .flat_map(|(action, extensions)| {
            extensions.iter().map(move |ext| ConsoleFileType {
                console_slug: slug.to_string(),
                file_type: ext.clone(),
                action: action.clone(),
            })
        })
        .collect();
    operations::replace_console_file_types(conn, slug, &file_types)?;

    let mut configs = Vec::new();
    for (key, value) in &dto.extra {
        let Some(level) = ConsoleConfigLevel::from_str(key) else {
            continue;
        };
        if let Some(entries) = value.as_object() {
            for (name, value) in entries {
                if let Some(s) = value.as_str() {
                    configs.push(ConsoleConfig {
                        console_slug: slug.to_string(),
                        name: name.clone(),
                        value: s.to_string(),
                        level,
                    });
                }
            }
        }
    }
    operations::replace_console_configs(conn, slug, &configs)?;

    let languages: Vec<ConsoleLanguage> = dto
        .language
        .as_ref()
        .map(|l| {
            l.mapping
                .iter()
                .filter_map(|(tag, names)| {
                    tag.parse::<u32>().ok().map(|tag| (tag, names))
                })
                .flat_map(|(tag, names)| {
                    names.iter().map(move |name| ConsoleLanguage {
                        console_slug: slug.to_string(),
                        tag,
                        name: name.clone(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    operations::replace_console_languages(conn, slug, &languages)?;

    let mut plugins = Vec::new();
    for (plugin_type, plugin_dto) in &dto.plugins {
        let n = plugin_dto.files.len();
        let collection_paths = plugin_dto
            .collection_path
            .as_ref()
            .map(|v| v.expand(n).into_iter().map(Some).collect::<Vec<_>>())
            .unwrap_or_else(|| vec![None; n]);
        let destinations = plugin_dto
            .destination
            .as_ref()
            .map(|v| v.expand(n).into_iter().map(Some).collect::<Vec<_>>())
            .unwrap_or_else(|| vec![None; n]);

        let files: Vec<ConsolePluginsFile> = plugin_dto
            .files
            .iter()
            .enumerate()
            .map(|(i, url)| ConsolePluginsFile {
                plugin_id: 0,
                url: url.clone(),
                destination: destinations.get(i).cloned().flatten(),
                collection_path: collection_paths.get(i).cloned().flatten(),
            })
            .collect();

        plugins.push((
            ConsolePlugin {
                id: 0,
                console_slug: slug.to_string(),
                plugin_type: plugin_type.clone(),
            },
            files,
        ));
    }
    operations::replace_console_plugins(conn, slug, &plugins)?;

    Ok(())
}

fn project_game(
    conn: &Connection,
    slug: &str,
    dto: &arkhive_model::GameDto,
) -> Result<(), ProjectError> {
    if arkhive_store::queries::find_console(conn, &dto.console_slug)?.is_none() {
        return Err(ProjectError::UnknownConsole {
            game: slug.to_string(),
            console: dto.console_slug.clone(),
        });
    }

    operations::upsert_game(
        conn,
        &Game {
            slug: slug.to_string(),
            name: dto.name.clone(),
            console_slug: dto.console_slug.clone(),
            background_color: dto.background_color.clone(),
            background_image: dto.background_image.clone(),
            logo: dto.logo.clone(),
            executable: dto.executable.clone(),
            insertion_date: chrono::Utc::now().to_rfc3339(),
        },
    )?;

    let disk_count = dto.disk_image.as_ref().map(|v| v.len()).unwrap_or(1);
    let urls = dto.url.expand(disk_count);
    let images = dto.disk_image.clone().unwrap_or_default();
    let disks: Vec<GameDisk> = urls
        .into_iter()
        .enumerate()
        .map(|(i, url)| GameDisk {
            game_slug: slug.to_string(),
            disk_number: i as u32,
            url,
            image: images.get(i).cloned(),
            collection_path: dto.collection_path.clone(),
        })
        .collect();
    operations::replace_game_disks(conn, slug, &disks)?;

    let mut configs = Vec::with_capacity(dto.config.len());
    for (name, value) in &dto.config {
        let value = config_value_to_string(value).ok_or_else(|| ProjectError::BadConfigValue {
            game: slug.to_string(),
            name: name.clone(),
        })?;
        configs.push(GameConfig {
            game_slug: slug.to_string(),
            name: name.clone(),
            value,
        });
    }
    operations::replace_game_configs(conn, slug, &configs)?;

    let mut files = Vec::with_capacity(dto.additional_files.len());
    for entry in &dto.additional_files {
        let data = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(&entry.base64)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(&entry.base64))
            .map_err(|source| ProjectError::BadAdditionalFile {
                game: slug.to_string(),
                name: entry.name.clone(),
                source,
            })?;
        files.push(GameAdditionalFile {
            game_slug: slug.to_string(),
            name: entry.name.clone(),
            data,
        });
    }
    operations::replace_game_additional_files(conn, slug, &files)?;

    Ok(())
}

/// Catalog numbers are decoded as arbitrary-precision JSON numbers;
/// try an integer representation first, then fall back to a float.
fn config_value_to_string(value: &serde_json::Value) -> Option<String> {
    let n = value.as_number()?;
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    n.as_f64().map(|f| format!("{f}"))
}

fn project_tool(conn: &Connection, slug: &str, dto: &arkhive_model::ToolDto) -> Result<(), ProjectError> {
    operations::upsert_tool(
        conn,
        &Tool {
            slug: slug.to_string(),
            url: dto.url.clone(),
            collection_path: dto.collection_path.clone(),
            destination: dto.destination.clone(),
        },
    )?;

    let file_types: Vec<ToolFilesType> = dto
        .file_types
        .iter()
        .map(|ft| ToolFilesType {
            tool_slug: slug.to_string(),
            file_type: ft.clone(),
        })
        .collect();
    operations::replace_tool_file_types(conn, slug, &file_types)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkhive_store::open_memory;

    fn doc(json: &str) -> CatalogDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_catalog_projects_zero_rows() {
        let mut conn = open_memory().unwrap();
        project_catalog(&mut conn, &doc("{}")).unwrap();
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM consoles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn console_with_file_types_and_config_projects() {
        let mut conn = open_memory().unwrap();
        let document = doc(
            r#"{"consoles":{"nes":{"core_location":"nes_libretro","name":"NES",
               "single_file":true,"file_types":{"read":["nes"]},
               "config":{"video_driver":"gl"}}}}"#,
        );
        project_catalog(&mut conn, &document).unwrap();

        let name: String = conn
            .query_row("SELECT name FROM consoles WHERE slug='nes'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "NES");

        let value: String = conn
            .query_row(
                "SELECT value FROM console_configs WHERE console_slug='nes' AND name='video_driver'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(value, "gl");
    }

    #[test]
    fn game_with_unknown_console_fails() {
        let mut conn = open_memory().unwrap();
        let document = doc(
            r##"{"games":{"mario":{"name":"Mario","console_slug":"absent",
               "background_color":"#000","url":"http://x/mario.zip"}}}"##,
        );
        let err = project_catalog(&mut conn, &document).unwrap_err();
        assert!(matches!(err, ProjectError::UnknownConsole { .. }));
    }

    #[test]
    fn game_disks_expand_scalar_collection_path() {
        let mut conn = open_memory().unwrap();
        let document = doc(
            r##"{"consoles":{"psx":{"core_location":"psx_libretro","name":"PSX"}},
               "games":{"ff7":{"name":"FF7","console_slug":"psx",
               "background_color":"#000",
               "url":["http://x/1.bin","http://x/2.bin"],
               "disk_image":["1.bin","2.bin"],
               "collection_path":"ff7/"}}}"##,
        );
        project_catalog(&mut conn, &document).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM game_disks WHERE game_slug='ff7'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn reprojecting_same_document_is_idempotent() {
        let mut conn = open_memory().unwrap();
        let document = doc(
            r#"{"consoles":{"nes":{"core_location":"nes_libretro","name":"NES"}}}"#,
        );
        project_catalog(&mut conn, &document).unwrap();
        project_catalog(&mut conn, &document).unwrap();

        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM consoles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
