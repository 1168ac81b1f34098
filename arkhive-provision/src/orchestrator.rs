//! Sequential tools → cores → plugins-of-core provisioning pipeline.
//!
//! Everything here runs one artifact at a time, deliberately: every
//! download shares the same `temp/` staging directory, so running two
//! extractions concurrently would let one archive's temp files collide
//! with another's.

use crate::archive::{self, ArchiveError};
use crate::buildbot::{self, BuildbotError};
use crate::layout::{self, Layout, CORE_EXTENSION};
use arkhive_model::{Console, ConsolePluginsFile, Tool};
use arkhive_net::{DownloadError, Resource, ResourceEvents};
use arkhive_store::{queries, OperationError};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SEVENZIP_BINARY: &str = "7z";

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("database error: {0}")]
    Database(#[from] OperationError),
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("buildbot error: {0}")]
    Buildbot(#[from] BuildbotError),
    #[error("console {0} has no matching buildbot artifact")]
    NoMatchingCore(String),
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}

/// Drives provisioning of every tool and every console's core and
/// plugins against a store connection.
pub struct Provisioner {
    layout: Layout,
    client: reqwest::Client,
    sevenzip_path: PathBuf,
}

impl Provisioner {
    pub fn new(layout: Layout, client: reqwest::Client) -> Provisioner {
        Provisioner {
            layout,
            client,
            sevenzip_path: PathBuf::from(SEVENZIP_BINARY),
        }
    }

    pub fn with_sevenzip_path(mut self, path: impl Into<PathBuf>) -> Provisioner {
        self.sevenzip_path = path.into();
        self
    }

    /// Phase 1: every tool the catalog lists that isn't already present
    /// on disk, one after another. A single tool failing to provision
    /// is logged and skipped rather than aborting the rest of the list.
    pub async fn provision_tools(&self, conn: &Connection) -> Result<(), ProvisionError> {
        let tools = queries::list_tools(conn)?;
        for tool in tools {
            if self.tool_is_downloaded(&tool) {
                continue;
            }
            log::info!("provisioning tool {}", tool.slug);
            match self.provision_tool(&tool).await {
                Ok(()) => log::info!("tool {} complete", tool.slug),
                Err(err) => log::error!("tool {} failed to provision: {err}", tool.slug),
            }
        }
        Ok(())
    }

    /// Phase 2+3: every console's core, and — immediately after each
    /// core lands — that console's plugins, before moving to the next
    /// console. A console's core or plugin failure is logged and
    /// skipped; the remaining consoles still get their turn.
    pub async fn provision_cores(&self, conn: &Connection) -> Result<(), ProvisionError> {
        let consoles = queries::list_consoles(conn)?;
        let hrefs = buildbot::fetch_index(&self.client).await?;

        for console in consoles {
            if !self.core_is_downloaded(&console) {
                log::info!("provisioning core for {}", console.slug);
                match self.provision_core(&console, &hrefs).await {
                    Ok(()) => log::info!("core for {} complete", console.slug),
                    Err(err) => log::error!("core for {} failed to provision: {err}", console.slug),
                }
            }
            if let Err(err) = self.provision_plugins_for_console(conn, &console.slug).await {
                log::error!("plugins for {} failed to provision: {err}", console.slug);
            }
        }
        Ok(())
    }

    fn tool_is_downloaded(&self, tool: &Tool) -> bool {
        let location = if let Some(destination) = tool.destination.as_deref().filter(|s| !s.is_empty()) {
            self.layout.tools_dir().join(destination)
        } else if let Some(collection_path) = tool.collection_path.as_deref().filter(|s| !s.is_empty()) {
            self.layout.tools_dir().join(layout::basename(collection_path))
        } else {
            self.layout.tools_dir().join(layout::basename(&tool.url))
        };
        location.exists()
    }

    fn core_is_downloaded(&self, console: &Console) -> bool {
        self.layout.core_path(&console.core_location).exists()
    }

    async fn provision_tool(&self, tool: &Tool) -> Result<(), ProvisionError> {
        let downloaded = self.download(&tool.url, &self.layout.temp_dir()).await?;

        let destination_dir = if let Some(destination) = tool.destination.as_deref().filter(|s| !s.is_empty()) {
            self.layout.tools_dir().join(destination)
        } else {
            self.layout.tools_dir()
        };

        if !archive::needs_extraction(&downloaded) {
            archive::place_file(&downloaded, &destination_dir)?;
            return Ok(());
        }

        let extraction_dir = self.layout.tool_temp_dir(&tool.slug);
        archive::extract(&self.sevenzip_path, &downloaded, &extraction_dir)?;
        std::fs::remove_file(&downloaded).map_err(|source| ProvisionError::Io {
            path: downloaded.clone(),
            source,
        })?;

        let collection_path = match &tool.collection_path {
            Some(p) if !p.is_empty() => extraction_dir.join(p),
            _ => extraction_dir.clone(),
        };
        archive::place_collection(&collection_path, &destination_dir)?;
        let _ = std::fs::remove_dir_all(&extraction_dir);
        Ok(())
    }

    async fn provision_core(&self, console: &Console, hrefs: &[String]) -> Result<(), ProvisionError> {
        let href = buildbot::find_core_href(hrefs, &console.core_location, CORE_EXTENSION)
            .ok_or_else(|| ProvisionError::NoMatchingCore(console.slug.clone()))?;
        let url = buildbot::core_download_url(href)?;

        let downloaded = self.download(&url, &self.layout.temp_dir()).await?;
        let extraction_dir = self.layout.core_temp_dir(&console.slug);
        archive::extract(&self.sevenzip_path, &downloaded, &extraction_dir)?;

        if let Some(core_file) = archive::find_file_with_extension(&extraction_dir, CORE_EXTENSION) {
            std::fs::rename(&core_file, self.layout.core_path(&console.core_location)).map_err(|source| {
                ProvisionError::Io {
                    path: core_file,
                    source,
                }
            })?;
        }

        let _ = std::fs::remove_file(&downloaded);
        let _ = std::fs::remove_dir_all(&extraction_dir);
        Ok(())
    }

    async fn provision_plugins_for_console(&self, conn: &Connection, console_slug: &str) -> Result<(), ProvisionError> {
        let plugins = queries::list_bios_plugins(conn, console_slug)?;
        for (plugin, files) in plugins {
            if files.is_empty() {
                log::warn!("no files for console plugin in {console_slug} console");
                continue;
            }
            for (index, file) in files.iter().enumerate() {
                if let Err(err) = self.provision_plugin_file(file, index).await {
                    log::error!("plugin file {index} for {console_slug} failed to provision: {err}");
                }
            }
        }
        Ok(())
    }

    async fn provision_plugin_file(&self, file: &ConsolePluginsFile, file_index: usize) -> Result<(), ProvisionError> {
        let staging_dir = self.layout.plugin_temp_dir();
        let downloaded = self.download(&file.url, &staging_dir).await?;

        let destination_dir = file
            .destination
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| staging_dir.clone());

        if !archive::needs_extraction(&downloaded) {
            let base = layout::basename(&file.url);
            let destination = destination_dir.join(base);
            std::fs::create_dir_all(&destination_dir).map_err(|source| ProvisionError::Io {
                path: destination_dir.clone(),
                source,
            })?;
            std::fs::rename(&downloaded, &destination).map_err(|source| ProvisionError::Io {
                path: destination,
                source,
            })?;
            return Ok(());
        }

        let extraction_dir = self.layout.core_plugin_temp_dir(file_index);
        archive::extract(&self.sevenzip_path, &downloaded, &extraction_dir)?;

        let collection_path = match &file.collection_path {
            Some(p) if !p.is_empty() => extraction_dir.join(p),
            _ => extraction_dir.clone(),
        };
        archive::place_collection(&collection_path, &destination_dir)?;
        let _ = std::fs::remove_dir_all(&collection_path);
        let _ = std::fs::remove_dir_all(&extraction_dir);
        Ok(())
    }

    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf, ProvisionError> {
        let resource = Resource::new(url, dest_dir, self.client.clone())?;
        let events = ResourceEvents::new();
        let path = resource.download(&events).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arkhive_model::Tool;
    use arkhive_store::{operations, schema};

    #[tokio::test]
    async fn provision_tools_skips_a_failing_tool_and_still_reaches_the_next_one() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        layout.ensure_dirs().unwrap();
        let conn = schema::open_memory().unwrap();

        // An unsupported scheme fails Resource::new synchronously, with
        // no network access attempted, so this is deterministic.
        operations::upsert_tool(
            &conn,
            &Tool {
                slug: "broken".to_string(),
                url: "ftp://example.com/broken.zip".to_string(),
                collection_path: None,
                destination: None,
            },
        )
        .unwrap();
        // Already present on disk, so this one is reached and resolved
        // without needing real network activity either.
        std::fs::write(layout.tools_dir().join("gamecontrollerdb.txt"), b"x").unwrap();
        operations::upsert_tool(
            &conn,
            &Tool {
                slug: "gamecontrollerdb".to_string(),
                url: "https://example.com/gamecontrollerdb.txt".to_string(),
                collection_path: None,
                destination: None,
            },
        )
        .unwrap();

        let provisioner = Provisioner::new(layout, reqwest::Client::new());
        let result = provisioner.provision_tools(&conn).await;

        assert!(result.is_ok(), "one tool failing must not abort the whole phase");
    }

    #[test]
    fn tool_is_downloaded_checks_destination_first() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        std::fs::create_dir_all(layout.tools_dir()).unwrap();
        std::fs::write(layout.tools_dir().join("retroarch.exe"), b"x").unwrap();

        let provisioner = Provisioner::new(layout, reqwest::Client::new());
        let tool = Tool {
            slug: "retroarch".to_string(),
            url: "https://example.com/retroarch.7z".to_string(),
            collection_path: None,
            destination: Some("retroarch.exe".to_string()),
        };
        assert!(provisioner.tool_is_downloaded(&tool));
    }

    #[test]
    fn tool_is_downloaded_falls_back_to_url_basename() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        std::fs::create_dir_all(layout.tools_dir()).unwrap();
        std::fs::write(layout.tools_dir().join("gamecontrollerdb.txt"), b"x").unwrap();

        let provisioner = Provisioner::new(layout, reqwest::Client::new());
        let tool = Tool {
            slug: "gamecontrollerdb".to_string(),
            url: "https://example.com/gamecontrollerdb.txt".to_string(),
            collection_path: None,
            destination: None,
        };
        assert!(provisioner.tool_is_downloaded(&tool));
    }

    #[test]
    fn core_is_downloaded_checks_cores_dir() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(dir.path());
        std::fs::create_dir_all(layout.cores_dir()).unwrap();
        std::fs::write(layout.core_path("nestopia_libretro"), b"x").unwrap();

        let provisioner = Provisioner::new(layout, reqwest::Client::new());
        let console = Console {
            slug: "nes".to_string(),
            name: "Nintendo Entertainment System".to_string(),
            core_location: "nestopia_libretro".to_string(),
            single_file: true,
            is_embedded: false,
            language_variable_name: None,
        };
        assert!(provisioner.core_is_downloaded(&console));
    }
}
