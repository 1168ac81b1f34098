//! A single in-flight or completed download.

use crate::error::DownloadError;
use crate::events::ResourceEvents;
use crate::handler::{ResourceHandler, build_handler};
use crate::status::{ResourceSnapshot, ResourceStatus};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Derives the on-disk file name for a URL: the fragment if it carries
/// one (the documented way to disambiguate two files that would
/// otherwise collide on basename, e.g. plugin files), otherwise the
/// basename of the path component. Query strings never contribute to
/// the name either way.
pub fn file_name_for_url(url: &str) -> Result<String, DownloadError> {
    let without_query = url.split('?').next().unwrap_or(url);
    if let Some((_, fragment)) = without_query.split_once('#') {
        if !fragment.is_empty() {
            return Ok(fragment.to_string());
        }
    }

    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path_part = without_scheme.split_once('/').map(|(_, p)| p).unwrap_or("");
    let path_part = path_part.split(['?', '#']).next().unwrap_or("");
    let name = path_part.rsplit('/').next().unwrap_or("");
    if name.is_empty() {
        return Err(DownloadError::NoFileName(url.to_string()));
    }
    Ok(name.to_string())
}

/// A resource the orchestrator wants downloaded into `dest_dir`.
pub struct Resource {
    url: String,
    dest_dir: PathBuf,
    handler: Box<dyn ResourceHandler>,
    cancel: CancellationToken,
    available: AtomicU64,
}

impl Resource {
    pub fn new(url: &str, dest_dir: &Path, client: reqwest::Client) -> Result<Resource, DownloadError> {
        let handler = build_handler(url, client)?;
        Ok(Resource {
            url: url.to_string(),
            dest_dir: dest_dir.to_path_buf(),
            handler,
            cancel: CancellationToken::new(),
            available: AtomicU64::new(0),
        })
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// The path this resource will occupy once downloaded.
    pub fn destination_path(&self) -> Result<PathBuf, DownloadError> {
        Ok(self.dest_dir.join(file_name_for_url(&self.url)?))
    }

    /// Runs the download to completion (success, error, or
    /// cancellation), emitting events as it goes. Safe to run on its
    /// own task — the caller awaits the returned `JoinHandle`.
    pub async fn download(&self, events: &ResourceEvents) -> Result<PathBuf, DownloadError> {
        events.emit_status(ResourceSnapshot {
            status: ResourceStatus::SearchingPeers,
            total: None,
            available: 0,
        });

        let dest = self.destination_path()?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| DownloadError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        match self.handler.stream_to(&dest, events, &self.cancel).await {
            Ok(()) => Ok(dest),
            Err(e) => {
                if !matches!(e, DownloadError::Cancelled) {
                    events.emit_status(ResourceSnapshot {
                        status: ResourceStatus::Error,
                        total: None,
                        available: self.available.load(Ordering::Relaxed),
                    });
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_for_url_takes_basename_of_path() {
        assert_eq!(
            file_name_for_url("https://example.com/cores/nes.zip").unwrap(),
            "nes.zip"
        );
    }

    #[test]
    fn file_name_for_url_strips_query_string() {
        assert_eq!(
            file_name_for_url("https://example.com/cores/nes.zip?token=abc").unwrap(),
            "nes.zip"
        );
    }

    #[test]
    fn file_name_for_url_rejects_directory_urls() {
        assert!(file_name_for_url("https://example.com/").is_err());
    }

    #[test]
    fn file_name_for_url_prefers_fragment_when_present() {
        assert_eq!(
            file_name_for_url("https://example.com/plugins/pack.zip#bios.bin").unwrap(),
            "bios.bin"
        );
    }

    #[test]
    fn file_name_for_url_falls_back_to_basename_without_fragment() {
        assert_eq!(
            file_name_for_url("https://example.com/plugins/bios.bin").unwrap(),
            "bios.bin"
        );
    }

    #[test]
    fn file_name_for_url_ignores_empty_fragment() {
        assert_eq!(
            file_name_for_url("https://example.com/plugins/bios.bin#").unwrap(),
            "bios.bin"
        );
    }

    #[test]
    fn build_handler_rejects_disallowed_schemes() {
        let client = reqwest::Client::new();
        assert!(matches!(
            build_handler_for_test("file:///etc/passwd", client.clone()),
            Err(DownloadError::SchemaNotAllowed)
        ));
        assert!(matches!(
            build_handler_for_test("magnet:?xt=foo", client),
            Err(DownloadError::SchemaNotAllowed)
        ));
    }

    fn build_handler_for_test(
        url: &str,
        client: reqwest::Client,
    ) -> Result<Box<dyn ResourceHandler>, DownloadError> {
        crate::handler::build_handler(url, client)
    }
}
