//! Per-scheme transports. A [`ResourceHandler`] knows how to size and
//! stream a single remote object; [`build_handler`] dispatches a URL to
//! the right one.

use crate::error::DownloadError;
use crate::events::ResourceEvents;
use crate::status::{ResourceSnapshot, ResourceStatus};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Hard timeout covering connect + headers + first byte.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of retries for transient server errors.
const MAX_RETRIES: u32 = 3;

/// Initial backoff before the first retry (doubles each attempt).
const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Progress events are batched to at most once per this many bytes.
const PROGRESS_CHUNK: u64 = 64 * 1024;

#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Total size in bytes, if the transport can report it up front.
    async fn content_length(&self) -> Result<Option<u64>, DownloadError>;

    /// Streams the resource to `dest`, emitting progress/status events
    /// and honoring `cancel`.
    async fn stream_to(
        &self,
        dest: &Path,
        events: &ResourceEvents,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError>;
}

/// Dispatches a URL to a handler by scheme. `file`, `torrent`, and
/// `magnet` are rejected outright.
pub fn build_handler(url: &str, client: reqwest::Client) -> Result<Box<dyn ResourceHandler>, DownloadError> {
    let scheme = url
        .split_once("://")
        .map(|(scheme, _)| scheme)
        .unwrap_or("");

    match scheme {
        "http" | "https" => Ok(Box::new(HttpHandler {
            url: url.to_string(),
            client,
        })),
        "sj" => Ok(Box::new(ObjectStorageHandler {
            url: url.to_string(),
            client,
        })),
        _ => Err(DownloadError::SchemaNotAllowed),
    }
}

/// Streams an HTTP(S) GET response to disk with a retry/backoff loop
/// around the whole request.
pub struct HttpHandler {
    url: String,
    client: reqwest::Client,
}

impl HttpHandler {
    async fn get_with_retry(&self) -> Result<reqwest::Response, DownloadError> {
        let mut last_error = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF * 2u32.pow(attempt - 1);
                log::debug!(
                    "retrying {} (attempt {}/{}) after {}s backoff",
                    self.url,
                    attempt + 1,
                    MAX_RETRIES + 1,
                    backoff.as_secs()
                );
                tokio::time::sleep(backoff).await;
            }

            let result = tokio::time::timeout(CONNECT_TIMEOUT, self.client.get(&self.url).send()).await;

            match result {
                Ok(Ok(resp)) if resp.status().is_server_error() => {
                    last_error = Some(DownloadError::ServerError {
                        status: resp.status().as_u16(),
                        message: format!("server returned HTTP {}", resp.status().as_u16()),
                    });
                    continue;
                }
                Ok(Ok(resp)) if !resp.status().is_success() => {
                    return Err(DownloadError::ServerError {
                        status: resp.status().as_u16(),
                        message: format!("server returned HTTP {}", resp.status().as_u16()),
                    });
                }
                Ok(Ok(resp)) => return Ok(resp),
                Ok(Err(e)) => {
                    last_error = Some(DownloadError::Http(e.to_string()));
                    continue;
                }
                Err(_) => {
                    last_error = Some(DownloadError::Timeout(CONNECT_TIMEOUT.as_secs()));
                    continue;
                }
            }
        }

        Err(last_error.unwrap_or(DownloadError::Http("all retries exhausted".to_string())))
    }
}

#[async_trait]
impl ResourceHandler for HttpHandler {
    async fn content_length(&self) -> Result<Option<u64>, DownloadError> {
        let resp = self
            .client
            .head(&self.url)
            .send()
            .await
            .map_err(|e| DownloadError::Http(e.to_string()))?;
        Ok(resp.content_length())
    }

    async fn stream_to(
        &self,
        dest: &Path,
        events: &ResourceEvents,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        use futures::StreamExt;

        let resp = self.get_with_retry().await?;
        let total = resp.content_length();
        events.emit_status(ResourceSnapshot {
            status: ResourceStatus::Downloading,
            total,
            available: 0,
        });

        let part_path = dest.with_extension("part");
        let mut file = tokio::fs::File::create(&part_path)
            .await
            .map_err(|source| DownloadError::Io {
                path: part_path.clone(),
                source,
            })?;

        let mut stream = resp.bytes_stream();
        let mut available: u64 = 0;
        let mut since_last_event: u64 = 0;

        while let Some(chunk) = stream.next().await {
            if cancel.is_cancelled() {
                events.emit_status(ResourceSnapshot {
                    status: ResourceStatus::Aborting,
                    total,
                    available,
                });
                events.emit_removing(ResourceSnapshot {
                    status: ResourceStatus::Aborting,
                    total,
                    available,
                });
                return Err(DownloadError::Cancelled);
            }

            let chunk = chunk.map_err(|e| DownloadError::Http(e.to_string()))?;
            file.write_all(&chunk)
                .await
                .map_err(|source| DownloadError::Io {
                    path: part_path.clone(),
                    source,
                })?;

            available += chunk.len() as u64;
            since_last_event += chunk.len() as u64;
            if since_last_event >= PROGRESS_CHUNK {
                since_last_event = 0;
                events.emit_progress(ResourceSnapshot {
                    status: ResourceStatus::Downloading,
                    total,
                    available,
                });
            }
        }

        file.flush().await.map_err(|source| DownloadError::Io {
            path: part_path.clone(),
            source,
        })?;
        drop(file);
        tokio::fs::rename(&part_path, dest)
            .await
            .map_err(|source| DownloadError::Io {
                path: dest.to_path_buf(),
                source,
            })?;

        let snapshot = ResourceSnapshot {
            status: ResourceStatus::Downloaded,
            total,
            available,
        };
        events.emit_status(snapshot.clone());
        events.emit_available(snapshot);
        Ok(())
    }
}

/// Storj decentralized object storage, addressed by bucket (URL host)
/// and key (URL path). There is no pure-Rust `uplink` binding in reach
/// here, so this goes through the linksharing HTTP gateway instead —
/// the same bytes, fetched over plain HTTPS rather than the native
/// client library. See DESIGN.md for the substitution rationale.
pub struct ObjectStorageHandler {
    url: String,
    client: reqwest::Client,
}

impl ObjectStorageHandler {
    fn gateway_url(&self) -> Result<String, DownloadError> {
        let rest = self
            .url
            .strip_prefix("sj://")
            .ok_or(DownloadError::SchemaNotAllowed)?;
        let (bucket, key) = rest
            .split_once('/')
            .ok_or_else(|| DownloadError::NoFileName(self.url.clone()))?;
        Ok(format!("https://link.storjshare.io/raw/{bucket}/{key}"))
    }
}

#[async_trait]
impl ResourceHandler for ObjectStorageHandler {
    async fn content_length(&self) -> Result<Option<u64>, DownloadError> {
        let resp = self
            .client
            .head(self.gateway_url()?)
            .send()
            .await
            .map_err(|e| DownloadError::ObjectStorage(e.to_string()))?;
        Ok(resp.content_length())
    }

    async fn stream_to(
        &self,
        dest: &Path,
        events: &ResourceEvents,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let delegate = HttpHandler {
            url: self.gateway_url()?,
            client: self.client.clone(),
        };
        delegate.stream_to(dest, events, cancel).await
    }
}
