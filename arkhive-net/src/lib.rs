//! Scheme-dispatched resource downloader: HTTP(S) and Storj object
//! storage transports behind a common [`Resource`] FSM, with typed
//! broadcast events replacing the reflection-based emitter this system
//! used to have.

pub mod error;
pub mod events;
pub mod handler;
pub mod resource;
pub mod status;

pub use error::DownloadError;
pub use events::ResourceEvents;
pub use handler::{HttpHandler, ObjectStorageHandler, ResourceHandler, build_handler};
pub use resource::{Resource, file_name_for_url};
pub use status::{ResourceSnapshot, ResourceStatus};

use std::time::Duration;

/// Builds the shared HTTP client every handler reuses: generous pool
/// settings for many small artifact downloads, rustls for TLS.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .tcp_nodelay(true)
        .build()
}
