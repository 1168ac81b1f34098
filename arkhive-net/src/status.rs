/// Lifecycle states of a single resource download.
///
/// The `Torrent*` variants are reserved for a transport no handler
/// produces today; they exist so the FSM doesn't need to change shape
/// when that transport is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Pending,
    SearchingPeers,
    Downloading,
    DownloadingTorrent,
    Downloaded,
    TorrentDownloaded,
    Aborting,
    Error,
}

impl ResourceStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResourceStatus::Downloaded | ResourceStatus::TorrentDownloaded | ResourceStatus::Error
        )
    }
}

/// An immutable snapshot of a resource's progress, handed to event
/// subscribers so they never see a half-updated struct.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub status: ResourceStatus,
    pub total: Option<u64>,
    pub available: u64,
}
