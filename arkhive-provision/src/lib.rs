//! Provisions tools, cores, and console plugins onto disk: downloads
//! each artifact, extracts it when it's an archive, and places the
//! result where the frontend expects to find it.
//!
//! Tools, then cores, then (per core) plugins — always in that order,
//! always one at a time. See [`orchestrator`] for why.

pub mod archive;
pub mod buildbot;
pub mod language;
pub mod layout;
pub mod orchestrator;

pub use archive::ArchiveError;
pub use buildbot::BuildbotError;
pub use language::Locale;
pub use layout::Layout;
pub use orchestrator::{ProvisionError, Provisioner};
