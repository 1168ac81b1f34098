//! On-disk directory layout for provisioned artifacts.

use std::path::{Path, PathBuf};

/// Archive extensions that get extracted before placement rather than
/// placed as-is.
pub const EXTRACTING_EXTENSIONS: &[&str] = &["zip", "rar", "7z"];

#[cfg(not(target_os = "linux"))]
pub const CORE_EXTENSION: &str = "dll";

#[cfg(target_os = "linux")]
pub const CORE_EXTENSION: &str = "so";

/// Root-relative directories the provisioner reads from and writes to.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Layout {
        Layout { root: root.into() }
    }

    pub fn system_dir(&self) -> PathBuf {
        self.root.join("system")
    }

    pub fn cores_dir(&self) -> PathBuf {
        self.root.join("cores")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.root.join("tools")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.root.join("temp")
    }

    pub fn plugin_temp_dir(&self) -> PathBuf {
        self.temp_dir().join("plugin")
    }

    pub fn core_temp_dir(&self, console_slug: &str) -> PathBuf {
        self.temp_dir().join(console_slug)
    }

    pub fn tool_temp_dir(&self, tool_slug: &str) -> PathBuf {
        self.temp_dir().join(tool_slug)
    }

    pub fn core_plugin_temp_dir(&self, file_index: usize) -> PathBuf {
        self.plugin_temp_dir().join(file_index.to_string())
    }

    /// Where a core archive lands once downloaded, before extraction.
    pub fn download_core_path(&self, core_location: &str) -> PathBuf {
        self.temp_dir()
            .join(format!("{core_location}.{CORE_EXTENSION}.zip"))
    }

    /// Where the extracted core library is placed in its final home.
    pub fn core_path(&self, core_location: &str) -> PathBuf {
        self.cores_dir().join(format!("{core_location}.{CORE_EXTENSION}"))
    }

    /// Where a tool's downloaded artifact lands, named after the URL's
    /// final path segment.
    pub fn download_tool_path(&self, tool_url: &str) -> PathBuf {
        self.temp_dir().join(basename(tool_url))
    }

    /// Creates the four top-level directories if absent. Idempotent.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.system_dir(),
            self.cores_dir(),
            self.tools_dir(),
            self.temp_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// The final path segment of a URL, ignoring query string and fragment.
pub fn basename(url: &str) -> String {
    let without_scheme = url.split_once("://").map(|(_, rest)| rest).unwrap_or(url);
    let path = without_scheme.split(['?', '#']).next().unwrap_or(without_scheme);
    path.rsplit('/').next().unwrap_or(path).to_string()
}

pub fn is_path_under(candidate: &Path, root: &Path) -> bool {
    candidate.starts_with(root)
}
