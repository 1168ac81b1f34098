//! Data model types for the catalog: consoles, games, tools, and the
//! account/certificate types used by the identity subsystem.
//!
//! Persistent entities (the `Console*`, `Game*`, `Tool*` families) mirror
//! the relational store's schema. The `*Dto` types mirror the catalog
//! JSON document's shape and are only ever used while decoding it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Console ─────────────────────────────────────────────────────────────────

/// An emulated console definition.
#[derive(Debug, Clone)]
pub struct Console {
    pub slug: String,
    pub name: String,
    pub core_location: String,
    pub single_file: bool,
    pub is_embedded: bool,
    pub language_variable_name: Option<String>,
}

/// Maps a file extension to the action the launcher takes with it.
#[derive(Debug, Clone)]
pub struct ConsoleFileType {
    pub console_slug: String,
    pub file_type: String,
    pub action: String,
}

/// The level at which a console configuration key is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleConfigLevel {
    Config,
    WinConfig,
    LinuxConfig,
    CoreConfig,
    WinCoreConfig,
    LinuxCoreConfig,
}

impl ConsoleConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::WinConfig => "win_config",
            Self::LinuxConfig => "linux_config",
            Self::CoreConfig => "core_config",
            Self::WinCoreConfig => "win_core_config",
            Self::LinuxCoreConfig => "linux_core_config",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "config" => Self::Config,
            "win_config" => Self::WinConfig,
            "linux_config" => Self::LinuxConfig,
            "core_config" => Self::CoreConfig,
            "win_core_config" => Self::WinCoreConfig,
            "linux_core_config" => Self::LinuxCoreConfig,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub console_slug: String,
    pub name: String,
    pub value: String,
    pub level: ConsoleConfigLevel,
}

#[derive(Debug, Clone)]
pub struct ConsoleLanguage {
    pub console_slug: String,
    pub tag: u32,
    pub name: String,
}

/// The kind of plugin a console needs at runtime. Only `Bios` is handled
/// today; any other value is an unknown plugin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolePluginType {
    Bios,
}

impl ConsolePluginType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "bios" => Some(Self::Bios),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bios => "bios",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsolePlugin {
    pub id: i64,
    pub console_slug: String,
    pub plugin_type: String,
}

#[derive(Debug, Clone)]
pub struct ConsolePluginsFile {
    pub plugin_id: i64,
    pub url: String,
    pub destination: Option<String>,
    pub collection_path: Option<String>,
}

// ── Game ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Game {
    pub slug: String,
    pub name: String,
    pub console_slug: String,
    pub background_color: Option<String>,
    pub background_image: Option<String>,
    pub logo: Option<String>,
    pub executable: Option<String>,
    pub insertion_date: String,
}

#[derive(Debug, Clone)]
pub struct GameDisk {
    pub game_slug: String,
    pub disk_number: u32,
    pub url: String,
    pub image: Option<String>,
    pub collection_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub game_slug: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct GameAdditionalFile {
    pub game_slug: String,
    pub name: String,
    pub data: Vec<u8>,
}

// ── Tool ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Tool {
    pub slug: String,
    pub url: String,
    pub collection_path: Option<String>,
    pub destination: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ToolFilesType {
    pub tool_slug: String,
    pub file_type: String,
}

// ── User variables ──────────────────────────────────────────────────────────

/// A single name/value row in the key-value bag, used today to hold the
/// content hash of the most recently ingested catalog.
#[derive(Debug, Clone)]
pub struct UserVariable {
    pub name: String,
    pub value: Option<String>,
}

pub const DB_HASH_VARIABLE: &str = "dbHash";

// ── Account / certificate ───────────────────────────────────────────────────

/// The user's long-lived identity, held in memory once loaded.
#[derive(Debug, Clone)]
pub struct Account {
    pub username: String,
    pub email: String,
    pub registration_date: i64,
    pub public_key: Vec<u8>,
    pub sign: Option<Vec<u8>>,
}

/// The on-disk JSON shape of `system/certificate.bee`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateDocument {
    pub username: String,
    pub email: String,
    pub date: i64,
    pub public_key: String,
    #[serde(default)]
    pub sign: Option<String>,
}

// ── Catalog JSON DTOs ────────────────────────────────────────────────────────

/// Top-level shape of the catalog document (`db.json` / decrypted `db.honey`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub consoles: BTreeMap<String, ConsoleDto>,
    #[serde(default)]
    pub games: BTreeMap<String, GameDto>,
    #[serde(default)]
    pub win_tools: BTreeMap<String, ToolDto>,
}

/// Either a single value or a list of values, as the catalog JSON encodes
/// some fields when there is one artifact versus several.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Clone> OneOrMany<T> {
    /// Expands into `len` entries, repeating a scalar for every slot.
    pub fn expand(&self, len: usize) -> Vec<T> {
        match self {
            OneOrMany::One(v) => std::iter::repeat(v.clone()).take(len).collect(),
            OneOrMany::Many(v) => v.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleDto {
    pub core_location: String,
    pub name: String,
    #[serde(default)]
    pub single_file: bool,
    #[serde(default)]
    pub is_embedded: bool,
    #[serde(default)]
    pub file_types: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub language: Option<ConsoleLanguageDto>,
    #[serde(default)]
    pub plugins: BTreeMap<String, ConsolePluginDto>,
    /// Every other top-level key is a possible config entry, keyed by
    /// level name (`config`, `win_config`, …); captured untyped and
    /// filtered against the known level set during projection.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleLanguageDto {
    #[serde(default)]
    pub variable_name: Option<String>,
    #[serde(default)]
    pub mapping: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolePluginDto {
    #[serde(default)]
    pub collection_path: Option<OneOrMany<String>>,
    #[serde(default)]
    pub destination: Option<OneOrMany<String>>,
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameDto {
    pub name: String,
    pub console_slug: String,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub executable: Option<String>,
    pub url: OneOrMany<String>,
    #[serde(default)]
    pub disk_image: Option<Vec<String>>,
    #[serde(default)]
    pub collection_path: Option<String>,
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub additional_files: Vec<GameAdditionalFileDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameAdditionalFileDto {
    pub name: String,
    pub base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDto {
    pub url: String,
    #[serde(default)]
    pub collection_path: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub file_types: Vec<String>,
}
