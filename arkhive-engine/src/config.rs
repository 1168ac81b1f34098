//! Reads, merges, and rewrites the frontend's settings file.
//!
//! On the very first boot there is no saved file, so the caller's
//! defaults populate it outright. On every boot after that, whatever a
//! user has hand-edited on disk takes priority over the defaults for
//! the same key — only keys the saved file doesn't mention fall back to
//! the default. The rewrite is atomic: a full truncate-and-write of the
//! merged table, never a partial edit.

use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toml::value::Table;
use toml::Value;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed settings file at {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Builds the fixed set of frontend defaults: control bindings tuned
/// for a keyboard-only first run, plus machine-derived paths and
/// per-platform driver choices.
pub fn default_settings(system_dir: &Path, user_language_index: u32) -> Table {
    let mut settings = Table::new();

    let mut set = |key: &str, value: Value| {
        settings.insert(key.to_string(), value);
    };

    set("input_player1_l", Value::String("q".into()));
    set("input_player1_l2", Value::String("num1".into()));
    set("input_player1_l3", Value::String("nul".into()));
    set("input_player1_r", Value::String("e".into()));
    set("input_player1_r2", Value::String("num3".into()));
    set("input_player1_r3", Value::String("nul".into()));
    set("input_player1_select", Value::String("z".into()));
    set("input_player1_start", Value::String("x".into()));
    set("input_player1_up", Value::String("up".into()));
    set("input_player1_left", Value::String("left".into()));
    set("input_player1_down", Value::String("down".into()));
    set("input_player1_right", Value::String("right".into()));
    set("input_player1_x", Value::String("w".into()));
    set("input_player1_y", Value::String("a".into()));
    set("input_player1_b", Value::String("s".into()));
    set("input_player1_a", Value::String("d".into()));

    let system_directory = system_dir.to_string_lossy().to_string();
    let shaders_dir = system_dir.join("shaders").to_string_lossy().to_string();
    set("system_directory", Value::String(system_directory));
    set("global_core_options", Value::Boolean(true));
    set("video_shader_dir", Value::String(shaders_dir));
    set("video_windowed_fullscreen", Value::Boolean(true));

    for unbound in [
        "input_audio_mute",
        "input_cheat_index_minus",
        "input_cheat_index_plus",
        "input_cheat_toggle",
        "input_desktop_menu_toggle",
        "input_fps_toggle",
        "input_frame_advance",
        "input_grab_mouse_toggle",
        "input_hold_fast_forward",
        "input_hold_slowmotion",
        "input_load_state",
        "input_menu_toggle",
        "input_movie_record_toggle",
        "input_netplay_game_watch",
        "input_osk_toggle",
        "input_pause_toggle",
        "input_reset",
        "input_rewind",
        "input_save_state",
        "input_screenshot",
        "input_send_debug_info",
        "input_shader_next",
        "input_shader_prev",
        "input_state_slot_decrease",
        "input_state_slot_increase",
        "input_toggle_fast_forward",
        "input_toggle_fullscreen",
        "input_volume_down",
        "input_volume_up",
    ] {
        set(unbound, Value::String("nul".into()));
    }

    if cfg!(target_os = "windows") {
        set("video_driver", Value::String("gl".into()));
        set("input_joypad_driver", Value::String("xinput".into()));
    }

    set("menu_enable_widgets", Value::Boolean(false));
    set("video_shader_enable", Value::Boolean(false));

    set("input_libretro_device_p1", Value::String("1".into()));
    set("input_libretro_device_p2", Value::String("1".into()));
    set("input_libretro_device_p3", Value::String("1".into()));
    set("input_libretro_device_p4", Value::String("1".into()));
    set("aspect_ratio_index", Value::Integer(22));
    set("video_rotation", Value::Integer(0));
    set("video_scale_integer", Value::Boolean(false));

    set("user_language", Value::Integer(user_language_index as i64));

    settings
}

/// Loads the settings file at `path` if present, overlays `defaults`
/// under it (disk wins on overlap), and rewrites the merged result to
/// `path`. Returns the merged table.
pub fn sync(defaults: Table, path: &Path) -> Result<Table, ConfigError> {
    let mut merged = defaults;

    if path.exists() {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let saved: Table = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        for (key, value) in saved {
            merged.insert(key, value);
        }
    }

    let rendered = toml::to_string_pretty(&merged)?;
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    file.write_all(rendered.as_bytes()).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(merged)
}
