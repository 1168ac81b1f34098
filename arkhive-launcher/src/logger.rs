//! A small `log::Log` implementation writing to the terminal only:
//! warnings and errors to stderr, everything else to stdout. There is
//! no logfile option here (there's no `--logfile` flag on this binary).

use log::LevelFilter;
use owo_colors::OwoColorize;

struct LauncherLogger {
    level: LevelFilter,
}

impl log::Log for LauncherLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = record.args().to_string();
        if record.level() <= log::Level::Warn {
            eprintln!("{}", msg.if_supports_color(owo_colors::Stream::Stderr, |text| text.red().to_string()));
        } else {
            println!("{msg}");
        }
    }

    fn flush(&self) {}
}

fn parse_level(name: &str) -> LevelFilter {
    match name.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Debug,
    }
}

/// Installs the terminal logger at the given level name (case
/// insensitive; unrecognized names fall back to `debug`). Safe to call
/// once per process.
pub fn init(level_name: &str) {
    let level = parse_level(level_name);
    let logger = Box::new(LauncherLogger { level });
    if log::set_boxed_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_recognizes_known_names() {
        assert_eq!(parse_level("info"), LevelFilter::Info);
        assert_eq!(parse_level("WARN"), LevelFilter::Warn);
    }

    #[test]
    fn parse_level_falls_back_to_debug() {
        assert_eq!(parse_level("nonsense"), LevelFilter::Debug);
    }
}
