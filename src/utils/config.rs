use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::shared::constants;

/// Runtime settings read from `lumen.config`.
///
/// The file is a list of `key = value` lines. Anything unreadable falls back
/// to the defaults; a bad config never stops playback.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub player: String,
    pub probe: String,
    pub inhibitor: String,
    pub history_limit: usize,
    pub tick: Duration,
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            player: constants::DEFAULT_PLAYER.to_string(),
            probe: constants::DEFAULT_PROBE.to_string(),
            inhibitor: constants::DEFAULT_INHIBITOR.to_string(),
            history_limit: constants::DEFAULT_HISTORY_LIMIT,
            tick: Duration::from_millis(constants::DEFAULT_TICK_MS),
            history_file: None,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::from_file(&path),
            None => Self::default(),
        }
    }

    pub fn from_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => {
                crate::utils::logger::info(&format!("loaded config from {}", path.display()));
                Self::parse(&content)
            }
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                crate::utils::logger::warn(&format!("ignoring config line: {}", trimmed));
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if value.is_empty() {
                continue;
            }

            match key {
                "player" => config.player = value.to_string(),
                "probe" => config.probe = value.to_string(),
                "inhibitor" => config.inhibitor = value.to_string(),
                "history-file" => config.history_file = Some(PathBuf::from(value)),
                "history-limit" => match value.parse::<usize>() {
                    Ok(limit) if limit > 0 => config.history_limit = limit,
                    _ => crate::utils::logger::warn(&format!("invalid history-limit: {}", value)),
                },
                "tick-ms" => match value.parse::<u64>() {
                    Ok(ms) if ms > 0 => config.tick = Duration::from_millis(ms),
                    _ => crate::utils::logger::warn(&format!("invalid tick-ms: {}", value)),
                },
                other => crate::utils::logger::warn(&format!("unknown config key: {}", other)),
            }
        }

        config
    }

    /// Where the history store keeps its file.
    pub fn history_path(&self) -> PathBuf {
        if let Some(path) = &self.history_file {
            return path.clone();
        }
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::APP_NAME);
        path.push(constants::HISTORY_FILE);
        path
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(constants::CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(constants::APP_NAME).join(constants::CONFIG_FILE))
}
