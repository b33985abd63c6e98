pub const APP_NAME: &str = "lumen";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CONFIG_FILE: &str = "lumen.config";
pub const CONFIG_ENV: &str = "LUMEN_CONFIG";
pub const HISTORY_FILE: &str = "history.json";
pub const ERROR_LOG_FILE: &str = "error.log";
pub const DEBUG_LOG_FILE: &str = "debug.log";

pub const DEFAULT_PLAYER: &str = "ffplay";
pub const DEFAULT_PROBE: &str = "ffprobe";
pub const DEFAULT_INHIBITOR: &str = "systemd-inhibit";
pub const DEFAULT_HISTORY_LIMIT: usize = 20;
pub const DEFAULT_TICK_MS: u64 = 100;

/// Extension of the sibling file probed for subtitles.
pub const SUBTITLE_EXTENSION: &str = "srt";

pub const NO_CONTENT_NOTICE: &str = "Opening lumen without content.";
pub const HISTORY_HEADER: &str = "These are the recently viewed URIs:";
pub const HISTORY_MISSING: &str = "ERROR: Can't find history of recently viewed URIs";
