use super::args;
use crate::shared::constants;

pub fn version_line() -> String {
    format!("{} version {}", constants::APP_NAME, constants::VERSION)
}

pub fn print_version() {
    println!("{}", version_line());
}

/// Notice for a bare invocation followed by the option table.
pub fn print_help() {
    println!("{}", constants::NO_CONTENT_NOTICE);
    println!();
    print!("{}", args::help_text());
}

/// Numbered listing for `--recent`, most recent first.
pub fn format_history(entries: &[String]) -> String {
    if entries.is_empty() {
        return format!("{}\n", constants::HISTORY_MISSING);
    }

    let mut out = format!("{}\n\n", constants::HISTORY_HEADER);
    for (index, entry) in entries.iter().enumerate() {
        out.push_str(&format!("{:02}: {}\n", index + 1, entry));
    }
    out
}
