use std::io::{self, IsTerminal, Write};

// xterm window operations; terminals without support ignore them.
const ENTER_FULLSCREEN: &str = "\x1b[10;1t";
const LEAVE_FULLSCREEN: &str = "\x1b[10;0t";
const MAXIMIZE: &str = "\x1b[9;1t";

/// Asks the hosting terminal window to go fullscreen.
///
/// Returns false when stderr is not a terminal and nothing was sent.
pub fn request_fullscreen() -> bool {
    write_sequence(&[ENTER_FULLSCREEN, MAXIMIZE])
}

pub fn restore_window() -> bool {
    write_sequence(&[LEAVE_FULLSCREEN])
}

fn write_sequence(sequences: &[&str]) -> bool {
    let mut stderr = io::stderr();
    if !stderr.is_terminal() {
        return false;
    }
    for sequence in sequences {
        if let Err(err) = stderr.write_all(sequence.as_bytes()) {
            crate::utils::logger::info(&format!("window request failed: {}", err));
            return false;
        }
    }
    let _ = stderr.flush();
    true
}
