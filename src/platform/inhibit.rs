use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::process::{Child, Command, Stdio};

use crate::core::screensaver::{InhibitToken, ScreensaverInhibitor};
use crate::shared::constants;
use crate::utils::logger;

/// Holds the screensaver off by keeping a `systemd-inhibit` process
/// alive for each outstanding token.
pub struct ProcessInhibitor {
    program: String,
    next_id: u64,
    held: HashMap<u64, Child>,
}

impl ProcessInhibitor {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            next_id: 1,
            held: HashMap::new(),
        }
    }

    pub fn held(&self) -> usize {
        self.held.len()
    }

    fn command(&self, reason: &str) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--what=idle")
            .arg(format!("--who={}", constants::APP_NAME))
            .arg(format!("--why={}", reason))
            .arg("--mode=block")
            .args(["sleep", "infinity"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

impl ScreensaverInhibitor for ProcessInhibitor {
    fn inhibit(&mut self, reason: &str) -> Result<InhibitToken> {
        let mut child = self
            .command(reason)
            .spawn()
            .with_context(|| format!("failed to start {}", self.program))?;

        if let Some(status) = child.try_wait()? {
            if !status.success() {
                bail!("{} exited with {}", self.program, status);
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        self.held.insert(id, child);
        logger::debug(&format!("screensaver inhibited ({}): {}", id, reason));
        Ok(InhibitToken::new(id))
    }

    fn release(&mut self, token: InhibitToken) {
        let Some(mut child) = self.held.remove(&token.id()) else {
            logger::warn(&format!("unknown inhibit token {}", token.id()));
            return;
        };
        let _ = child.kill();
        let _ = child.wait();
        logger::debug(&format!(
            "screensaver released ({}), {} still held",
            token.id(),
            self.held()
        ));
    }
}

impl Drop for ProcessInhibitor {
    fn drop(&mut self) {
        for (_, mut child) in self.held.drain() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}
