use anyhow::Result;

/// Proof that the screensaver is currently held off.
#[derive(Debug, PartialEq, Eq)]
pub struct InhibitToken(u64);

impl InhibitToken {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

pub trait ScreensaverInhibitor {
    fn inhibit(&mut self, reason: &str) -> Result<InhibitToken>;

    /// Re-enables the screensaver and drops the inhibition.
    fn release(&mut self, token: InhibitToken);
}
