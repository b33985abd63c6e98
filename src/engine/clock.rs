use std::time::{Duration, Instant};

/// Monotonic playback position clock
///
/// Counts only time spent playing. The external player reports nothing
/// back, so this is the single source of truth for where playback is.
#[derive(Debug)]
pub struct PlaybackClock {
    running_since: Option<Instant>,
    accumulated: Duration,
}

impl PlaybackClock {
    /// Create a stopped clock at `offset`
    pub fn new(offset: Duration) -> Self {
        Self {
            running_since: None,
            accumulated: offset,
        }
    }

    /// Current position, including the starting offset
    pub fn elapsed(&self) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + since.elapsed(),
            None => self.accumulated,
        }
    }

    pub fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    pub fn pause(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += since.elapsed();
        }
    }

    /// Stop and jump to `offset`
    pub fn reset(&mut self, offset: Duration) {
        self.running_since = None;
        self.accumulated = offset;
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}
