use anyhow::Result;
use std::time::Duration;

use super::engine::{EngineState, MediaEngine};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiConfig {
    pub blind: bool,
    pub fullscreen: bool,
    pub hide_controls: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    TogglePause,
    Next,
    Quit,
}

/// What the surface shows on each refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView<'a> {
    pub uri: Option<&'a str>,
    pub state: EngineState,
    pub position: Duration,
    pub subtitle: Option<&'a str>,
    /// One-based item number and list length.
    pub item: Option<(usize, usize)>,
}

pub trait UiSurface {
    fn attach_video_surface(&mut self, engine: &dyn MediaEngine) -> Result<()>;

    fn start(&mut self, initial_uri: Option<&str>) -> Result<()>;

    /// Waits up to `timeout` for user input.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<UiEvent>>;

    fn show_status(&mut self, status: &StatusView<'_>) -> Result<()>;

    fn release(&mut self);
}

pub trait UiToolkit {
    fn create(&mut self, config: &UiConfig) -> Result<Box<dyn UiSurface>>;
}
