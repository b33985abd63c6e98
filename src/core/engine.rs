use anyhow::Result;
use crossbeam_channel::Sender;
use std::time::Duration;

use super::history::HistoryError;

/// Pipeline state as last reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Null,
    Ready,
    Paused,
    Playing,
}

/// States the controller may ask for. `Ready` is reached by loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetState {
    Null,
    Paused,
    Playing,
}

impl From<TargetState> for EngineState {
    fn from(target: TargetState) -> Self {
        match target {
            TargetState::Null => EngineState::Null,
            TargetState::Paused => EngineState::Paused,
            TargetState::Playing => EngineState::Playing,
        }
    }
}

/// Notifications delivered through the registered event watch.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    StateChanged(EngineState),
    EndOfStream,
    Tags(Vec<(String, String)>),
    Error(String),
}

/// Fixed at creation; the controller changes only `secret` and `loop`
/// afterwards, through the setters on [`MediaEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub blind: bool,
    pub fullscreen: bool,
    pub probe_tags: bool,
}

pub trait MediaEngine {
    /// Makes `uri` the active item and leaves the pipeline `Ready`.
    /// Clears any subtitle configured for a previous item.
    fn load_uri(&mut self, uri: &str) -> Result<()>;

    fn set_subtitle_uri(&mut self, uri: &str);

    fn request_state(&mut self, target: TargetState) -> Result<()>;

    fn register_event_watch(&mut self, watch: Sender<EngineEvent>);

    fn set_secret(&mut self, secret: bool);

    fn set_loop(&mut self, looping: bool);

    fn state(&self) -> EngineState;

    fn position(&self) -> Duration;

    fn active_uri(&self) -> Option<&str>;

    /// True once the active item played through to its end.
    fn is_finished(&self) -> bool;

    /// Persists a "resume here" record for the active item.
    fn save_resume_position(&mut self) -> Result<(), HistoryError>;

    /// Human readable description of where video goes.
    fn output_description(&self) -> String;

    fn release(&mut self);
}

pub trait EngineFactory {
    fn create(&mut self, config: &EngineConfig) -> Result<Box<dyn MediaEngine>>;
}
