use super::engine::EngineState;

/// Transport-level requests coming from outside the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCommand {
    Play,
    Pause,
    TogglePause,
    Next,
    Quit,
}

/// Read-only snapshot handed to a remote adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionInfo {
    pub uris: Vec<String>,
    pub current: Option<usize>,
    pub state: EngineState,
}

/// Optional session-bus style remote control. The controller keeps sole
/// ownership of engine and UI; adapters only see snapshots and answer with
/// commands.
pub trait RemoteControl {
    fn attach(&mut self, info: &SessionInfo);

    fn poll_command(&mut self) -> Option<TransportCommand>;

    fn close(&mut self);
}
