//! Playback session controller.
//!
//! Owns the engine and UI handles for one run of the player, drives them
//! through startup (`Uninitialized` .. `Playing`), reacts to engine and user
//! events from the single loop thread, and tears everything down in a fixed
//! order exactly once.

use crossbeam_channel::{Receiver, TryRecvError};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::engine::{EngineConfig, EngineEvent, EngineFactory, MediaEngine, TargetState};
use super::history::HistoryStore;
use super::playlist::PlaybackList;
use super::remote::{RemoteControl, SessionInfo, TransportCommand};
use super::screensaver::{InhibitToken, ScreensaverInhibitor};
use super::subtitle::{self, SubtitleChoice};
use super::ui::{StatusView, UiConfig, UiEvent, UiSurface, UiToolkit};
use crate::cli::args::Flags;
use crate::shared::constants;
use crate::utils::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Initialized,
    Ready,
    Loaded,
    Paused,
    Playing,
    ShuttingDown,
    Terminated,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to create the {component}")]
    ResourceInit {
        component: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl SessionError {
    fn resource(component: &'static str, source: anyhow::Error) -> Self {
        Self::ResourceInit {
            component,
            source: source.into(),
        }
    }
}

/// Everything the controller talks to, injected by the caller.
pub struct Collaborators {
    pub engines: Box<dyn EngineFactory>,
    pub toolkit: Box<dyn UiToolkit>,
    pub history: Rc<dyn HistoryStore>,
    pub screensaver: Box<dyn ScreensaverInhibitor>,
    pub remote: Option<Box<dyn RemoteControl>>,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub flags: Flags,
    pub explicit_subtitle: Option<String>,
    /// How long one loop iteration waits for user input.
    pub tick: Duration,
}

struct UiHandle {
    surface: Box<dyn UiSurface>,
    screensaver_token: Option<InhibitToken>,
}

pub struct SessionController {
    state: SessionState,
    options: SessionOptions,
    playlist: PlaybackList,
    subtitle: SubtitleChoice,
    engine: Option<Box<dyn MediaEngine>>,
    ui: Option<UiHandle>,
    events: Option<Receiver<EngineEvent>>,
    engines: Box<dyn EngineFactory>,
    toolkit: Box<dyn UiToolkit>,
    history: Rc<dyn HistoryStore>,
    screensaver: Box<dyn ScreensaverInhibitor>,
    remote: Option<Box<dyn RemoteControl>>,
    interrupt: Option<Arc<AtomicBool>>,
    exit_code: Option<i32>,
    // Printed once the terminal has been handed back.
    report: Vec<String>,
    last_error: Option<String>,
}

impl SessionController {
    pub fn new(options: SessionOptions, playlist: PlaybackList, collaborators: Collaborators) -> Self {
        Self {
            state: SessionState::Uninitialized,
            options,
            playlist,
            subtitle: SubtitleChoice::none(),
            engine: None,
            ui: None,
            events: None,
            engines: collaborators.engines,
            toolkit: collaborators.toolkit,
            history: collaborators.history,
            screensaver: collaborators.screensaver,
            remote: collaborators.remote,
            interrupt: None,
            exit_code: None,
            report: Vec::new(),
            last_error: None,
        }
    }

    /// Flag raised by a signal handler; checked once per loop iteration.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn playlist(&self) -> &PlaybackList {
        &self.playlist
    }

    pub fn subtitle(&self) -> &SubtitleChoice {
        &self.subtitle
    }

    /// Creates and wires engine and UI, then starts the first item if there
    /// is one. Any creation failure runs the shutdown sequence before
    /// returning the error.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Uninitialized {
            return Ok(());
        }

        if let Err(err) = self.initialize().and_then(|()| self.wire()) {
            logger::error(&format!("startup aborted: {}", err));
            self.shutdown();
            return Err(err);
        }

        self.begin_playback();
        Ok(())
    }

    /// Runs the loop until quit, end of the list, or interrupt, then shuts
    /// down. Returns the process exit code.
    pub fn run(&mut self) -> i32 {
        while self.exit_code.is_none() && self.is_live() {
            if self.interrupted() {
                logger::info("termination signal received");
                self.request_quit(0);
                break;
            }

            let polled = match self.ui.as_mut() {
                Some(ui) => ui.surface.poll_event(self.options.tick),
                None => break,
            };
            match polled {
                Ok(Some(event)) => self.handle_ui_event(event),
                Ok(None) => {}
                Err(err) => {
                    logger::error(&format!("ui event loop failed: {:#}", err));
                    self.fail(format!("user interface failed: {}", err));
                }
            }

            self.drain_engine_events();
            self.poll_remote();
            self.refresh_status();
        }

        self.shutdown();
        self.exit_code.unwrap_or(0)
    }

    /// Tears the session down: save resume point, stop engine, release
    /// screensaver, release UI, release engine. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if matches!(self.state, SessionState::ShuttingDown | SessionState::Terminated) {
            return;
        }
        self.state = SessionState::ShuttingDown;
        logger::info("shutting down session");

        if let Some(engine) = self.engine.as_mut() {
            let unfinished = engine.active_uri().is_some() && !engine.is_finished();
            if unfinished && !self.options.flags.secret {
                if let Err(err) = engine.save_resume_position() {
                    logger::warn(&format!("could not save resume position: {}", err));
                }
            }

            if let Err(err) = engine.request_state(TargetState::Null) {
                logger::warn(&format!("engine did not stop cleanly: {:#}", err));
            }
        }

        if let Some(token) = self.ui.as_mut().and_then(|ui| ui.screensaver_token.take()) {
            self.screensaver.release(token);
        }

        if let Some(mut ui) = self.ui.take() {
            ui.surface.release();
        }

        if let Some(mut engine) = self.engine.take() {
            engine.release();
        }

        self.events = None;
        if let Some(mut remote) = self.remote.take() {
            remote.close();
        }
        self.state = SessionState::Terminated;

        println!("closing {}", constants::APP_NAME);
        for line in self.report.drain(..) {
            println!("{}", line);
        }
        if let Some(message) = self.last_error.take() {
            eprintln!("ERROR: {}", message);
        }
    }

    fn initialize(&mut self) -> Result<(), SessionError> {
        let flags = self.options.flags;

        let engine_config = EngineConfig {
            blind: flags.blind,
            fullscreen: flags.fullscreen,
            probe_tags: flags.show_media_info,
        };
        let mut engine = self
            .engines
            .create(&engine_config)
            .map_err(|err| SessionError::resource("media engine", err))?;
        engine.set_secret(flags.secret);
        engine.set_loop(flags.looping);
        self.engine = Some(engine);

        let ui_config = UiConfig {
            blind: flags.blind,
            fullscreen: flags.fullscreen,
            hide_controls: flags.hide_controls,
        };
        let surface = self
            .toolkit
            .create(&ui_config)
            .map_err(|err| SessionError::resource("user interface", err))?;
        self.ui = Some(UiHandle {
            surface,
            screensaver_token: None,
        });

        self.state = SessionState::Initialized;
        Ok(())
    }

    fn wire(&mut self) -> Result<(), SessionError> {
        let (Some(engine), Some(ui)) = (self.engine.as_mut(), self.ui.as_mut()) else {
            return Err(SessionError::resource(
                "video surface",
                anyhow::anyhow!("engine or interface missing"),
            ));
        };

        ui.surface
            .attach_video_surface(&**engine)
            .map_err(|err| SessionError::resource("video surface", err))?;

        let (watch, events) = crossbeam_channel::unbounded();
        engine.register_event_watch(watch);
        self.events = Some(events);

        if let Some(remote) = self.remote.as_mut() {
            remote.attach(&SessionInfo {
                uris: self.playlist.items().to_vec(),
                current: self.playlist.current_index(),
                state: engine.state(),
            });
        }

        self.state = SessionState::Ready;
        Ok(())
    }

    fn begin_playback(&mut self) {
        let Some(first) = self.playlist.current().map(str::to_string) else {
            logger::info("no media given, staying idle");
            if let Some(ui) = self.ui.as_mut() {
                if let Err(err) = ui.surface.start(None) {
                    logger::warn(&format!("idle interface failed to start: {:#}", err));
                }
            }
            return;
        };

        // Only the first item gets subtitle discovery.
        self.subtitle = subtitle::resolve(&first, self.options.explicit_subtitle.as_deref());
        self.play_item(&first);
    }

    fn play_item(&mut self, uri: &str) {
        let Some(engine) = self.engine.as_mut() else {
            return;
        };

        if let Err(err) = engine.load_uri(uri) {
            logger::error(&format!("failed to load {}: {:#}", uri, err));
            self.fail(format!("cannot open {}: {}", uri, err));
            return;
        }

        if !self.options.flags.secret {
            if let Err(err) = self.history.record_visit(uri) {
                logger::warn(&format!("could not record {} in history: {}", uri, err));
            }
        }

        // The engine needs subtitles before negotiation starts.
        if let Some(subtitle) = self.subtitle.resolved_uri.as_deref() {
            engine.set_subtitle_uri(subtitle);
        }
        self.state = SessionState::Loaded;
        logger::info(&format!("loaded {}", uri));

        if let Some(ui) = self.ui.as_mut() {
            if let Err(err) = ui.surface.start(Some(uri)) {
                logger::warn(&format!("interface failed to start: {:#}", err));
            }
        }

        if self.transition(TargetState::Paused) && self.transition(TargetState::Playing) {
            self.inhibit_screensaver();
        }
    }

    fn transition(&mut self, target: TargetState) -> bool {
        let Some(engine) = self.engine.as_mut() else {
            return false;
        };

        match engine.request_state(target) {
            Ok(()) => {
                self.state = match target {
                    TargetState::Paused => SessionState::Paused,
                    TargetState::Playing => SessionState::Playing,
                    TargetState::Null => self.state,
                };
                true
            }
            Err(err) => {
                logger::error(&format!("state change to {:?} failed: {:#}", target, err));
                self.fail(format!("playback failed: {}", err));
                false
            }
        }
    }

    fn inhibit_screensaver(&mut self) {
        if self.options.flags.blind {
            return;
        }
        let Some(ui) = self.ui.as_mut() else {
            return;
        };
        if ui.screensaver_token.is_some() {
            return;
        }

        match self.screensaver.inhibit("Playing media") {
            Ok(token) => ui.screensaver_token = Some(token),
            Err(err) => logger::warn(&format!("screensaver stays enabled: {:#}", err)),
        }
    }

    fn skip_to(&mut self, uri: &str) {
        if let Some(engine) = self.engine.as_mut() {
            if let Err(err) = engine.request_state(TargetState::Null) {
                logger::warn(&format!("engine did not stop before next item: {:#}", err));
            }
        }
        self.subtitle = SubtitleChoice::none();
        self.play_item(uri);
    }

    fn handle_ui_event(&mut self, event: UiEvent) {
        let command = match event {
            UiEvent::TogglePause => TransportCommand::TogglePause,
            UiEvent::Next => TransportCommand::Next,
            UiEvent::Quit => TransportCommand::Quit,
        };
        self.handle_transport(command);
    }

    fn handle_transport(&mut self, command: TransportCommand) {
        logger::debug(&format!("transport command {:?} in {:?}", command, self.state));
        match (command, self.state) {
            (TransportCommand::Quit, _) => self.request_quit(0),
            (TransportCommand::Play | TransportCommand::TogglePause, SessionState::Paused) => {
                self.transition(TargetState::Playing);
            }
            (TransportCommand::Pause | TransportCommand::TogglePause, SessionState::Playing) => {
                self.transition(TargetState::Paused);
            }
            (TransportCommand::Next, SessionState::Paused | SessionState::Playing) => {
                if let Some(next) = self.playlist.advance().map(str::to_string) {
                    self.skip_to(&next);
                }
            }
            _ => {}
        }
    }

    fn drain_engine_events(&mut self) {
        while self.is_live() {
            let Some(events) = self.events.as_ref() else {
                return;
            };
            match events.try_recv() {
                Ok(event) => self.handle_engine_event(event),
                Err(TryRecvError::Empty) => return,
                Err(TryRecvError::Disconnected) => {
                    self.events = None;
                    return;
                }
            }
        }
    }

    fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::StateChanged(state) => {
                logger::debug(&format!("engine reported {:?}", state));
            }
            EngineEvent::EndOfStream => {
                logger::info("end of stream");
                match self.playlist.advance().map(str::to_string) {
                    Some(next) => self.skip_to(&next),
                    None => self.request_quit(0),
                }
            }
            EngineEvent::Tags(tags) => {
                if self.options.flags.show_media_info {
                    self.report
                        .extend(tags.iter().map(|(key, value)| format!("{}: {}", key, value)));
                    self.request_quit(0);
                } else {
                    logger::debug(&format!("received {} tags", tags.len()));
                }
            }
            EngineEvent::Error(message) => {
                logger::error(&format!("engine error: {}", message));
                self.fail(message);
            }
        }
    }

    fn poll_remote(&mut self) {
        let Some(remote) = self.remote.as_mut() else {
            return;
        };
        let mut commands = Vec::new();
        while let Some(command) = remote.poll_command() {
            commands.push(command);
        }
        for command in commands {
            self.handle_transport(command);
        }
    }

    fn refresh_status(&mut self) {
        let (Some(ui), Some(engine)) = (self.ui.as_mut(), self.engine.as_ref()) else {
            return;
        };

        let view = StatusView {
            uri: self.playlist.current(),
            state: engine.state(),
            position: engine.position(),
            subtitle: self.subtitle.resolved_uri.as_deref(),
            item: self
                .playlist
                .current_index()
                .map(|index| (index + 1, self.playlist.len())),
        };
        if let Err(err) = ui.surface.show_status(&view) {
            logger::warn(&format!("status refresh failed: {:#}", err));
        }
    }

    fn request_quit(&mut self, code: i32) {
        if self.exit_code.is_none() {
            self.exit_code = Some(code);
        }
    }

    fn fail(&mut self, message: String) {
        self.last_error.get_or_insert(message);
        self.request_quit(1);
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn is_live(&self) -> bool {
        !matches!(self.state, SessionState::ShuttingDown | SessionState::Terminated)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if self.state != SessionState::Uninitialized {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::EngineState;
    use crate::core::history::HistoryError;
    use crate::core::uri;
    use anyhow::{bail, Result};
    use crossbeam_channel::Sender;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        EngineCreate,
        EngineSecret(bool),
        EngineLoop(bool),
        EngineWatch,
        EngineLoad(String),
        EngineSubtitle(String),
        EngineState(TargetState),
        EngineSave,
        EngineRelease,
        UiCreate,
        UiAttach,
        UiStart(Option<String>),
        UiRelease,
        Inhibit,
        InhibitRelease(u64),
        RecordVisit(String),
        RemoteAttach,
        RemoteClose,
    }

    /// Shared script the fakes read from and record into.
    #[derive(Default)]
    struct Script {
        journal: RefCell<Vec<Call>>,
        engine_fails: Cell<bool>,
        ui_fails: Cell<bool>,
        finished: Cell<bool>,
        watch: RefCell<Option<Sender<EngineEvent>>>,
        ui_events: RefCell<VecDeque<Option<UiEvent>>>,
        remote_commands: RefCell<VecDeque<TransportCommand>>,
    }

    impl Script {
        fn record(&self, call: Call) {
            self.journal.borrow_mut().push(call);
        }

        fn calls(&self) -> Vec<Call> {
            self.journal.borrow().clone()
        }

        fn count(&self, call: &Call) -> usize {
            self.journal.borrow().iter().filter(|c| *c == call).count()
        }

        fn emit(&self, event: EngineEvent) {
            let watch = self.watch.borrow();
            watch.as_ref().expect("event watch registered").send(event).unwrap();
        }
    }

    struct FakeEngine {
        script: Rc<Script>,
        uri: Option<String>,
        state: EngineState,
    }

    impl MediaEngine for FakeEngine {
        fn load_uri(&mut self, uri: &str) -> Result<()> {
            self.script.record(Call::EngineLoad(uri.to_string()));
            self.script.finished.set(false);
            self.uri = Some(uri.to_string());
            self.state = EngineState::Ready;
            Ok(())
        }

        fn set_subtitle_uri(&mut self, uri: &str) {
            self.script.record(Call::EngineSubtitle(uri.to_string()));
        }

        fn request_state(&mut self, target: TargetState) -> Result<()> {
            self.script.record(Call::EngineState(target));
            self.state = target.into();
            Ok(())
        }

        fn register_event_watch(&mut self, watch: Sender<EngineEvent>) {
            self.script.record(Call::EngineWatch);
            *self.script.watch.borrow_mut() = Some(watch);
        }

        fn set_secret(&mut self, secret: bool) {
            self.script.record(Call::EngineSecret(secret));
        }

        fn set_loop(&mut self, looping: bool) {
            self.script.record(Call::EngineLoop(looping));
        }

        fn state(&self) -> EngineState {
            self.state
        }

        fn position(&self) -> Duration {
            Duration::from_secs(42)
        }

        fn active_uri(&self) -> Option<&str> {
            self.uri.as_deref()
        }

        fn is_finished(&self) -> bool {
            self.script.finished.get()
        }

        fn save_resume_position(&mut self) -> Result<(), HistoryError> {
            self.script.record(Call::EngineSave);
            Ok(())
        }

        fn output_description(&self) -> String {
            "fake window".to_string()
        }

        fn release(&mut self) {
            self.script.record(Call::EngineRelease);
        }
    }

    struct FakeEngines(Rc<Script>);

    impl EngineFactory for FakeEngines {
        fn create(&mut self, _config: &EngineConfig) -> Result<Box<dyn MediaEngine>> {
            self.0.record(Call::EngineCreate);
            if self.0.engine_fails.get() {
                bail!("no pipeline");
            }
            Ok(Box::new(FakeEngine {
                script: self.0.clone(),
                uri: None,
                state: EngineState::Null,
            }))
        }
    }

    struct FakeSurface(Rc<Script>);

    impl UiSurface for FakeSurface {
        fn attach_video_surface(&mut self, _engine: &dyn MediaEngine) -> Result<()> {
            self.0.record(Call::UiAttach);
            Ok(())
        }

        fn start(&mut self, initial_uri: Option<&str>) -> Result<()> {
            self.0.record(Call::UiStart(initial_uri.map(str::to_string)));
            Ok(())
        }

        fn poll_event(&mut self, _timeout: Duration) -> Result<Option<UiEvent>> {
            Ok(self
                .0
                .ui_events
                .borrow_mut()
                .pop_front()
                .unwrap_or(Some(UiEvent::Quit)))
        }

        fn show_status(&mut self, _status: &StatusView<'_>) -> Result<()> {
            Ok(())
        }

        fn release(&mut self) {
            self.0.record(Call::UiRelease);
        }
    }

    struct FakeToolkit(Rc<Script>);

    impl UiToolkit for FakeToolkit {
        fn create(&mut self, _config: &UiConfig) -> Result<Box<dyn UiSurface>> {
            self.0.record(Call::UiCreate);
            if self.0.ui_fails.get() {
                bail!("no display");
            }
            Ok(Box::new(FakeSurface(self.0.clone())))
        }
    }

    struct FakeHistory(Rc<Script>);

    impl HistoryStore for FakeHistory {
        fn list_recent(&self) -> Vec<String> {
            Vec::new()
        }

        fn record_visit(&self, uri: &str) -> Result<(), HistoryError> {
            self.0.record(Call::RecordVisit(uri.to_string()));
            Ok(())
        }

        fn save_resume(&self, _uri: &str, _position: Duration) -> Result<(), HistoryError> {
            Ok(())
        }

        fn resume_position(&self, _uri: &str) -> Option<Duration> {
            None
        }
    }

    struct FakeInhibitor {
        script: Rc<Script>,
        next: u64,
    }

    impl ScreensaverInhibitor for FakeInhibitor {
        fn inhibit(&mut self, _reason: &str) -> Result<InhibitToken> {
            self.script.record(Call::Inhibit);
            self.next += 1;
            Ok(InhibitToken::new(self.next))
        }

        fn release(&mut self, token: InhibitToken) {
            self.script.record(Call::InhibitRelease(token.id()));
        }
    }

    struct FakeRemote(Rc<Script>);

    impl RemoteControl for FakeRemote {
        fn attach(&mut self, _info: &SessionInfo) {
            self.0.record(Call::RemoteAttach);
        }

        fn poll_command(&mut self) -> Option<TransportCommand> {
            self.0.remote_commands.borrow_mut().pop_front()
        }

        fn close(&mut self) {
            self.0.record(Call::RemoteClose);
        }
    }

    fn controller(script: &Rc<Script>, flags: Flags, uris: &[&str]) -> SessionController {
        controller_with(script, flags, uris, None, false)
    }

    fn controller_with(
        script: &Rc<Script>,
        flags: Flags,
        uris: &[&str],
        explicit_subtitle: Option<&str>,
        remote: bool,
    ) -> SessionController {
        let collaborators = Collaborators {
            engines: Box::new(FakeEngines(script.clone())),
            toolkit: Box::new(FakeToolkit(script.clone())),
            history: Rc::new(FakeHistory(script.clone())),
            screensaver: Box::new(FakeInhibitor {
                script: script.clone(),
                next: 0,
            }),
            remote: if remote {
                Some(Box::new(FakeRemote(script.clone())) as Box<dyn RemoteControl>)
            } else {
                None
            },
        };
        let options = SessionOptions {
            flags,
            explicit_subtitle: explicit_subtitle.map(str::to_string),
            tick: Duration::from_millis(1),
        };
        let playlist = PlaybackList::from_uris(uris.iter().map(|u| u.to_string()).collect());
        SessionController::new(options, playlist, collaborators)
    }

    /// Calls from the shutdown sequence: optional save, then the final stop.
    fn shutdown_tail(calls: &[Call]) -> &[Call] {
        let stop = calls
            .iter()
            .rposition(|call| *call == Call::EngineState(TargetState::Null))
            .expect("engine was stopped");
        let start = if stop > 0 && calls[stop - 1] == Call::EngineSave {
            stop - 1
        } else {
            stop
        };
        &calls[start..]
    }

    fn assert_paused_before_playing(calls: &[Call]) {
        let mut paused_since_load = false;
        for call in calls {
            match call {
                Call::EngineLoad(_) => paused_since_load = false,
                Call::EngineState(TargetState::Paused) => paused_since_load = true,
                Call::EngineState(TargetState::Playing) => {
                    assert!(paused_since_load, "Playing requested without Paused: {:?}", calls)
                }
                _ => {}
            }
        }
    }

    const MOVIE: &str = "file:///media/movie.mkv";
    const SECOND: &str = "file:///media/second.mkv";

    #[test]
    fn test_startup_sequence() {
        let script = Rc::new(Script::default());
        let explicit = std::env::temp_dir().join("lumen-subs.srt");
        let explicit = explicit.to_string_lossy();
        let mut session =
            controller_with(&script, Flags::default(), &[MOVIE], Some(explicit.as_ref()), false);

        session.start().unwrap();

        let subtitle_uri = uri::normalize(&explicit).unwrap();
        assert_eq!(
            script.calls(),
            vec![
                Call::EngineCreate,
                Call::EngineSecret(false),
                Call::EngineLoop(false),
                Call::UiCreate,
                Call::UiAttach,
                Call::EngineWatch,
                Call::EngineLoad(MOVIE.to_string()),
                Call::RecordVisit(MOVIE.to_string()),
                Call::EngineSubtitle(subtitle_uri),
                Call::UiStart(Some(MOVIE.to_string())),
                Call::EngineState(TargetState::Paused),
                Call::EngineState(TargetState::Playing),
                Call::Inhibit,
            ]
        );
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn test_empty_playlist_stays_ready() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[]);

        session.start().unwrap();

        assert_eq!(session.state(), SessionState::Ready);
        let calls = script.calls();
        assert!(calls.contains(&Call::UiStart(None)));
        assert!(!calls.iter().any(|c| matches!(c, Call::EngineState(_) | Call::EngineLoad(_))));
        assert_eq!(session.subtitle(), &SubtitleChoice::none());
    }

    #[test]
    fn test_engine_failure_aborts_before_ui() {
        let script = Rc::new(Script::default());
        script.engine_fails.set(true);
        let mut session = controller(&script, Flags::default(), &[MOVIE]);

        let err = session.start().unwrap_err();

        assert!(matches!(err, SessionError::ResourceInit { component: "media engine", .. }));
        assert_eq!(script.calls(), vec![Call::EngineCreate]);
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_ui_failure_tears_down_engine() {
        let script = Rc::new(Script::default());
        script.ui_fails.set(true);
        let mut session = controller(&script, Flags::default(), &[MOVIE]);

        assert!(session.start().is_err());

        assert_eq!(
            script.calls(),
            vec![
                Call::EngineCreate,
                Call::EngineSecret(false),
                Call::EngineLoop(false),
                Call::UiCreate,
                Call::EngineState(TargetState::Null),
                Call::EngineRelease,
            ]
        );
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_shutdown_order_after_playback() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[MOVIE]);
        session.start().unwrap();

        session.shutdown();

        let calls = script.calls();
        assert_eq!(
            shutdown_tail(&calls),
            [
                Call::EngineSave,
                Call::EngineState(TargetState::Null),
                Call::InhibitRelease(1),
                Call::UiRelease,
                Call::EngineRelease,
            ]
        );
        assert_eq!(session.state(), SessionState::Terminated);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let script = Rc::new(Script::default());
        let mut session = controller_with(&script, Flags::default(), &[MOVIE], None, true);
        session.start().unwrap();

        session.shutdown();
        let after_first = script.calls();
        session.shutdown();
        drop(session);

        assert_eq!(script.calls(), after_first);
        assert_eq!(script.count(&Call::EngineRelease), 1);
        assert_eq!(script.count(&Call::UiRelease), 1);
        assert_eq!(script.count(&Call::InhibitRelease(1)), 1);
        assert_eq!(script.count(&Call::RemoteClose), 1);
    }

    #[test]
    fn test_secret_mode_skips_history_and_resume() {
        let script = Rc::new(Script::default());
        let flags = Flags {
            secret: true,
            ..Flags::default()
        };
        let mut session = controller(&script, flags, &[MOVIE, SECOND]);
        session.start().unwrap();
        script.emit(EngineEvent::EndOfStream);
        script.ui_events.borrow_mut().push_back(None);

        assert_eq!(session.run(), 0);

        let calls = script.calls();
        assert!(calls.contains(&Call::EngineSecret(true)));
        assert!(calls.contains(&Call::EngineLoad(SECOND.to_string())));
        assert!(!calls.iter().any(|c| matches!(c, Call::RecordVisit(_))));
        assert!(!calls.contains(&Call::EngineSave));
    }

    #[test]
    fn test_finished_item_is_not_saved() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[MOVIE]);
        session.start().unwrap();
        script.finished.set(true);
        script.emit(EngineEvent::EndOfStream);
        script.ui_events.borrow_mut().push_back(None);

        assert_eq!(session.run(), 0);

        let calls = script.calls();
        assert!(!calls.contains(&Call::EngineSave));
        assert_eq!(
            shutdown_tail(&calls),
            [
                Call::EngineState(TargetState::Null),
                Call::InhibitRelease(1),
                Call::UiRelease,
                Call::EngineRelease,
            ]
        );
    }

    #[test]
    fn test_end_of_stream_advances_without_subtitles() {
        let script = Rc::new(Script::default());
        let mut session =
            controller_with(&script, Flags::default(), &[MOVIE, SECOND], Some("/tmp/x.srt"), false);
        session.start().unwrap();
        script.emit(EngineEvent::EndOfStream);
        script.ui_events.borrow_mut().push_back(None);

        assert_eq!(session.run(), 0);

        let calls = script.calls();
        let second_load = calls
            .iter()
            .position(|c| *c == Call::EngineLoad(SECOND.to_string()))
            .unwrap();
        assert_eq!(calls[second_load - 1], Call::EngineState(TargetState::Null));
        assert_eq!(
            calls[second_load + 1..second_load + 5],
            [
                Call::RecordVisit(SECOND.to_string()),
                Call::UiStart(Some(SECOND.to_string())),
                Call::EngineState(TargetState::Paused),
                Call::EngineState(TargetState::Playing),
            ]
        );
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::EngineSubtitle(_))).count(), 1);
        assert_eq!(script.count(&Call::Inhibit), 1);
        assert_paused_before_playing(&calls);
        assert_eq!(session.playlist().current(), Some(SECOND));
    }

    #[test]
    fn test_end_of_last_item_quits() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[MOVIE]);
        session.start().unwrap();
        script.emit(EngineEvent::EndOfStream);
        // Would loop forever if the end of stream did not quit.
        script
            .ui_events
            .borrow_mut()
            .extend([None, Some(UiEvent::TogglePause)]);

        assert_eq!(session.run(), 0);
        assert_eq!(script.count(&Call::EngineState(TargetState::Paused)), 1);
    }

    #[test]
    fn test_media_info_quits_after_tags() {
        let script = Rc::new(Script::default());
        let flags = Flags {
            show_media_info: true,
            ..Flags::default()
        };
        let mut session = controller(&script, flags, &[MOVIE]);
        session.start().unwrap();
        script.emit(EngineEvent::Tags(vec![("title".into(), "Movie".into())]));
        script
            .ui_events
            .borrow_mut()
            .extend([None, Some(UiEvent::TogglePause)]);

        assert_eq!(session.run(), 0);
        assert_eq!(script.count(&Call::EngineState(TargetState::Paused)), 1);
    }

    #[test]
    fn test_engine_error_exits_nonzero() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[MOVIE]);
        session.start().unwrap();
        script.emit(EngineEvent::Error("decoder exploded".into()));
        script.ui_events.borrow_mut().push_back(None);

        assert_eq!(session.run(), 1);
        assert_eq!(script.count(&Call::EngineRelease), 1);
    }

    #[test]
    fn test_toggle_pause_from_ui() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[MOVIE]);
        session.start().unwrap();
        script
            .ui_events
            .borrow_mut()
            .extend([Some(UiEvent::TogglePause), Some(UiEvent::TogglePause)]);

        assert_eq!(session.run(), 0);

        let calls = script.calls();
        let transitions: Vec<_> = calls
            .iter()
            .filter_map(|c| match c {
                Call::EngineState(target) => Some(*target),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            [
                TargetState::Paused,
                TargetState::Playing,
                TargetState::Paused,
                TargetState::Playing,
                TargetState::Null,
            ]
        );
    }

    #[test]
    fn test_empty_session_ignores_transport() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[]);
        session.start().unwrap();
        script
            .ui_events
            .borrow_mut()
            .extend([Some(UiEvent::TogglePause), Some(UiEvent::Next)]);

        assert_eq!(session.run(), 0);

        let calls = script.calls();
        assert_eq!(
            calls.iter().filter(|c| matches!(c, Call::EngineState(_))).count(),
            1,
            "only the shutdown stop: {:?}",
            calls
        );
        assert!(!calls.contains(&Call::EngineSave));
        assert!(!calls.iter().any(|c| matches!(c, Call::InhibitRelease(_))));
    }

    #[test]
    fn test_remote_next_and_close() {
        let script = Rc::new(Script::default());
        let mut session = controller_with(&script, Flags::default(), &[MOVIE, SECOND], None, true);
        session.start().unwrap();
        script.remote_commands.borrow_mut().push_back(TransportCommand::Next);
        script.ui_events.borrow_mut().push_back(None);

        assert_eq!(session.run(), 0);

        let calls = script.calls();
        assert!(calls.contains(&Call::RemoteAttach));
        assert!(calls.contains(&Call::EngineLoad(SECOND.to_string())));
        assert_eq!(calls.last(), Some(&Call::RemoteClose));
        assert_paused_before_playing(&calls);
    }

    #[test]
    fn test_interrupt_runs_shutdown() {
        let script = Rc::new(Script::default());
        let flag = Arc::new(AtomicBool::new(true));
        let mut session = controller(&script, Flags::default(), &[MOVIE]).with_interrupt(flag);
        session.start().unwrap();
        script
            .ui_events
            .borrow_mut()
            .extend([Some(UiEvent::TogglePause), Some(UiEvent::TogglePause)]);

        assert_eq!(session.run(), 0);

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(script.count(&Call::EngineState(TargetState::Paused)), 1);
        assert_eq!(script.count(&Call::EngineRelease), 1);
    }

    #[test]
    fn test_blind_mode_keeps_screensaver() {
        let script = Rc::new(Script::default());
        let flags = Flags {
            blind: true,
            ..Flags::default()
        };
        let mut session = controller(&script, flags, &[MOVIE]);
        session.start().unwrap();
        session.shutdown();

        assert_eq!(script.count(&Call::Inhibit), 0);
    }

    #[test]
    fn test_drop_shuts_down() {
        let script = Rc::new(Script::default());
        let mut session = controller(&script, Flags::default(), &[MOVIE]);
        session.start().unwrap();
        drop(session);

        assert_eq!(script.count(&Call::EngineRelease), 1);
        assert_eq!(script.count(&Call::UiRelease), 1);
    }
}
