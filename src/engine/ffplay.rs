use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::Sender;
use std::process::{Child, Command, Stdio};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::clock::PlaybackClock;
use super::probe;
use crate::core::engine::{
    EngineConfig, EngineEvent, EngineFactory, EngineState, MediaEngine, TargetState,
};
use crate::core::history::{HistoryError, HistoryStore};
use crate::core::uri;
use crate::utils::config::Config;
use crate::utils::logger;

const WATCH_INTERVAL: Duration = Duration::from_millis(100);

/// Creates [`FfplayEngine`]s after checking the player binary runs.
pub struct FfplayFactory {
    player: String,
    probe: String,
    history: Rc<dyn HistoryStore>,
}

impl FfplayFactory {
    pub fn new(config: &Config, history: Rc<dyn HistoryStore>) -> Self {
        Self {
            player: config.player.clone(),
            probe: config.probe.clone(),
            history,
        }
    }
}

impl EngineFactory for FfplayFactory {
    fn create(&mut self, config: &EngineConfig) -> Result<Box<dyn MediaEngine>> {
        let status = Command::new(&self.player)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("cannot run {}", self.player))?;
        if !status.success() {
            bail!("{} -version exited with {}", self.player, status);
        }

        logger::info(&format!("using {} as playback engine", self.player));
        Ok(Box::new(FfplayEngine::new(
            &self.player,
            &self.probe,
            self.history.clone(),
            *config,
        )))
    }
}

/// One running player process and the thread watching it.
struct Playback {
    child: Arc<Mutex<Child>>,
    running: Arc<AtomicBool>,
    watcher: Option<JoinHandle<()>>,
}

/// Media engine backed by an external `ffplay` process.
///
/// `Paused` spawns the process and stops it with SIGSTOP, `Playing`
/// continues it, `Null` kills and reaps it.
pub struct FfplayEngine {
    player: String,
    probe: String,
    history: Rc<dyn HistoryStore>,
    config: EngineConfig,
    secret: bool,
    looping: bool,
    uri: Option<String>,
    subtitle: Option<String>,
    playback: Option<Playback>,
    finished: Arc<AtomicBool>,
    clock: PlaybackClock,
    state: EngineState,
    watch: Option<Sender<EngineEvent>>,
}

impl FfplayEngine {
    pub fn new(player: &str, probe: &str, history: Rc<dyn HistoryStore>, config: EngineConfig) -> Self {
        Self {
            player: player.to_string(),
            probe: probe.to_string(),
            history,
            config,
            secret: false,
            looping: false,
            uri: None,
            subtitle: None,
            playback: None,
            finished: Arc::new(AtomicBool::new(false)),
            clock: PlaybackClock::default(),
            state: EngineState::Null,
            watch: None,
        }
    }

    fn player_args(&self, uri: &str) -> Vec<String> {
        let mut args: Vec<String> = ["-hide_banner", "-loglevel", "error", "-autoexit"]
            .iter()
            .map(|arg| arg.to_string())
            .collect();

        args.push("-window_title".to_string());
        args.push(uri::display_name(uri));

        if self.config.blind {
            args.push("-nodisp".to_string());
        }
        if self.config.fullscreen {
            args.push("-fs".to_string());
        }
        if self.looping {
            args.extend(["-loop".to_string(), "0".to_string()]);
        }

        let start = self.clock.elapsed();
        if !start.is_zero() {
            args.push("-ss".to_string());
            args.push(format!("{:.3}", start.as_secs_f64()));
        }

        if !self.config.blind {
            if let Some(path) = self.subtitle.as_deref().and_then(uri::to_local_path) {
                args.push("-vf".to_string());
                args.push(format!("subtitles={}", filter_escape(&path.to_string_lossy())));
            }
        }

        args.push(media_input(uri));
        args
    }

    fn spawn(&mut self) -> Result<()> {
        let uri = self.uri.as_deref().ok_or_else(|| anyhow!("no media loaded"))?;
        let args = self.player_args(uri);
        logger::debug(&format!("spawning {} {}", self.player, args.join(" ")));

        let child = Command::new(&self.player)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start {}", self.player))?;

        let child = Arc::new(Mutex::new(child));
        let running = Arc::new(AtomicBool::new(true));
        let watcher = self.watch.clone().map(|watch| {
            spawn_watcher(
                child.clone(),
                running.clone(),
                self.finished.clone(),
                watch,
                self.player.clone(),
            )
        });

        self.playback = Some(Playback {
            child,
            running,
            watcher,
        });
        Ok(())
    }

    fn stop_process(&mut self) {
        let Some(mut playback) = self.playback.take() else {
            return;
        };

        playback.running.store(false, Ordering::SeqCst);
        if let Ok(mut child) = playback.child.lock() {
            if matches!(child.try_wait(), Ok(None)) {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
        if let Some(watcher) = playback.watcher.take() {
            let _ = watcher.join();
        }
    }

    #[cfg(unix)]
    fn signal(&self, signal: libc::c_int) -> Result<()> {
        let Some(playback) = &self.playback else {
            return Ok(());
        };
        let mut child = playback
            .child
            .lock()
            .map_err(|_| anyhow!("player process lock poisoned"))?;

        // An exited child may already be reaped and its pid reused.
        if child.try_wait()?.is_some() {
            return Ok(());
        }

        let pid = libc::pid_t::try_from(child.id()).context("player pid out of range")?;
        // SAFETY: kill(2) only takes plain integers; pid is our own unreaped child.
        let rc = unsafe { libc::kill(pid, signal) };
        if rc != 0 {
            return Err(std::io::Error::last_os_error()).context("failed to signal player");
        }
        Ok(())
    }

    fn hold(&mut self) -> Result<()> {
        #[cfg(unix)]
        self.signal(libc::SIGSTOP)?;
        #[cfg(not(unix))]
        logger::warn("pausing the player is not supported on this platform");
        Ok(())
    }

    fn proceed(&mut self) -> Result<()> {
        #[cfg(unix)]
        self.signal(libc::SIGCONT)?;
        Ok(())
    }

    fn probe_in_background(&self, uri: &str) {
        let Some(watch) = self.watch.clone() else {
            logger::warn("media info requested without an event watch");
            return;
        };
        let program = self.probe.clone();
        let input = media_input(uri);

        thread::spawn(move || {
            let tags = probe::probe_tags(&program, &input).unwrap_or_else(|err| {
                logger::warn(&format!("tag probe failed: {:#}", err));
                Vec::new()
            });
            let _ = watch.send(EngineEvent::Tags(tags));
        });
    }

    /// Drops the stored resume point of an item that played to its end.
    fn forget_finished(&self) {
        let Some(uri) = self.uri.as_deref() else {
            return;
        };
        if self.secret || !self.is_finished() {
            return;
        }
        if let Err(err) = self.history.save_resume(uri, Duration::ZERO) {
            logger::warn(&format!("could not clear resume point of {}: {}", uri, err));
        }
    }

    fn notify(&self, event: EngineEvent) {
        if let Some(watch) = &self.watch {
            let _ = watch.send(event);
        }
    }
}

impl MediaEngine for FfplayEngine {
    fn load_uri(&mut self, uri: &str) -> Result<()> {
        self.stop_process();

        self.uri = Some(uri.to_string());
        self.subtitle = None;
        self.finished = Arc::new(AtomicBool::new(false));

        let resume = if self.secret {
            None
        } else {
            self.history.resume_position(uri)
        };
        if let Some(offset) = resume {
            logger::info(&format!("resuming {} at {:.1}s", uri, offset.as_secs_f64()));
        }
        self.clock.reset(resume.unwrap_or_default());

        self.state = EngineState::Ready;
        self.notify(EngineEvent::StateChanged(EngineState::Ready));

        if self.config.probe_tags {
            self.probe_in_background(uri);
        }
        Ok(())
    }

    fn set_subtitle_uri(&mut self, uri: &str) {
        if uri::to_local_path(uri).is_none() {
            logger::warn(&format!("only local subtitle files are supported: {}", uri));
        }
        self.subtitle = Some(uri.to_string());
    }

    fn request_state(&mut self, target: TargetState) -> Result<()> {
        match target {
            TargetState::Null => {
                self.stop_process();
                self.clock.pause();
                self.forget_finished();
            }
            TargetState::Paused => {
                if self.playback.is_none() {
                    self.spawn()?;
                }
                self.hold()?;
                self.clock.pause();
            }
            TargetState::Playing => {
                if self.playback.is_none() {
                    self.spawn()?;
                }
                self.proceed()?;
                self.clock.resume();
            }
        }

        self.state = target.into();
        self.notify(EngineEvent::StateChanged(self.state));
        Ok(())
    }

    fn register_event_watch(&mut self, watch: Sender<EngineEvent>) {
        self.watch = Some(watch);
    }

    fn set_secret(&mut self, secret: bool) {
        self.secret = secret;
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn state(&self) -> EngineState {
        self.state
    }

    fn position(&self) -> Duration {
        self.clock.elapsed()
    }

    fn active_uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn save_resume_position(&mut self) -> Result<(), HistoryError> {
        let Some(uri) = self.uri.as_deref() else {
            return Ok(());
        };
        if self.secret {
            return Ok(());
        }
        if self.is_finished() {
            return self.history.save_resume(uri, Duration::ZERO);
        }
        // The clock keeps counting across repeats, so it is no position
        // within the file.
        if self.looping {
            return Ok(());
        }
        self.history.save_resume(uri, self.clock.elapsed())
    }

    fn output_description(&self) -> String {
        match (self.config.blind, self.config.fullscreen) {
            (true, _) => "audio only".to_string(),
            (false, true) => format!("{} fullscreen window", self.player),
            (false, false) => format!("{} window", self.player),
        }
    }

    fn release(&mut self) {
        self.stop_process();
        self.watch = None;
        self.state = EngineState::Null;
    }
}

impl Drop for FfplayEngine {
    fn drop(&mut self) {
        self.stop_process();
    }
}

fn spawn_watcher(
    child: Arc<Mutex<Child>>,
    running: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    watch: Sender<EngineEvent>,
    player: String,
) -> JoinHandle<()> {
    thread::spawn(move || {
        while running.load(Ordering::SeqCst) {
            let polled = match child.lock() {
                Ok(mut child) => child.try_wait(),
                Err(_) => return,
            };

            match polled {
                Ok(Some(status)) => {
                    // Killed on purpose by stop_process.
                    if !running.load(Ordering::SeqCst) {
                        return;
                    }
                    let event = if status.success() {
                        finished.store(true, Ordering::SeqCst);
                        EngineEvent::EndOfStream
                    } else {
                        EngineEvent::Error(format!("{} exited with {}", player, status))
                    };
                    let _ = watch.send(event);
                    return;
                }
                Ok(None) => thread::sleep(WATCH_INTERVAL),
                Err(err) => {
                    let _ = watch.send(EngineEvent::Error(format!("lost track of {}: {}", player, err)));
                    return;
                }
            }
        }
    })
}

/// What ffplay gets as input: a plain path for local files, the URI
/// otherwise.
fn media_input(uri: &str) -> String {
    uri::to_local_path(uri)
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|| uri.to_string())
}

/// Escapes a value for use as a filter option inside an ffmpeg
/// filtergraph: once for the option parser, then again for the graph.
fn filter_escape(value: &str) -> String {
    let option = backslash_escape(value, &['\\', '\'', ':']);
    backslash_escape(&option, &['\\', '\'', '[', ']', ',', ';'])
}

fn backslash_escape(value: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
