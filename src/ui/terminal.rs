use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

use super::window;
use crate::core::engine::{EngineState, MediaEngine};
use crate::core::ui::{StatusView, UiConfig, UiEvent, UiSurface, UiToolkit};
use crate::core::uri;
use crate::shared::constants;
use crate::utils::{logger, time_utils};

type UiTerminal = Terminal<CrosstermBackend<io::Stderr>>;

const CONTROLS_HINT: &str = "space/p: pause/play   n: next   q/esc: quit";

/// Builds [`TerminalSurface`]s on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalToolkit;

impl UiToolkit for TerminalToolkit {
    fn create(&mut self, config: &UiConfig) -> Result<Box<dyn UiSurface>> {
        let terminal = setup_terminal()?;
        Ok(Box::new(TerminalSurface {
            terminal: Some(terminal),
            config: *config,
            output: String::new(),
            title: String::new(),
            fullscreen_requested: false,
        }))
    }
}

/// Status panel and keyboard input for one session.
pub struct TerminalSurface {
    terminal: Option<UiTerminal>,
    config: UiConfig,
    output: String,
    title: String,
    fullscreen_requested: bool,
}

impl TerminalSurface {
    fn draw(&mut self, status: Option<&StatusView<'_>>) -> Result<()> {
        let rows = match status {
            Some(status) => status_rows(status, &self.output),
            None => vec![("Media", "nothing to play".to_string())],
        };
        let title = self.title.clone();
        let hint = (!self.config.hide_controls).then_some(CONTROLS_HINT);

        let Some(terminal) = self.terminal.as_mut() else {
            return Ok(());
        };
        terminal
            .draw(|frame| draw_panel(frame, &title, &rows, hint))
            .context("failed to draw status panel")?;
        Ok(())
    }
}

impl UiSurface for TerminalSurface {
    fn attach_video_surface(&mut self, engine: &dyn MediaEngine) -> Result<()> {
        self.output = engine.output_description();
        if self.config.fullscreen && !self.config.blind {
            self.fullscreen_requested = window::request_fullscreen();
        }
        logger::debug(&format!("video output: {}", self.output));
        Ok(())
    }

    fn start(&mut self, initial_uri: Option<&str>) -> Result<()> {
        self.title = match initial_uri {
            Some(uri) => uri::display_name(uri),
            None => constants::APP_NAME.to_string(),
        };
        self.draw(None)
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<UiEvent>> {
        if !event::poll(timeout).context("failed to poll terminal events")? {
            return Ok(None);
        }
        match event::read().context("failed to read terminal event")? {
            Event::Key(key) => Ok(map_key(key)),
            _ => Ok(None),
        }
    }

    fn show_status(&mut self, status: &StatusView<'_>) -> Result<()> {
        if let Some(uri) = status.uri {
            self.title = uri::display_name(uri);
        }
        self.draw(Some(status))
    }

    fn release(&mut self) {
        if let Some(mut terminal) = self.terminal.take() {
            if let Err(err) = restore_terminal(&mut terminal) {
                logger::warn(&format!("failed to restore terminal: {:#}", err));
            }
        }
        if std::mem::take(&mut self.fullscreen_requested) {
            window::restore_window();
        }
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        self.release();
    }
}

fn setup_terminal() -> Result<UiTerminal> {
    enable_raw_mode().context("failed to enable raw mode")?;

    let mut stderr = io::stderr();
    if let Err(err) = execute!(stderr, EnterAlternateScreen, Hide) {
        let _ = disable_raw_mode();
        return Err(err).context("failed to switch to alternate screen");
    }

    let backend = CrosstermBackend::new(stderr);
    match Terminal::new(backend) {
        Ok(terminal) => Ok(terminal),
        Err(err) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stderr(), LeaveAlternateScreen, Show);
            Err(err).context("failed to initialize terminal backend")
        }
    }
}

fn restore_terminal(terminal: &mut UiTerminal) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn map_key(key: KeyEvent) -> Option<UiEvent> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(UiEvent::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(UiEvent::Quit),
        KeyCode::Char(' ') | KeyCode::Char('p') => Some(UiEvent::TogglePause),
        KeyCode::Char('n') | KeyCode::Char('>') => Some(UiEvent::Next),
        _ => None,
    }
}

fn state_label(state: EngineState) -> &'static str {
    match state {
        EngineState::Null => "stopped",
        EngineState::Ready => "ready",
        EngineState::Paused => "paused",
        EngineState::Playing => "playing",
    }
}

fn status_rows(status: &StatusView<'_>, output: &str) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("State", state_label(status.state).to_string()),
        ("Position", time_utils::format_timestamp(status.position)),
    ];
    if let Some((number, total)) = status.item {
        rows.push(("Item", format!("{}/{}", number, total)));
    }
    rows.push((
        "Subtitle",
        status
            .subtitle
            .map(uri::display_name)
            .unwrap_or_else(|| "none".to_string()),
    ));
    if !output.is_empty() {
        rows.push(("Output", output.to_string()));
    }
    rows
}

fn draw_panel(frame: &mut Frame<'_>, title: &str, rows: &[(&str, String)], hint: Option<&str>) {
    let area = frame.size();

    let block = Block::default().borders(Borders::ALL).title(Span::styled(
        format!(" {} | {} ", constants::APP_NAME, title),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let lines: Vec<Line<'_>> = rows
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{:>9}: ", label),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(value.as_str()),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), chunks[0]);

    if let Some(hint) = hint {
        let footer = Paragraph::new(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(footer, chunks[1]);
    }
}
