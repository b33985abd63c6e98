mod cli;
mod core;
mod engine;
mod platform;
mod shared;
mod ui;
mod utils;

use std::process::ExitCode;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cli::report;
use crate::cli::{InvocationRequest, Mode};
use crate::core::history::HistoryStore;
use crate::core::{Collaborators, PlaybackList, SessionController, SessionOptions};
use crate::engine::FfplayFactory;
use crate::platform::{JsonHistory, ProcessInhibitor};
use crate::ui::TerminalToolkit;
use crate::utils::config::Config;
use crate::utils::logger;

const EXIT_PARSE_ERROR: u8 = 1;
const EXIT_RESOURCE_INIT: u8 = 2;

fn main() -> ExitCode {
    logger::init();

    let request = InvocationRequest::parse(std::env::args_os());
    logger::debug(&format!("invocation mode: {:?}", request.mode));

    match request.mode {
        Mode::ShowHistory => {
            let config = Config::load();
            let history = JsonHistory::new(config.history_path(), config.history_limit);
            print!("{}", report::format_history(&history.list_recent()));
            ExitCode::SUCCESS
        }
        Mode::ShowVersion => {
            report::print_version();
            ExitCode::SUCCESS
        }
        Mode::ShowHelp => {
            report::print_help();
            ExitCode::SUCCESS
        }
        Mode::ParseError(ref message) => {
            print!("{}", message);
            ExitCode::from(EXIT_PARSE_ERROR)
        }
        Mode::Play => play(request),
    }
}

fn play(request: InvocationRequest) -> ExitCode {
    for token in &request.raw_tokens {
        println!("Adding file: {}", token);
    }

    let (playlist, dropped) = PlaybackList::build(&request.raw_tokens);
    for entry in &dropped {
        logger::warn(&format!("skipping '{}': {}", entry.token, entry.reason));
        eprintln!("WARNING: skipping '{}': {}", entry.token, entry.reason);
    }

    let config = Config::load();
    let store = JsonHistory::new(config.history_path(), config.history_limit);
    logger::debug(&format!("history file: {}", store.path().display()));
    let history: Rc<dyn HistoryStore> = Rc::new(store);

    let collaborators = Collaborators {
        engines: Box::new(FfplayFactory::new(&config, history.clone())),
        toolkit: Box::new(TerminalToolkit),
        history,
        screensaver: Box::new(ProcessInhibitor::new(&config.inhibitor)),
        remote: None,
    };
    let options = SessionOptions {
        flags: request.flags,
        explicit_subtitle: request.explicit_subtitle_path,
        tick: config.tick,
    };

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = interrupt.clone();
    if let Err(err) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        logger::warn(&format!("cannot install signal handler: {}", err));
    }

    let mut session = SessionController::new(options, playlist, collaborators).with_interrupt(interrupt);
    if let Err(err) = session.start() {
        eprintln!("ERROR: {:#}", anyhow::Error::from(err));
        return ExitCode::from(EXIT_RESOURCE_INIT);
    }
    logger::info(&format!(
        "session {:?} with {} item(s), subtitle {:?}",
        session.state(),
        session.playlist().len(),
        session.subtitle().source
    ));

    let code = session.run();
    logger::info(&format!("exiting with code {}", code));
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
