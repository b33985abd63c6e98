use clap::error::ErrorKind;
use clap::{ArgAction, CommandFactory, Parser};
use std::ffi::OsString;

use crate::shared::constants;

#[derive(Parser, Debug)]
#[command(
    name = constants::APP_NAME,
    about = "<media file> - Play movie files",
    disable_help_flag = true,
    disable_version_flag = true
)]
struct Cli {
    /// Blind mode (audio only)
    #[arg(short = 'b', long)]
    blind: bool,
    /// Fullscreen mode
    #[arg(short = 'f', long)]
    fullscreen: bool,
    /// Hide on screen controls
    #[arg(short = 'h', long = "hide-controls")]
    hide_controls: bool,
    /// Looping mode
    #[arg(short = 'l', long = "loop")]
    looping: bool,
    /// Print media information and exit
    #[arg(short = 'i', long = "media-info")]
    media_info: bool,
    /// Show recently viewed
    #[arg(short = 'r', long)]
    recent: bool,
    /// Views not saved in recently viewed history
    #[arg(short = 's', long)]
    secret: bool,
    /// Use this subtitle file
    #[arg(short = 't', long = "subtitles", value_name = "FILE")]
    subtitles: Option<String>,
    /// Show lumen's version
    #[arg(short = 'v', long)]
    version: bool,
    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
    /// Media files or URIs, played in the order given
    #[arg(value_name = "FILE_OR_URI")]
    uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Play,
    ShowHistory,
    ShowVersion,
    ShowHelp,
    /// Malformed arguments; carries the message shown to the user.
    ParseError(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    pub blind: bool,
    pub fullscreen: bool,
    pub hide_controls: bool,
    pub looping: bool,
    pub secret: bool,
    pub show_media_info: bool,
}

/// One parsed invocation. Check `mode` before reading anything else: only
/// `Mode::Play` fills in flags, subtitles and tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub mode: Mode,
    pub flags: Flags,
    pub explicit_subtitle_path: Option<String>,
    pub raw_tokens: Vec<String>,
}

impl InvocationRequest {
    /// Parses a full argument vector, program name first.
    pub fn parse<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

        match Cli::try_parse_from(args.clone()) {
            Ok(cli) => Self::from_cli(cli),
            Err(err) if err.kind() == ErrorKind::DisplayHelp => Self::informational(Mode::ShowHelp),
            Err(err) => Self::recover(&args, err.to_string()),
        }
    }

    fn from_cli(cli: Cli) -> Self {
        if cli.recent {
            return Self::informational(Mode::ShowHistory);
        }
        if cli.version {
            return Self::informational(Mode::ShowVersion);
        }
        if cli.uris.is_empty() {
            return Self::informational(Mode::ShowHelp);
        }

        Self {
            mode: Mode::Play,
            flags: Flags {
                blind: cli.blind,
                fullscreen: cli.fullscreen,
                hide_controls: cli.hide_controls,
                looping: cli.looping,
                secret: cli.secret,
                show_media_info: cli.media_info,
            },
            explicit_subtitle_path: cli.subtitles,
            raw_tokens: cli.uris,
        }
    }

    /// `--recent` and `--version` win even over tokens clap rejects.
    fn recover(args: &[OsString], message: String) -> Self {
        let options = args
            .iter()
            .skip(1)
            .take_while(|arg| arg.as_os_str() != "--")
            .filter_map(|arg| arg.to_str());

        let mut version = false;
        for option in options {
            match option {
                "--recent" | "-r" => return Self::informational(Mode::ShowHistory),
                "--version" | "-v" => version = true,
                _ => {}
            }
        }

        if version {
            Self::informational(Mode::ShowVersion)
        } else {
            Self::informational(Mode::ParseError(message))
        }
    }

    fn informational(mode: Mode) -> Self {
        Self {
            mode,
            flags: Flags::default(),
            explicit_subtitle_path: None,
            raw_tokens: Vec::new(),
        }
    }
}

/// Help text rendered by clap for the option table above.
pub fn help_text() -> String {
    Cli::command().render_help().to_string()
}
