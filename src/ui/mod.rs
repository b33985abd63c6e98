pub mod terminal;
pub mod window;

pub use terminal::TerminalToolkit;
