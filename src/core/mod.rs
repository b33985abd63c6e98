pub mod engine;
pub mod history;
pub mod playlist;
pub mod remote;
pub mod screensaver;
pub mod session;
pub mod subtitle;
pub mod ui;
pub mod uri;

pub use playlist::PlaybackList;
pub use session::{Collaborators, SessionController, SessionOptions};
