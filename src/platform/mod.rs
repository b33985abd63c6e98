pub mod history_file;
pub mod inhibit;

pub use history_file::JsonHistory;
pub use inhibit::ProcessInhibitor;
