pub mod args;
pub mod report;

pub use args::{InvocationRequest, Mode};
