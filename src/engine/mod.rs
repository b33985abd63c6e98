pub mod clock;
pub mod ffplay;
pub mod probe;

pub use ffplay::FfplayFactory;
