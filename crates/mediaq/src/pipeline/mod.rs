pub mod error;
pub mod runner;

pub use error::EngineError;
pub use runner::Engine;
