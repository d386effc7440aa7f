pub mod driver;

pub use driver::{Driver, Tick, POLL_INTERVAL};
