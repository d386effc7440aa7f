pub mod filesystem;

pub use filesystem::{relocate, MediaStore};
