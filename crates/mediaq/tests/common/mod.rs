//! Shared test utilities for mediaq integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated test execution with temp directories
//! - Scriptable fakes standing in for yt-dlp and the notification transport

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
