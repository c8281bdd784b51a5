//! E2E test harness for pulse.
//!
//! This module contains test infrastructure with intentionally unused
//! helpers that will be used as more e2e scenarios are written.

#![allow(dead_code)]

pub mod clock;

// Re-export commonly used types
pub use clock::MockClock;
pub use runners::{CountingRunner, FailingRunner};
pub use workspace::TestWorkspace;
