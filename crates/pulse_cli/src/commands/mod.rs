//! Command implementations for the pulse CLI.

pub mod mark;
pub mod reset;
pub mod status;
pub mod sweep;
pub mod sync;
