//! Diagnostics helpers for checking chain cost against real-time deadlines.

#[cfg(feature = "bench")]
pub mod bench;
