//! # trackfx
//!
//! Per-track audio effect chains for a multitrack workstation.
//!
//! Each track owns an ordered [`chain::EffectChain`] of effect slots. The
//! [`render`] module sums timeline clips per track, runs every chain over its
//! track, applies track volume and mixes into a clamped master buffer; the
//! same path serves offline export and real-time block playback. Chains
//! persist through the [`config`] bridge, which rebuilds effects by type name
//! from an explicit [`config::EffectRegistry`].

pub mod chain;
pub mod config;
pub mod diagnostics;
pub mod dsp;
pub mod error;
pub mod render;
