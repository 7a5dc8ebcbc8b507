//! DSP components: the effect contract and the built-in effects.

pub mod effects;
