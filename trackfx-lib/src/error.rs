//! Error types for effect processing, chain mutation, configuration loading
//! and window rendering.

use std::fmt::{Display, Formatter};

/// Error raised by an [`Effect`](crate::dsp::effects::Effect) while processing a block.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectError {
    InvalidInput(String),
    Processing(String),
}

impl Display for EffectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(err) => write!(f, "invalid input: {}", err),
            Self::Processing(err) => write!(f, "processing failed: {}", err),
        }
    }
}

impl std::error::Error for EffectError {}

/// Error type for effect-chain mutation and processing.
#[derive(Debug)]
pub enum ChainError {
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    Effect {
        index: usize,
        name: String,
        source: EffectError,
    },
    LengthMismatch {
        index: usize,
        name: String,
        expected: usize,
        actual: usize,
    },
}

impl Display for ChainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "slot index {} out of range for chain of {}", index, len)
            }
            Self::Effect { index, name, source } => {
                write!(f, "effect \"{}\" in slot {} failed: {}", name, index, source)
            }
            Self::LengthMismatch {
                index,
                name,
                expected,
                actual,
            } => write!(
                f,
                "effect \"{}\" in slot {} returned {} samples, expected {}",
                name, index, actual, expected
            ),
        }
    }
}

impl std::error::Error for ChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Effect { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error type for rebuilding chains from persisted configuration.
#[derive(Debug)]
pub enum ConfigError {
    UnknownEffectType { index: usize, type_name: String },
    Json(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownEffectType { index, type_name } => write!(
                f,
                "unknown effect type \"{}\" at config entry {}",
                type_name, index
            ),
            Self::Json(err) => write!(f, "json error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Error type for window rendering.
#[derive(Debug)]
pub enum RenderError {
    InvalidWindow(String),
    Chain { track: usize, source: ChainError },
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidWindow(err) => write!(f, "invalid render window: {}", err),
            Self::Chain { track, source } => {
                write!(f, "effect chain on track {} failed: {}", track, source)
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Chain { source, .. } => Some(source),
            _ => None,
        }
    }
}
