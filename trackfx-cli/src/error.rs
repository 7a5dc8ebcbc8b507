//! Errors surfaced by CLI commands.

use std::fmt::{Display, Formatter};

use trackfx_lib::error::{ConfigError, RenderError};

#[derive(Debug)]
pub enum CliError {
    InvalidArgument(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    Config(ConfigError),
    Render(RenderError),
    Wav(hound::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(err) => write!(f, "invalid argument: {}", err),
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Json(err) => write!(f, "manifest error: {}", err),
            Self::Config(err) => write!(f, "effect config error: {}", err),
            Self::Render(err) => write!(f, "render error: {}", err),
            Self::Wav(err) => write!(f, "wav error: {}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RenderError> for CliError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<hound::Error> for CliError {
    fn from(value: hound::Error) -> Self {
        Self::Wav(value)
    }
}
