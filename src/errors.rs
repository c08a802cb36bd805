// SPDX-License-Identifier: MPL-2.0

//! Error types for the barcode scanner
//!
//! Nothing on the frame path returns these to the producer: a failing
//! engine halts the scheduler instead. They surface from configuration
//! loading, engine construction and the command-line front end.

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Detection engine errors
    Engine(EngineError),
    /// Configuration errors
    Config(ConfigError),
    /// Image loading or conversion errors
    Image(String),
    /// Generic error with message
    Other(String),
}

/// Errors raised by a detection engine while handling a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The decoder backing the engine could not be initialized
    DecoderUnavailable(String),
    /// A frame was submitted after the engine was torn down
    Released,
    /// The engine rejected or failed to process a frame
    Failed(String),
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Config file could not be read or written
    Io(String),
    /// Config file is not valid JSON for the expected schema
    Parse(String),
    /// Config parsed but holds unusable values
    Invalid(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Engine(e) => write!(f, "Engine error: {}", e),
            AppError::Config(e) => write!(f, "Configuration error: {}", e),
            AppError::Image(msg) => write!(f, "Image error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::DecoderUnavailable(msg) => write!(f, "Decoder unavailable: {}", msg),
            EngineError::Released => write!(f, "Engine already released"),
            EngineError::Failed(msg) => write!(f, "Frame processing failed: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid value: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for EngineError {}
impl std::error::Error for ConfigError {}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::Engine(err)
    }
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
