use std::path::PathBuf;
use thiserror::Error;

/// Main error type for mpcycle operations
#[derive(Error, Debug)]
pub enum MpcycleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Player option error: {0}")]
    Option(#[from] OptionError),

    #[error("Process error: {0}")]
    Process(#[from] ProcessError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {path:?}")]
    FileRead { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse TOML configuration: {message}")]
    TomlParse { message: String },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("No configuration has been received yet")]
    NotLoaded,
}

/// Window arrangement errors
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("Window {slot} has no window_position and layout is 'none'")]
    MissingPosition { slot: usize },

    #[error("Window {slot} needs window_size.{dimension} to place the next window")]
    MissingSize { slot: usize, dimension: &'static str },
}

/// Player option resolution errors
#[derive(Error, Debug)]
pub enum OptionError {
    #[error("Invalid option {option} for window {slot}: {reason}")]
    InvalidOption {
        slot: usize,
        option: &'static str,
        reason: String,
    },
}

/// Player process errors
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to spawn player for window {slot}: {command:?}")]
    SpawnFailed {
        slot: usize,
        command: String,
        source: std::io::Error,
    },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Unknown window index: {index}")]
    UnknownSlot { index: usize },
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, MpcycleError>;

impl From<toml::de::Error> for MpcycleError {
    fn from(err: toml::de::Error) -> Self {
        MpcycleError::Config(ConfigError::TomlParse {
            message: err.to_string(),
        })
    }
}

// Error reporting utilities
pub trait ErrorReporting {
    fn log_error(&self, context: &str);
    fn user_friendly_message(&self) -> String;
}

impl ErrorReporting for MpcycleError {
    fn log_error(&self, context: &str) {
        log::error!("{}: {}", context, self.user_friendly_message());
    }

    fn user_friendly_message(&self) -> String {
        match self {
            MpcycleError::Config(ConfigError::FileRead { path, .. }) => {
                format!("Configuration file not found: {:?}", path)
            }
            MpcycleError::Config(ConfigError::TomlParse { message }) => {
                format!("Invalid configuration format: {}", message)
            }
            MpcycleError::Config(ConfigError::NotLoaded) => {
                "No configuration loaded. Send one with `mpcycle-cli set-config` first.".to_string()
            }
            MpcycleError::Process(ProcessError::SpawnFailed { slot, command, source }) => {
                format!("Could not launch {} for window {}: {}", command, slot, source)
            }
            _ => self.to_string(),
        }
    }
}
