//! Error types and handling for the `SpotMap` engine

use thiserror::Error;

/// Main error type for the `SpotMap` engine
#[derive(Error, Debug)]
pub enum SpotMapError {
    /// A fetch was superseded before its result could be applied.
    /// This is control flow, never shown to the user.
    #[error("Fetch cancelled")]
    Cancelled,

    /// Network or repository failures
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Position lookup failed or was denied
    #[error("Geolocation error: {message}")]
    Geolocation { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SpotMapError {
    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new geolocation error
    pub fn geolocation<S: Into<String>>(message: S) -> Self {
        Self::Geolocation {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SpotMapError::Cancelled)
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SpotMapError::Cancelled => String::new(),
            SpotMapError::Transport { .. } => {
                "Failed to load spots. Please check your connection and try again.".to_string()
            }
            SpotMapError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            SpotMapError::Geolocation { .. } => {
                "Unable to determine your current location.".to_string()
            }
            SpotMapError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            SpotMapError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}
