//! Error handling for hostname probing runs.
//!
//! This module defines the error type shared by the library. Most of the
//! variants describe a failure of the whole run; `Transport` is the one
//! exception, it only ever lives inside the probe and is mapped to
//! "protocol not working" before anything leaves it.

use std::fmt;

/// Main error type for probing operations.
#[derive(Debug, Clone)]
pub enum SniCheckError {
    /// The hostname list was empty, nothing was probed
    EmptyInput,

    /// A single HTTP or HTTPS request failed (refused, timeout, TLS, DNS).
    ///
    /// Recovered inside the probe and never returned by the orchestrator.
    Transport {
        scheme: String,
        hostname: String,
        message: String,
    },

    /// Unexpected failure while a worker handled one hostname
    WorkerInternal { hostname: String, message: String },

    /// The run was cancelled by the user (Ctrl-C)
    Interrupted,

    /// Configuration errors (invalid settings, unreadable TOML, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading host lists or writing artifacts
    FileError { path: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl SniCheckError {
    /// Create a new transport error for one protocol attempt.
    pub fn transport<S: Into<String>, H: Into<String>, M: Into<String>>(
        scheme: S,
        hostname: H,
        message: M,
    ) -> Self {
        Self::Transport {
            scheme: scheme.into(),
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a new worker internal error.
    pub fn worker_internal<H: Into<String>, M: Into<String>>(hostname: H, message: M) -> Self {
        Self::WorkerInternal {
            hostname: hostname.into(),
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Attach the hostname a transport error was produced for.
    ///
    /// Other variants are returned unchanged.
    pub fn for_hostname<H: Into<String>>(self, hostname: H) -> Self {
        match self {
            Self::Transport {
                scheme, message, ..
            } => Self::Transport {
                scheme,
                hostname: hostname.into(),
                message,
            },
            other => other,
        }
    }
}

impl fmt::Display for SniCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Hostname list is empty, nothing to check"),
            Self::Transport {
                scheme,
                hostname,
                message,
            } => write!(f, "{} request for '{}' failed: {}", scheme, hostname, message),
            Self::WorkerInternal { hostname, message } => {
                write!(f, "Worker failed while checking '{}': {}", hostname, message)
            }
            Self::Interrupted => write!(f, "Check interrupted by user"),
            Self::ConfigError { message } => write!(f, "Configuration error: {}", message),
            Self::FileError { path, message } => write!(f, "File error at '{}': {}", path, message),
            Self::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for SniCheckError {}

impl From<reqwest::Error> for SniCheckError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        let scheme = err
            .url()
            .map(|u| u.scheme().to_string())
            .unwrap_or_else(|| "http".to_string());
        Self::Transport {
            scheme,
            hostname: String::new(),
            message: format!("{}: {}", kind, err),
        }
    }
}

impl From<std::io::Error> for SniCheckError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<toml::de::Error> for SniCheckError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigError {
            message: format!("Failed to parse TOML configuration: {}", err),
        }
    }
}

impl From<tokio::task::JoinError> for SniCheckError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal {
            message: format!("Task failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_hostname_only_touches_transport() {
        let err = SniCheckError::transport("http", "", "timeout").for_hostname("x.com");
        assert_eq!(err.to_string(), "http request for 'x.com' failed: timeout");

        let err = SniCheckError::config("bad").for_hostname("x.com");
        assert!(matches!(err, SniCheckError::ConfigError { .. }));
    }

    #[test]
    fn test_display_messages() {
        let err = SniCheckError::transport("https", "x.com", "connection refused");
        assert_eq!(
            err.to_string(),
            "https request for 'x.com' failed: connection refused"
        );

        let err = SniCheckError::file_error("sni.txt", "not found");
        assert_eq!(err.to_string(), "File error at 'sni.txt': not found");

        assert!(SniCheckError::EmptyInput.to_string().contains("empty"));
    }

    #[test]
    fn test_toml_error_maps_to_config_error() {
        let err = toml::from_str::<toml::Value>("not = [valid").unwrap_err();
        let converted: SniCheckError = err.into();
        assert!(matches!(converted, SniCheckError::ConfigError { .. }));
    }
}
