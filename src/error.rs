// ABOUTME: Error types for tal-login
// ABOUTME: Application errors plus the per-attempt login failure taxonomy

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Errors from the IO subsystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Interactive prompt failures
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Generic application errors
    #[error("{0}")]
    Generic(String),
}

/// Create a new generic error with a message
pub fn generic_error<S: Into<String>>(message: S) -> AppError {
    AppError::Generic(message.into())
}

/// Why a single login step failed.
///
/// These never escape [`crate::auth::Authenticator`]; they are folded into the
/// message of a failed [`crate::models::LoginResult`].
#[derive(Error, Debug)]
pub enum LoginError {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered and refused the credentials or code
    #[error("{}", rejected_text(.status, .message))]
    Rejected {
        status: Option<u16>,
        message: Option<String>,
    },

    /// The server answered with something we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl LoginError {
    /// A rejection carrying the server's own message
    pub fn rejected<S: Into<String>>(message: S) -> Self {
        LoginError::Rejected {
            status: None,
            message: Some(message.into()),
        }
    }

    /// A rejection identified only by its HTTP status, with an optional server message
    pub fn rejected_with_status(status: u16, message: Option<String>) -> Self {
        LoginError::Rejected {
            status: Some(status),
            message,
        }
    }

    /// Server-provided rejection text, if this is a rejection that has one
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            LoginError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for LoginError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LoginError::MalformedResponse(err.to_string())
        } else {
            LoginError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for LoginError {
    fn from(err: serde_json::Error) -> Self {
        LoginError::MalformedResponse(err.to_string())
    }
}

fn rejected_text(status: &Option<u16>, message: &Option<String>) -> String {
    match (message.as_deref().map(str::trim), status) {
        (Some(message), _) if !message.is_empty() => message.to_string(),
        (_, Some(status)) => format!("Login failed with status: {}", status),
        _ => "Login rejected".to_string(),
    }
}
