use std::fmt;

use tokio::sync::mpsc::error::SendError;
use tui_logger::TuiLoggerError;

#[derive(Debug)]
pub enum SnoobrowseError {
    Logger(String),
    IO(String),
    Http(String),
    Json(String),
    Config(String),
    Image(String),
    Channel(String),
    /// Write endpoints (voting) need an OAuth token in the config.
    Auth(String),
}

impl fmt::Display for SnoobrowseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnoobrowseError::Logger(msg) => write!(f, "logger: {msg}"),
            SnoobrowseError::IO(msg) => write!(f, "io: {msg}"),
            SnoobrowseError::Http(msg) => write!(f, "http: {msg}"),
            SnoobrowseError::Json(msg) => write!(f, "json: {msg}"),
            SnoobrowseError::Config(msg) => write!(f, "config: {msg}"),
            SnoobrowseError::Image(msg) => write!(f, "image: {msg}"),
            SnoobrowseError::Channel(msg) => write!(f, "channel: {msg}"),
            SnoobrowseError::Auth(msg) => write!(f, "auth: {msg}"),
        }
    }
}

impl std::error::Error for SnoobrowseError {}

impl From<TuiLoggerError> for SnoobrowseError {
    fn from(value: TuiLoggerError) -> Self {
        SnoobrowseError::Logger(match value {
            TuiLoggerError::SetLoggerError(set_logger_error) => set_logger_error.to_string(),
            TuiLoggerError::ThreadError(error) => error.to_string(),
        })
    }
}

impl From<std::io::Error> for SnoobrowseError {
    fn from(value: std::io::Error) -> Self {
        SnoobrowseError::IO(value.to_string())
    }
}

impl From<reqwest::Error> for SnoobrowseError {
    fn from(value: reqwest::Error) -> Self {
        SnoobrowseError::Http(value.to_string())
    }
}

impl From<serde_json::Error> for SnoobrowseError {
    fn from(value: serde_json::Error) -> Self {
        SnoobrowseError::Json(value.to_string())
    }
}

impl From<toml::de::Error> for SnoobrowseError {
    fn from(value: toml::de::Error) -> Self {
        SnoobrowseError::Config(value.to_string())
    }
}

impl From<toml::ser::Error> for SnoobrowseError {
    fn from(value: toml::ser::Error) -> Self {
        SnoobrowseError::Config(value.to_string())
    }
}

impl From<image::ImageError> for SnoobrowseError {
    fn from(value: image::ImageError) -> Self {
        SnoobrowseError::Image(value.to_string())
    }
}

impl<T> From<SendError<T>> for SnoobrowseError {
    fn from(value: SendError<T>) -> Self {
        SnoobrowseError::Channel(value.to_string())
    }
}
