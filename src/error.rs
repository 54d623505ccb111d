use std::fmt;

use crate::types::Characteristic;

/// Coarse failure class, matching what the host reports to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Protocol,
    UnknownState,
    Config,
}

#[derive(Debug)]
pub enum Error {
    Http(reqwest::Error),
    Timeout,
    Status { status: u16, body: String },
    Protocol(String),
    MissingResult { idx: u32 },
    Rejected { title: String, message: String },
    UnknownLevel(i64),
    UnknownCharacteristicValue(String),
    OutOfRange { characteristic: Characteristic, value: f64, min: f64, max: f64 },
    ReadOnly(Characteristic),
    Config(String),
    Io(std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) => ErrorKind::Network,
            Error::Timeout => ErrorKind::Timeout,
            Error::Status { .. }
            | Error::Protocol(_)
            | Error::MissingResult { .. }
            | Error::Rejected { .. } => ErrorKind::Protocol,
            Error::UnknownLevel(_)
            | Error::UnknownCharacteristicValue(_)
            | Error::OutOfRange { .. }
            | Error::ReadOnly(_) => ErrorKind::UnknownState,
            Error::Config(_) | Error::Io(_) => ErrorKind::Config,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Timeout => write!(f, "request to Domoticz timed out"),
            Error::Status { status, body } => write!(f, "unexpected status {status}: {body}"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::MissingResult { idx } => write!(f, "no result for device idx {idx}"),
            Error::Rejected { title, message } => {
                write!(f, "Domoticz rejected {title}: {message}")
            }
            Error::UnknownLevel(level) => write!(f, "unknown heating/cooling level: {level}"),
            Error::UnknownCharacteristicValue(v) => write!(f, "unknown characteristic value: {v}"),
            Error::OutOfRange { characteristic, value, min, max } => {
                write!(f, "{characteristic} value {value} outside {min}..={max}")
            }
            Error::ReadOnly(name) => write!(f, "characteristic {name} is read-only"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Http(e) => Some(e),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Http(e)
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
