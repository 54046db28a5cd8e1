use std::{fmt::Display, io, path::PathBuf};

use reqwest::StatusCode;

#[derive(Debug)]
pub enum Error {
    Internal(String),
    Filesystem { path: PathBuf, source: io::Error },
    Reqwest(reqwest::Error),
    RequestReturnedError { url: String, status: StatusCode },
    SiteStructure(String),
    Config(config::ConfigError),
    Json(serde_json::Error),
    Interrupted,
}

impl Error {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Network failures and unaccepted HTTP statuses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Reqwest(_) | Self::RequestReturnedError { .. })
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {}", msg),
            Self::Filesystem { path, .. } => write!(f, "filesystem error at '{}'", path.display()),
            Self::Reqwest(_) => write!(f, "reqwest error"),
            Self::RequestReturnedError { url, status } => {
                write!(f, "the request to '{}' returned '{}'", url, status)
            }
            Self::SiteStructure(msg) => write!(f, "unexpected site structure: {}", msg),
            Self::Config(_) => write!(f, "configuration error"),
            Self::Json(_) => write!(f, "json error"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filesystem { source, .. } => Some(source),
            Self::Reqwest(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Internal(_)
            | Self::RequestReturnedError { .. }
            | Self::SiteStructure(_)
            | Self::Interrupted => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Reqwest(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}
