use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failed transport exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportCode {
    NotFound,
    Unauthorized,
    RateLimited,
    ClientError,
    ServerError,
    /// No response at all: connection refused, DNS, unreadable file.
    Unreachable,
}

impl TransportCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            404 | 410 => Self::NotFound,
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited,
            400..=499 => Self::ClientError,
            500..=599 => Self::ServerError,
            _ => Self::Unreachable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Unreachable => "unreachable",
        }
    }
}

/// Terminal failure of one load. None of these are retried automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("transport error ({}){}: {message}", .code.as_str(), status_suffix(.status))]
    Transport {
        status: Option<u16>,
        code: TransportCode,
        message: String,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("shape error: {0}")]
    Shape(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" HTTP {}", s)).unwrap_or_default()
}

impl LoadError {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            code: TransportCode::from_status(status),
            message: message.into(),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            code: TransportCode::Unreachable,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Parse(_) => "parse",
            Self::Shape(_) => "shape",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_from_status() {
        assert_eq!(TransportCode::from_status(404), TransportCode::NotFound);
        assert_eq!(TransportCode::from_status(403), TransportCode::Unauthorized);
        assert_eq!(TransportCode::from_status(429), TransportCode::RateLimited);
        assert_eq!(TransportCode::from_status(418), TransportCode::ClientError);
        assert_eq!(TransportCode::from_status(503), TransportCode::ServerError);
    }

    #[test]
    fn test_display() {
        let err = LoadError::status(500, "boom");
        assert_eq!(err.to_string(), "transport error (server_error) HTTP 500: boom");
        assert_eq!(err.kind(), "transport");
        let err = LoadError::unreachable("connection refused");
        assert_eq!(err.to_string(), "transport error (unreachable): connection refused");
    }
}
