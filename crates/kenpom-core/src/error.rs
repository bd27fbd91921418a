use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::calendar::GameDate;
use crate::request::Endpoint;

/// Validation errors raised while constructing requests and dates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("date must be formatted YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },

    #[error("parameter '{name}' is not recognized by endpoint '{endpoint}'")]
    UnknownParameter { endpoint: Endpoint, name: String },
    #[error("parameter '{name}' for endpoint '{endpoint}' expects {expected}")]
    InvalidParameterType {
        endpoint: Endpoint,
        name: &'static str,
        expected: &'static str,
    },
    #[error("endpoint '{endpoint}' requires {requirement}")]
    MissingParameter {
        endpoint: Endpoint,
        requirement: &'static str,
    },

    #[error("invalid endpoint '{value}'")]
    InvalidEndpoint { value: String },
}

/// Errors raised while reading [`crate::Settings`] from the environment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing {key} in environment")]
    MissingApiKey { key: &'static str },
    #[error("{key} has invalid value '{value}': expected {expected}")]
    InvalidValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Classification attached to every failed upstream attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Credentials missing or rejected (401/403).
    Auth,
    /// Upstream asked us to slow down (429).
    RateLimit,
    /// 5xx, timeouts and transport failures.
    ServerTransient,
    /// Any other 4xx: the request itself is wrong.
    ClientPermanent,
}

impl ErrorClass {
    /// Maps a non-success HTTP status onto its classification.
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Auth,
            429 => Self::RateLimit,
            500..=599 => Self::ServerTransient,
            _ => Self::ClientPermanent,
        }
    }

    pub const fn retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerTransient)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::ServerTransient => "server_transient",
            Self::ClientPermanent => "client_permanent",
        }
    }
}

impl Display for ErrorClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of one logical request, after retries were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    class: ErrorClass,
    message: String,
    status: Option<u16>,
    attempts: u32,
}

impl ClassifiedError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            status: None,
            attempts: 1,
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        let class = ErrorClass::from_status(status);
        let message = match class {
            ErrorClass::Auth => format!("auth failed (HTTP {status}); check the bearer token"),
            ErrorClass::RateLimit => {
                format!("rate limited (HTTP {status}); reduce requests per second")
            }
            ErrorClass::ServerTransient => format!("server error (HTTP {status})"),
            ErrorClass::ClientPermanent => {
                let snippet: String = body.chars().take(200).collect();
                format!("client error (HTTP {status}): {snippet}")
            }
        };

        Self {
            class,
            message,
            status: Some(status),
            attempts: 1,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub const fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    pub const fn retryable(&self) -> bool {
        self.class.retryable()
    }

    pub const fn code(&self) -> &'static str {
        match self.class {
            ErrorClass::Auth => "access.auth",
            ErrorClass::RateLimit => "access.rate_limit",
            ErrorClass::ServerTransient => "access.server_transient",
            ErrorClass::ClientPermanent => "access.client_permanent",
        }
    }
}

impl Display for ClassifiedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, after {} attempt(s))",
            self.message,
            self.code(),
            self.attempts
        )
    }
}

impl std::error::Error for ClassifiedError {}

/// Public error of the access layer and the point-in-time resolver.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Request(#[from] ClassifiedError),

    #[error("failed to decode '{endpoint}' payload: {source}")]
    Decode {
        endpoint: Endpoint,
        #[source]
        source: serde_json::Error,
    },

    /// `event_date` is `None` for preseason requests, which name a season instead.
    #[error("no valid historical source{}: {reason}", for_event(.event_date))]
    NoValidHistoricalSource {
        event_date: Option<GameDate>,
        reason: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl AccessError {
    pub fn no_historical_source(event_date: GameDate, reason: impl Into<String>) -> Self {
        Self::NoValidHistoricalSource {
            event_date: Some(event_date),
            reason: reason.into(),
        }
    }

    pub fn no_preseason_source(reason: impl Into<String>) -> Self {
        Self::NoValidHistoricalSource {
            event_date: None,
            reason: reason.into(),
        }
    }

    /// Classification of the underlying upstream failure, if any.
    pub fn class(&self) -> Option<ErrorClass> {
        match self {
            Self::Request(error) => Some(error.class()),
            _ => None,
        }
    }
}

fn for_event(event_date: &Option<GameDate>) -> String {
    event_date
        .map(|date| format!(" for event date {date}"))
        .unwrap_or_default()
}
