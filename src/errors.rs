//! Error types for the load generator.
//!
//! Two kinds of errors exist. [`ConfigError`] is fatal and surfaces before any
//! virtual user starts. [`ErrorCategory`] labels per-probe failures for
//! reporting; those never stop the run.

use thiserror::Error;

/// Errors detected while building the task policy or the run configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("task set is empty")]
    NoTasks,

    #[error("total task weight must be greater than 0 (tasks: {0})")]
    ZeroTotalWeight(String),

    #[error("invalid wait interval [{lo}, {hi}]: {reason}")]
    InvalidWaitInterval { lo: f64, hi: f64, reason: String },

    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: '{value}'. {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read policy file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse policy file: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Categories of probe failures, used as metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP 4xx responses the classifier rejected
    ClientError,

    /// HTTP 5xx responses
    ServerError,

    /// Network connectivity errors (DNS, connection refused, etc.)
    NetworkError,

    /// Request timeout errors
    TimeoutError,

    /// TLS/SSL certificate errors
    TlsError,

    /// Other/unknown errors
    OtherError,
}

impl ErrorCategory {
    /// Categorize a rejected HTTP status code.
    ///
    /// Returns None for 2xx/3xx; those only fail when a classifier says so,
    /// and then they are reported as [`ErrorCategory::OtherError`] by the caller.
    pub fn from_status_code(status_code: u16) -> Option<Self> {
        match status_code {
            200..=399 => None,
            400..=499 => Some(ErrorCategory::ClientError),
            500..=599 => Some(ErrorCategory::ServerError),
            _ => Some(ErrorCategory::OtherError),
        }
    }

    /// Categorize a transport-level reqwest error.
    pub fn from_reqwest_error(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            return ErrorCategory::TimeoutError;
        }

        // TLS handshake failures surface as connect errors, so look at the
        // message before falling back to the error kind.
        let error_msg = full_error_chain(error).to_lowercase();
        if error_msg.contains("certificate") || error_msg.contains("tls") || error_msg.contains("ssl") {
            ErrorCategory::TlsError
        } else if error.is_connect() || error.is_request() || error.is_body() || error.is_decode() {
            ErrorCategory::NetworkError
        } else if error_msg.contains("timed out") || error_msg.contains("timeout") {
            ErrorCategory::TimeoutError
        } else if error_msg.contains("dns")
            || error_msg.contains("resolve")
            || error_msg.contains("connect")
        {
            ErrorCategory::NetworkError
        } else {
            ErrorCategory::OtherError
        }
    }

    /// Get the Prometheus label for this error category.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::ClientError => "client_error",
            ErrorCategory::ServerError => "server_error",
            ErrorCategory::NetworkError => "network_error",
            ErrorCategory::TimeoutError => "timeout_error",
            ErrorCategory::TlsError => "tls_error",
            ErrorCategory::OtherError => "other_error",
        }
    }
}

/// Renders an error with all of its sources, joined by ": ".
///
/// reqwest's top-level message is often just "error sending request"; the
/// useful part (connection refused, certificate expired) lives in the sources.
pub fn full_error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        let inner_msg = inner.to_string();
        if !message.contains(&inner_msg) {
            message.push_str(": ");
            message.push_str(&inner_msg);
        }
        source = inner.source();
    }
    message
}
