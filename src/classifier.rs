//! Response classification.
//!
//! Maps the HTTP status of one probe to an [`Outcome`]. Whether a 429 or a 404
//! counts as success is never implicit: it is carried by [`RateLimitPolicy`]
//! and [`NotFoundPolicy`] on the classifier itself.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of classifying one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Failure reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(reason) => Some(reason.as_str()),
        }
    }

    /// Metric label: "success" or "failure".
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure(_) => "failure",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "Success"),
            Outcome::Failure(reason) => write!(f, "Failure({})", reason),
        }
    }
}

/// How an HTTP 429 (rate limited) response is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RateLimitPolicy {
    /// Rate limiting is expected backpressure, not a defect.
    TreatAsSuccess,
    TreatAsFailure,
}

impl RateLimitPolicy {
    /// Parses `success` / `failure` (and the long variant names).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "success" | "treatassuccess" | "expected" => Some(RateLimitPolicy::TreatAsSuccess),
            "failure" | "treatasfailure" | "strict" => Some(RateLimitPolicy::TreatAsFailure),
            _ => None,
        }
    }
}

/// How an HTTP 404 on an order lookup is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotFoundPolicy {
    /// A missing order is a valid answer from the order service.
    TreatAsSuccess,
    TreatAsFailure,
}

/// Classification rules for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classifier {
    /// Product catalog listing.
    CatalogBrowse { rate_limit: RateLimitPolicy },

    /// Liveness probe: only 200 passes.
    HealthCheck,

    /// Single order resource.
    OrderLookup {
        not_found: NotFoundPolicy,
        rate_limit: RateLimitPolicy,
    },
}

const RATE_LIMIT_REASON: &str = "Rate Limit: too many requests (429)";

impl Classifier {
    /// Classify an HTTP status code.
    pub fn classify(&self, status: u16) -> Outcome {
        match *self {
            Classifier::CatalogBrowse { rate_limit } => match status {
                200 => Outcome::Success,
                404 => Outcome::Failure("Endpoint not found (404)".to_string()),
                429 => classify_rate_limited(rate_limit),
                s if s >= 500 => server_error(s),
                s => unexpected(s),
            },
            Classifier::HealthCheck => match status {
                200 => Outcome::Success,
                s => Outcome::Failure(format!("Health check failed with status {}", s)),
            },
            Classifier::OrderLookup {
                not_found,
                rate_limit,
            } => match status {
                200 => Outcome::Success,
                404 => match not_found {
                    NotFoundPolicy::TreatAsSuccess => Outcome::Success,
                    NotFoundPolicy::TreatAsFailure => {
                        Outcome::Failure("Order not found (404)".to_string())
                    }
                },
                429 => classify_rate_limited(rate_limit),
                s if s >= 500 => server_error(s),
                s => unexpected(s),
            },
        }
    }

    /// Short name used in logs and the startup summary.
    pub fn kind(&self) -> &'static str {
        match self {
            Classifier::CatalogBrowse { .. } => "catalog",
            Classifier::HealthCheck => "health",
            Classifier::OrderLookup { .. } => "order",
        }
    }
}

fn classify_rate_limited(policy: RateLimitPolicy) -> Outcome {
    match policy {
        RateLimitPolicy::TreatAsSuccess => Outcome::Success,
        RateLimitPolicy::TreatAsFailure => Outcome::Failure(RATE_LIMIT_REASON.to_string()),
    }
}

fn server_error(status: u16) -> Outcome {
    Outcome::Failure(format!("Server error {}", status))
}

fn unexpected(status: u16) -> Outcome {
    Outcome::Failure(format!("Unexpected status code {}", status))
}
