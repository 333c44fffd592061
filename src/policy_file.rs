//! YAML policy files.
//!
//! Custom task sets can be described in a file instead of using a built-in
//! profile:
//!
//! ```yaml
//! rateLimit: treatAsSuccess
//! wait:
//!   min: 1
//!   max: 5
//! tasks:
//!   - name: "GET /products"
//!     weight: 3
//!     endpoint: /product-service/api/products
//!     classifier:
//!       type: catalog
//!   - name: "GET /orders/{id}"
//!     weight: 1
//!     endpoint: /order-service/api/orders/1
//!     classifier:
//!       type: order
//!       notFound: treatAsSuccess
//!       rateLimit: treatAsFailure
//! ```
//!
//! Catalog and order tasks must end up with a rate-limit policy: their own
//! `rateLimit`, else the caller's default (the `RATE_LIMIT_POLICY` environment
//! variable), else the file-level `rateLimit`. Missing everywhere is an error.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::classifier::{Classifier, NotFoundPolicy, RateLimitPolicy};
use crate::errors::ConfigError;
use crate::policy::TaskPolicy;
use crate::task::Task;
use crate::wait_time::WaitTime;

/// Root of a policy file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFile {
    #[serde(rename = "rateLimit")]
    pub rate_limit: Option<RateLimitPolicy>,

    pub wait: PolicyFileWait,

    pub tasks: Vec<PolicyFileTask>,
}

/// Wait interval in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFileWait {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyFileTask {
    pub name: String,

    #[serde(default = "default_weight")]
    pub weight: u32,

    pub endpoint: String,

    pub classifier: PolicyFileClassifier,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PolicyFileClassifier {
    Catalog {
        #[serde(rename = "rateLimit")]
        rate_limit: Option<RateLimitPolicy>,
    },
    Health,
    Order {
        #[serde(rename = "notFound", default = "default_not_found")]
        not_found: NotFoundPolicy,
        #[serde(rename = "rateLimit")]
        rate_limit: Option<RateLimitPolicy>,
    },
}

fn default_not_found() -> NotFoundPolicy {
    NotFoundPolicy::TreatAsSuccess
}

impl PolicyFile {
    /// Load a policy file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a policy file from a YAML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolve classifiers and validate weights and the wait interval.
    pub fn into_policy(
        self,
        default_rate_limit: Option<RateLimitPolicy>,
    ) -> Result<TaskPolicy, ConfigError> {
        let fallback = default_rate_limit.or(self.rate_limit);

        let mut tasks = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            let resolve = |own: Option<RateLimitPolicy>| {
                own.or(fallback).ok_or_else(|| {
                    ConfigError::invalid(
                        "POLICY_FILE",
                        task.name.clone(),
                        "No rateLimit policy for this task. Set it on the task, at the top level of the file, or via RATE_LIMIT_POLICY.",
                    )
                })
            };

            let classifier = match task.classifier {
                PolicyFileClassifier::Catalog { rate_limit } => Classifier::CatalogBrowse {
                    rate_limit: resolve(rate_limit)?,
                },
                PolicyFileClassifier::Health => Classifier::HealthCheck,
                PolicyFileClassifier::Order {
                    not_found,
                    rate_limit,
                } => Classifier::OrderLookup {
                    not_found,
                    rate_limit: resolve(rate_limit)?,
                },
            };

            tasks.push(Task::new(task.name, task.weight, task.endpoint, classifier));
        }

        let wait = WaitTime::between(self.wait.min, self.wait.max)?;
        TaskPolicy::new(tasks, wait)
    }
}
