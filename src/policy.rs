//! The task policy a virtual user follows.
//!
//! A [`TaskPolicy`] owns the weighted task set and the wait interval. The
//! driver calls it repeatedly: `select_and_run`, then `sample_wait`. It keeps
//! no state between calls and is shared read-only across all virtual users.

use std::fmt;
use std::time::Duration;
use tracing::info;

use crate::classifier::{Classifier, NotFoundPolicy, RateLimitPolicy};
use crate::client::{build_client, TransportConfig};
use crate::errors::ConfigError;
use crate::probe::{probe, ProbeRecord};
use crate::selector::TaskSelector;
use crate::task::Task;
use crate::wait_time::WaitTime;

pub const PRODUCTS_ENDPOINT: &str = "/product-service/api/products";
pub const PRODUCT_HEALTH_ENDPOINT: &str = "/product-service/actuator/health";
pub const ORDER_ENDPOINT: &str = "/order-service/api/orders/1";

/// Built-in task sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyProfile {
    /// Catalog browsing plus health checks, waiting 1-3s. For small targets.
    SafeMode,

    /// Catalog browsing plus order lookups, waiting 1-5s.
    Ecommerce,
}

impl PolicyProfile {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "safe-mode" | "safe_mode" | "safemode" => Some(PolicyProfile::SafeMode),
            "ecommerce" | "e-commerce" => Some(PolicyProfile::Ecommerce),
            _ => None,
        }
    }

    /// Rate-limit handling used when none is configured.
    ///
    /// Safe mode runs against targets without a rate limiter, so a 429 there
    /// is a defect. The e-commerce gateway rate-limits on purpose.
    pub fn default_rate_limit(&self) -> RateLimitPolicy {
        match self {
            PolicyProfile::SafeMode => RateLimitPolicy::TreatAsFailure,
            PolicyProfile::Ecommerce => RateLimitPolicy::TreatAsSuccess,
        }
    }

    pub fn default_wait(&self) -> (f64, f64) {
        match self {
            PolicyProfile::SafeMode => (1.0, 3.0),
            PolicyProfile::Ecommerce => (1.0, 5.0),
        }
    }

    /// The profile's tasks with the given rate-limit handling.
    pub fn tasks(&self, rate_limit: RateLimitPolicy) -> Vec<Task> {
        match self {
            PolicyProfile::SafeMode => vec![
                Task::new(
                    "view_products",
                    3,
                    PRODUCTS_ENDPOINT,
                    Classifier::CatalogBrowse { rate_limit },
                ),
                Task::new("health_check", 1, PRODUCT_HEALTH_ENDPOINT, Classifier::HealthCheck),
            ],
            PolicyProfile::Ecommerce => vec![
                Task::new(
                    "GET /products",
                    3,
                    PRODUCTS_ENDPOINT,
                    Classifier::CatalogBrowse { rate_limit },
                ),
                Task::new(
                    "GET /orders/{id}",
                    1,
                    ORDER_ENDPOINT,
                    Classifier::OrderLookup {
                        not_found: NotFoundPolicy::TreatAsSuccess,
                        rate_limit,
                    },
                ),
            ],
        }
    }
}

impl fmt::Display for PolicyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyProfile::SafeMode => write!(f, "safe-mode"),
            PolicyProfile::Ecommerce => write!(f, "ecommerce"),
        }
    }
}

/// Per-user execution context created at session start.
///
/// Holds the session's HTTP client. Nothing else carries over between
/// iterations.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: usize,
    pub base_url: String,
    client: reqwest::Client,
}

impl UserContext {
    /// Context around an already built client.
    pub fn with_client(user_id: usize, base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            user_id,
            base_url: base_url.into(),
            client,
        }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// Weighted tasks plus the wait interval.
#[derive(Debug, Clone)]
pub struct TaskPolicy {
    selector: TaskSelector,
    wait: WaitTime,
}

impl TaskPolicy {
    /// Validates the task set and wait interval.
    pub fn new(tasks: Vec<Task>, wait: WaitTime) -> Result<Self, ConfigError> {
        Ok(Self {
            selector: TaskSelector::new(tasks)?,
            wait,
        })
    }

    /// Builds a built-in profile.
    ///
    /// `rate_limit` of None falls back to [`PolicyProfile::default_rate_limit`];
    /// `wait` of None to [`PolicyProfile::default_wait`].
    pub fn from_profile(
        profile: PolicyProfile,
        rate_limit: Option<RateLimitPolicy>,
        wait: Option<WaitTime>,
    ) -> Result<Self, ConfigError> {
        let rate_limit = rate_limit.unwrap_or_else(|| profile.default_rate_limit());
        let wait = match wait {
            Some(w) => w,
            None => {
                let (lo, hi) = profile.default_wait();
                WaitTime::between(lo, hi)?
            }
        };
        Self::new(profile.tasks(rate_limit), wait)
    }

    /// Applies per-session transport settings, producing the user's context.
    pub fn on_session_start(
        &self,
        user_id: usize,
        base_url: &str,
        transport: &TransportConfig,
    ) -> Result<UserContext, ConfigError> {
        let client = build_client(transport)?;
        Ok(UserContext::with_client(user_id, base_url, client))
    }

    /// Picks one task by weight, probes it and classifies the response.
    pub async fn select_and_run(&self, user: &UserContext) -> ProbeRecord {
        let task = self.selector.select();
        probe(user.client(), &user.base_url, task).await
    }

    /// Delay before the user's next iteration.
    pub fn sample_wait(&self) -> Duration {
        self.wait.sample()
    }

    pub fn sample_wait_seconds(&self) -> f64 {
        self.wait.sample_secs()
    }

    pub fn tasks(&self) -> &[Task] {
        self.selector.tasks()
    }

    pub fn wait_time(&self) -> &WaitTime {
        &self.wait
    }

    /// Logs the task table and wait interval.
    pub fn log_summary(&self) {
        for (task, (_, probability)) in self.selector.tasks().iter().zip(self.selector.probabilities()) {
            info!(
                task = %task.name,
                endpoint = %task.endpoint,
                weight = task.weight,
                probability = %format!("{:.1}%", probability * 100.0),
                classifier = ?task.classifier,
                "Task registered"
            );
        }
        info!(
            wait_min_secs = self.wait.min_secs(),
            wait_max_secs = self.wait.max_secs(),
            "Wait interval"
        );
    }
}
