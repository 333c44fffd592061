//! Task definitions.

use crate::classifier::Classifier;

/// A named, weighted action a virtual user can perform: one GET against
/// `endpoint`, judged by `classifier`.
///
/// # Example
/// ```
/// use shop_loadtest::classifier::Classifier;
/// use shop_loadtest::task::Task;
///
/// let task = Task::new("health_check", 1, "/product-service/actuator/health", Classifier::HealthCheck);
/// assert_eq!(task.weight, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    /// Identifier, also used as the reporting label
    pub name: String,

    /// Relative selection frequency; 0 disables the task
    pub weight: u32,

    /// Path relative to the target host (e.g. "/product-service/api/products")
    pub endpoint: String,

    pub classifier: Classifier,
}

impl Task {
    pub fn new(
        name: impl Into<String>,
        weight: u32,
        endpoint: impl Into<String>,
        classifier: Classifier,
    ) -> Self {
        Self {
            name: name.into(),
            weight,
            endpoint: endpoint.into(),
            classifier,
        }
    }

    /// Joins the target host and this task's endpoint without doubling slashes.
    pub fn url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        if self.endpoint.starts_with('/') {
            format!("{}{}", base, self.endpoint)
        } else {
            format!("{}/{}", base, self.endpoint)
        }
    }
}
