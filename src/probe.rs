//! One HTTP probe: GET, drain, classify.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::classifier::Outcome;
use crate::errors::{full_error_chain, ErrorCategory};
use crate::task::Task;

/// Reportable result of a single completed probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRecord {
    /// Task name, used as the reporting label
    pub task: String,

    pub endpoint: String,

    pub outcome: Outcome,

    /// HTTP status, absent on transport errors
    pub status_code: Option<u16>,

    /// Set for transport errors and for rejected status codes
    pub error_category: Option<ErrorCategory>,

    /// Request latency (send until body drained); excludes wait time
    pub latency: Duration,
}

impl ProbeRecord {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Issues one GET for `task` against `base_url` and classifies the result.
///
/// Never retries and never returns an error: transport failures become an
/// [`Outcome::Failure`] carrying the error text.
pub async fn probe(client: &reqwest::Client, base_url: &str, task: &Task) -> ProbeRecord {
    let url = task.url(base_url);
    let start = Instant::now();

    let (outcome, status_code, error_category) = match client.get(&url).send().await {
        Ok(mut response) => {
            let status = response.status().as_u16();

            // Drain the body in chunks so nothing is buffered. A body that
            // fails mid-stream still has a status; the classifier decides.
            loop {
                match response.chunk().await {
                    Ok(Some(_chunk)) => {}
                    Ok(None) => break,
                    Err(e) => {
                        debug!(
                            task = %task.name,
                            url = %url,
                            status_code = status,
                            error = %full_error_chain(&e),
                            "Response body truncated"
                        );
                        break;
                    }
                }
            }

            let outcome = task.classifier.classify(status);
            let category = if outcome.is_success() {
                None
            } else {
                Some(ErrorCategory::from_status_code(status).unwrap_or(ErrorCategory::OtherError))
            };
            (outcome, Some(status), category)
        }
        Err(e) => {
            let category = ErrorCategory::from_reqwest_error(&e);
            (
                Outcome::Failure(full_error_chain(&e)),
                None,
                Some(category),
            )
        }
    };

    let latency = start.elapsed();

    debug!(
        task = %task.name,
        url = %url,
        status_code = ?status_code,
        outcome = %outcome,
        latency_ms = latency.as_millis() as u64,
        "Probe completed"
    );

    ProbeRecord {
        task: task.name.clone(),
        endpoint: task.endpoint.clone(),
        outcome,
        status_code,
        error_category,
        latency,
    }
}
