use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use prometheus::{Encoder, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::env;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::probe::ProbeRecord;
use crate::recorder::Recorder;

lazy_static::lazy_static! {
    pub static ref METRIC_NAMESPACE: String =
        env::var("METRIC_NAMESPACE").unwrap_or_else(|_| "shop_loadtest".to_string());

    pub static ref PROBES_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("probes_total", "Total number of completed probes")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["task", "outcome"]  // outcome: success, failure
        ).unwrap();

    pub static ref PROBE_FAILURES_TOTAL: IntCounterVec =
        IntCounterVec::new(
            Opts::new("probe_failures_total", "Failed probes by error category")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["task", "category"]
        ).unwrap();

    pub static ref PROBE_STATUS_CODES: IntCounterVec =
        IntCounterVec::new(
            Opts::new("probe_status_codes_total", "Number of probes by HTTP status code")
                .namespace(METRIC_NAMESPACE.as_str()),
            &["task", "status_code"]
        ).unwrap();

    pub static ref PROBE_DURATION_SECONDS: HistogramVec =
        HistogramVec::new(
            prometheus::HistogramOpts::new(
                "probe_duration_seconds",
                "Probe latencies in seconds."
            ).namespace(METRIC_NAMESPACE.as_str()),
            &["task"]
        ).unwrap();

    pub static ref ACTIVE_USERS: IntGauge =
        IntGauge::with_opts(
            Opts::new("active_users", "Number of virtual users currently running")
                .namespace(METRIC_NAMESPACE.as_str())
        ).unwrap();
}

/// Registers all metrics with the default Prometheus registry.
pub fn register_metrics() -> Result<(), prometheus::Error> {
    prometheus::default_registry().register(Box::new(PROBES_TOTAL.clone()))?;
    prometheus::default_registry().register(Box::new(PROBE_FAILURES_TOTAL.clone()))?;
    prometheus::default_registry().register(Box::new(PROBE_STATUS_CODES.clone()))?;
    prometheus::default_registry().register(Box::new(PROBE_DURATION_SECONDS.clone()))?;
    prometheus::default_registry().register(Box::new(ACTIVE_USERS.clone()))?;
    Ok(())
}

/// Exports every probe record to the Prometheus statics above.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusRecorder;

impl Recorder for PrometheusRecorder {
    fn record(&self, record: &ProbeRecord) {
        PROBES_TOTAL
            .with_label_values(&[record.task.as_str(), record.outcome.label()])
            .inc();

        let status_label = match record.status_code {
            Some(code) => status_code_label(code),
            None => "error",
        };
        PROBE_STATUS_CODES
            .with_label_values(&[record.task.as_str(), status_label])
            .inc();

        if let Some(category) = record.error_category {
            if !record.is_success() {
                PROBE_FAILURES_TOTAL
                    .with_label_values(&[record.task.as_str(), category.label()])
                    .inc();
            }
        }

        PROBE_DURATION_SECONDS
            .with_label_values(&[record.task.as_str()])
            .observe(record.latency.as_secs_f64());
    }

    fn user_started(&self, _user_id: usize) {
        ACTIVE_USERS.inc();
    }

    fn user_stopped(&self, _user_id: usize) {
        ACTIVE_USERS.dec();
    }
}

/// Returns a static string label for the status codes this system produces.
///
/// Uncommon codes fall back to "other" to keep label cardinality bounded.
fn status_code_label(code: u16) -> &'static str {
    match code {
        200 => "200",
        301 => "301",
        302 => "302",
        400 => "400",
        401 => "401",
        403 => "403",
        404 => "404",
        408 => "408",
        429 => "429",
        500 => "500",
        502 => "502",
        503 => "503",
        504 => "504",
        _ => "other",
    }
}

/// HTTP handler for the Prometheus metrics endpoint.
pub async fn metrics_handler(
    _req: Request<Body>,
    registry: Arc<Mutex<Registry>>,
) -> Result<Response<Body>, hyper::Error> {
    let buffer = encode_registry(&registry);
    let response = match Response::builder()
        .status(200)
        .header("Content-Type", TextEncoder::new().format_type())
        .body(Body::from(buffer))
    {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "Failed to build metrics response");
            let mut response = Response::new(Body::empty());
            *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    };

    Ok(response)
}

/// Starts the Prometheus metrics HTTP server.
pub async fn start_metrics_server(port: u16, registry: Arc<Mutex<Registry>>) {
    let addr = ([0, 0, 0, 0], port).into();

    let make_svc = make_service_fn(move |_conn| {
        let registry_clone = registry.clone();
        async move {
            Ok::<_, hyper::Error>(service_fn(move |req| {
                let registry_clone_inner = registry_clone.clone();
                async move { metrics_handler(req, registry_clone_inner).await }
            }))
        }
    });

    let server = match Server::try_bind(&addr) {
        Ok(builder) => builder.serve(make_svc),
        Err(e) => {
            error!(port = port, error = %e, "Failed to bind metrics server");
            return;
        }
    };
    info!(
        port = port,
        addr = %addr,
        "Metrics server listening"
    );

    if let Err(e) = server.await {
        error!(error = %e, "Metrics server error");
    }
}

fn encode_registry(registry: &Arc<Mutex<Registry>>) -> Vec<u8> {
    let metric_families = match registry.lock() {
        Ok(guard) => guard.gather(),
        Err(poisoned) => poisoned.into_inner().gather(),
    };
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
    }
    buffer
}

/// Gathers and encodes metrics as a string for final output.
pub fn gather_metrics_string(registry: &Arc<Mutex<Registry>>) -> String {
    String::from_utf8(encode_registry(registry)).unwrap_or_else(|e| {
        error!(error = %e, "Error encoding metrics to UTF-8");
        String::from("# ERROR ENCODING METRICS TO UTF-8")
    })
}
