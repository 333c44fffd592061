use mimalloc::MiMalloc;
use std::sync::{Arc, Mutex};
use tokio::time::Duration;
use tracing::{info, warn};

use shop_loadtest::client::log_transport_config;
use shop_loadtest::config::{Config, LogFormat};
use shop_loadtest::driver::run_load_test_until;
use shop_loadtest::logging::init_logging;
use shop_loadtest::metrics::{gather_metrics_string, register_metrics, start_metrics_server, PrometheusRecorder};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Prints helpful configuration documentation.
fn print_config_help() {
    eprintln!("Required environment variables:");
    eprintln!("  TARGET_HOST             - Gateway base URL (must start with http:// or https://)");
    eprintln!();
    eprintln!("Run settings:");
    eprintln!("  NUM_USERS               - Concurrent virtual users (default: 10, must be > 0)");
    eprintln!("  SPAWN_RATE              - Users started per second (default: 2)");
    eprintln!("  RUN_TIME                - Run duration: 30s, 2m, 1h30m (default: 2m)");
    eprintln!();
    eprintln!("Task policy:");
    eprintln!("  POLICY_PROFILE          - safe-mode, ecommerce or file (default: ecommerce)");
    eprintln!("  POLICY_FILE             - YAML task set (required if POLICY_PROFILE=file)");
    eprintln!("  RATE_LIMIT_POLICY       - How 429 is classified: success or failure");
    eprintln!("                            (default: safe-mode=failure, ecommerce=success)");
    eprintln!("  WAIT_MIN_SECS           - Override lower wait bound, seconds (set with WAIT_MAX_SECS)");
    eprintln!("  WAIT_MAX_SECS           - Override upper wait bound, seconds");
    eprintln!();
    eprintln!("Transport:");
    eprintln!("  SKIP_TLS_VERIFY         - Skip TLS certificate verification, dev only (default: false)");
    eprintln!("  REQUEST_TIMEOUT         - Per-request timeout (default: 30s)");
    eprintln!("  RESOLVE_TARGET_ADDR     - DNS override: hostname:ip:port");
    eprintln!();
    eprintln!("Reporting:");
    eprintln!("  METRICS_PORT            - Prometheus /metrics port, 0 disables (default: 9090)");
    eprintln!("  METRIC_NAMESPACE        - Prometheus metric namespace (default: shop_loadtest)");
    eprintln!("  LOG_FORMAT              - text or json (default: text)");
    eprintln!("  RUST_LOG                - Log filter (default: info)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            init_logging(LogFormat::Text);
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            std::process::exit(1);
        }
    };

    init_logging(config.log_format);

    let policy = match config.build_policy() {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            std::process::exit(1);
        }
    };

    register_metrics()?;

    config.print_summary();
    policy.log_summary();
    let run_config = config.to_run_config();
    log_transport_config(&run_config.transport);

    let registry_arc = Arc::new(Mutex::new(prometheus::default_registry().clone()));
    if let Some(metrics_port) = config.metrics_port {
        let registry = registry_arc.clone();
        tokio::spawn(async move {
            start_metrics_server(metrics_port, registry).await;
        });
    }

    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C; run will end at RUN_TIME");
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received, stopping early");
    };

    let summary = match run_load_test_until(&run_config, policy, Arc::new(PrometheusRecorder), ctrl_c).await {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Configuration error: {}\n", e);
            print_config_help();
            std::process::exit(1);
        }
    };

    info!(
        users_spawned = summary.users_spawned,
        probes_recorded = summary.probes_recorded,
        stopped_early = summary.stopped_early,
        "Load test completed"
    );

    let final_metrics_output = gather_metrics_string(&registry_arc);
    println!("\n--- FINAL METRICS ---\n{}", final_metrics_output);
    println!("--- END OF FINAL METRICS ---\n");

    if config.metrics_port.is_some() && !summary.stopped_early {
        println!("Pausing for 15 seconds to allow a final Prometheus scrape...");
        tokio::time::sleep(Duration::from_secs(15)).await;
    }

    Ok(())
}
