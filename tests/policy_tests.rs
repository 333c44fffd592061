//! Task policy behaviour: session start, weighted selection against a live
//! mock, and policies loaded from YAML files on disk.

use serial_test::serial;
use std::collections::HashMap;
use std::env;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shop_loadtest::classifier::{Classifier, NotFoundPolicy, RateLimitPolicy};
use shop_loadtest::client::TransportConfig;
use shop_loadtest::config::{Config, PolicySource};
use shop_loadtest::errors::ConfigError;
use shop_loadtest::policy::{
    PolicyProfile, TaskPolicy, ORDER_ENDPOINT, PRODUCTS_ENDPOINT, PRODUCT_HEALTH_ENDPOINT,
};

fn transport() -> TransportConfig {
    TransportConfig {
        request_timeout: Duration::from_secs(5),
        ..TransportConfig::default()
    }
}

#[tokio::test]
async fn select_and_run_hits_profile_endpoints_by_weight() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_ENDPOINT))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ORDER_ENDPOINT))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let policy = TaskPolicy::from_profile(PolicyProfile::Ecommerce, None, None).unwrap();
    let user = policy
        .on_session_start(0, &server.uri(), &transport())
        .unwrap();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for _ in 0..200 {
        let record = policy.select_and_run(&user).await;
        assert!(record.is_success(), "unexpected failure: {:?}", record);
        *counts.entry(record.task).or_default() += 1;
    }

    let products = counts.get("GET /products").copied().unwrap_or(0);
    let orders = counts.get("GET /orders/{id}").copied().unwrap_or(0);
    assert_eq!(products + orders, 200);
    // 3:1 weights; loose bounds keep this stable.
    assert!(products > orders, "products {} orders {}", products, orders);
    assert!(orders > 10, "orders {}", orders);
}

#[tokio::test]
async fn safe_mode_health_check_failure_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCTS_ENDPOINT))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PRODUCT_HEALTH_ENDPOINT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = TaskPolicy::from_profile(PolicyProfile::SafeMode, None, None).unwrap();
    let user = policy
        .on_session_start(7, &server.uri(), &transport())
        .unwrap();
    assert_eq!(user.user_id, 7);

    let mut saw_health_failure = false;
    for _ in 0..100 {
        let record = policy.select_and_run(&user).await;
        if record.task == "health_check" {
            assert_eq!(
                record.outcome.reason(),
                Some("Health check failed with status 503")
            );
            saw_health_failure = true;
        } else {
            assert!(record.is_success());
        }
    }
    assert!(saw_health_failure);
}

#[test]
fn session_start_accepts_skip_tls_and_resolve_override() {
    let policy = TaskPolicy::from_profile(PolicyProfile::SafeMode, None, None).unwrap();
    let transport = TransportConfig {
        skip_tls_verify: true,
        resolve_target_addr: Some("shop.internal:127.0.0.1:8443".to_string()),
        ..TransportConfig::default()
    };

    let user = policy
        .on_session_start(1, "https://shop.internal:8443", &transport)
        .unwrap();
    assert_eq!(user.base_url, "https://shop.internal:8443");
}

#[test]
fn session_start_rejects_bad_resolve_override() {
    let policy = TaskPolicy::from_profile(PolicyProfile::SafeMode, None, None).unwrap();
    let transport = TransportConfig {
        resolve_target_addr: Some("shop.internal:nope:8443".to_string()),
        ..TransportConfig::default()
    };

    let err = policy
        .on_session_start(1, "https://shop.internal:8443", &transport)
        .unwrap_err();
    assert!(err.to_string().contains("RESOLVE_TARGET_ADDR"));
}

fn write_policy(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn file_config(file: &NamedTempFile) -> Config {
    env::remove_var("POLICY_FILE");
    env::remove_var("RATE_LIMIT_POLICY");
    env::remove_var("WAIT_MIN_SECS");
    env::remove_var("WAIT_MAX_SECS");
    env::set_var("TARGET_HOST", "http://gateway.local");
    env::set_var("POLICY_PROFILE", "file");
    env::set_var("POLICY_FILE", file.path());
    Config::from_env().unwrap()
}

fn clear_file_env() {
    for var in ["TARGET_HOST", "POLICY_PROFILE", "POLICY_FILE", "RATE_LIMIT_POLICY"] {
        env::remove_var(var);
    }
}

const CHECKOUT_FLOW: &str = r#"
wait:
  min: 0.5
  max: 2
tasks:
  - name: browse
    weight: 5
    endpoint: /product-service/api/products
    classifier:
      type: catalog
  - name: order
    weight: 2
    endpoint: /order-service/api/orders/42
    classifier:
      type: order
      notFound: treatAsFailure
"#;

#[test]
#[serial]
fn policy_file_with_env_rate_limit() {
    let file = write_policy(CHECKOUT_FLOW);
    let config = file_config(&file);
    assert_eq!(
        config.policy_source,
        PolicySource::File(file.path().to_path_buf())
    );

    // No rateLimit in the file, so the build fails until one is provided.
    let err = config.build_policy().unwrap_err();
    assert!(err.to_string().contains("rateLimit"));

    let config = Config {
        rate_limit: Some(RateLimitPolicy::TreatAsSuccess),
        ..config
    };
    let policy = config.build_policy().unwrap();
    let tasks = policy.tasks();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].weight, 5);
    assert_eq!(
        tasks[1].classifier,
        Classifier::OrderLookup {
            not_found: NotFoundPolicy::TreatAsFailure,
            rate_limit: RateLimitPolicy::TreatAsSuccess,
        }
    );
    assert_eq!(policy.wait_time().min_secs(), 0.5);
    assert_eq!(policy.wait_time().max_secs(), 2.0);

    clear_file_env();
}

#[test]
#[serial]
fn wait_override_replaces_file_interval() {
    let file = write_policy(
        r#"
rateLimit: treatAsFailure
wait: { min: 1, max: 3 }
tasks:
  - name: health
    endpoint: /product-service/actuator/health
    classifier: { type: health }
"#,
    );
    let config = file_config(&file);
    let config = Config {
        wait_override: Some(shop_loadtest::wait_time::WaitTime::constant(0.0).unwrap()),
        ..config
    };

    let policy = config.build_policy().unwrap();
    assert_eq!(policy.sample_wait(), Duration::ZERO);

    clear_file_env();
}

#[test]
#[serial]
fn missing_policy_file_is_read_error() {
    let file = write_policy("");
    let config = file_config(&file);
    let config = Config {
        policy_source: PolicySource::File(file.path().with_extension("missing")),
        ..config
    };

    assert!(matches!(
        config.build_policy(),
        Err(ConfigError::FileRead(_))
    ));

    clear_file_env();
}

#[test]
#[serial]
fn malformed_policy_file_is_parse_error() {
    let file = write_policy("wait: [1, 2]\ntasks: nope\n");
    let config = file_config(&file);

    assert!(matches!(
        config.build_policy(),
        Err(ConfigError::YamlParse(_))
    ));

    clear_file_env();
}

#[test]
#[serial]
fn policy_file_with_no_tasks_is_rejected() {
    let file = write_policy("rateLimit: treatAsSuccess\nwait: { min: 1, max: 2 }\ntasks: []\n");
    let config = file_config(&file);

    assert!(matches!(config.build_policy(), Err(ConfigError::NoTasks)));

    clear_file_env();
}
