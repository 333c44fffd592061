use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::time::Duration;

use crate::classifier::RateLimitPolicy;
use crate::client::TransportConfig;
use crate::driver::RunConfig;
use crate::errors::ConfigError;
use crate::policy::{PolicyProfile, TaskPolicy};
use crate::policy_file::PolicyFile;
use crate::utils::{parse_duration_string, parse_seconds};
use crate::wait_time::WaitTime;

/// Where the task set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySource {
    Profile(PolicyProfile),
    File(PathBuf),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Main configuration for the load test.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_host: String,
    pub num_users: usize,
    pub spawn_rate: f64,
    pub run_time: Duration,
    pub policy_source: PolicySource,
    /// Explicit 429 handling; None keeps the profile's (or file's) choice
    pub rate_limit: Option<RateLimitPolicy>,
    /// Overrides the profile's (or file's) wait interval
    pub wait_override: Option<WaitTime>,
    pub skip_tls_verify: bool,
    pub request_timeout: Duration,
    pub resolve_target_addr: Option<String>,
    /// None disables the metrics server
    pub metrics_port: Option<u16>,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let target_host = env::var("TARGET_HOST").map_err(|_| ConfigError::MissingVar("TARGET_HOST"))?;
        if !(target_host.starts_with("http://") || target_host.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "TARGET_HOST",
                target_host,
                "Must start with http:// or https://",
            ));
        }

        let num_users: usize = parse_var("NUM_USERS", "10")?;
        if num_users == 0 {
            return Err(ConfigError::invalid("NUM_USERS", "0", "Must be greater than 0."));
        }

        let spawn_rate: f64 = parse_var("SPAWN_RATE", "2")?;
        if !(spawn_rate.is_finite() && spawn_rate > 0.0) {
            return Err(ConfigError::invalid(
                "SPAWN_RATE",
                spawn_rate.to_string(),
                "Must be a positive number of users per second.",
            ));
        }

        let run_time = duration_var("RUN_TIME", "2m")?;
        let request_timeout = duration_var("REQUEST_TIMEOUT", "30s")?;

        let policy_source = Self::parse_policy_source()?;

        let rate_limit = match env::var("RATE_LIMIT_POLICY") {
            Ok(value) => Some(RateLimitPolicy::parse(&value).ok_or_else(|| {
                ConfigError::invalid("RATE_LIMIT_POLICY", value.clone(), "Use 'success' or 'failure'.")
            })?),
            Err(_) => None,
        };

        let wait_override = Self::parse_wait_override()?;

        let skip_tls_verify = bool_var("SKIP_TLS_VERIFY");
        let resolve_target_addr = env::var("RESOLVE_TARGET_ADDR").ok().filter(|s| !s.is_empty());

        let metrics_port: u16 = parse_var("METRICS_PORT", "9090")?;
        let metrics_port = if metrics_port == 0 { None } else { Some(metrics_port) };

        let log_format = match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "text".to_string())
            .to_lowercase()
            .as_str()
        {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(ConfigError::invalid("LOG_FORMAT", other, "Use 'text' or 'json'."))
            }
        };

        Ok(Config {
            target_host,
            num_users,
            spawn_rate,
            run_time,
            policy_source,
            rate_limit,
            wait_override,
            skip_tls_verify,
            request_timeout,
            resolve_target_addr,
            metrics_port,
            log_format,
        })
    }

    fn parse_policy_source() -> Result<PolicySource, ConfigError> {
        let profile = env::var("POLICY_PROFILE").unwrap_or_else(|_| "ecommerce".to_string());

        if profile.trim().eq_ignore_ascii_case("file") {
            let path = env::var("POLICY_FILE").map_err(|_| ConfigError::MissingVar("POLICY_FILE"))?;
            return Ok(PolicySource::File(PathBuf::from(path)));
        }

        PolicyProfile::parse(&profile)
            .map(PolicySource::Profile)
            .ok_or_else(|| {
                ConfigError::invalid(
                    "POLICY_PROFILE",
                    profile.clone(),
                    "Use 'safe-mode', 'ecommerce' or 'file'.",
                )
            })
    }

    fn parse_wait_override() -> Result<Option<WaitTime>, ConfigError> {
        let min = env::var("WAIT_MIN_SECS").ok();
        let max = env::var("WAIT_MAX_SECS").ok();

        match (min, max) {
            (None, None) => Ok(None),
            (Some(min), Some(max)) => {
                let lo = parse_seconds(&min).map_err(|e| ConfigError::invalid("WAIT_MIN_SECS", min.clone(), e))?;
                let hi = parse_seconds(&max).map_err(|e| ConfigError::invalid("WAIT_MAX_SECS", max.clone(), e))?;
                Ok(Some(WaitTime::between(lo, hi)?))
            }
            (Some(_), None) => Err(ConfigError::MissingVar("WAIT_MAX_SECS")),
            (None, Some(_)) => Err(ConfigError::MissingVar("WAIT_MIN_SECS")),
        }
    }

    /// Builds the task policy this configuration describes.
    pub fn build_policy(&self) -> Result<TaskPolicy, ConfigError> {
        match &self.policy_source {
            PolicySource::Profile(profile) => {
                TaskPolicy::from_profile(*profile, self.rate_limit, self.wait_override)
            }
            PolicySource::File(path) => {
                let file = PolicyFile::from_file(path)?;
                let policy = file.into_policy(self.rate_limit)?;
                match self.wait_override {
                    Some(wait) => TaskPolicy::new(policy.tasks().to_vec(), wait),
                    None => Ok(policy),
                }
            }
        }
    }

    pub fn to_transport_config(&self) -> TransportConfig {
        TransportConfig {
            skip_tls_verify: self.skip_tls_verify,
            request_timeout: self.request_timeout,
            resolve_target_addr: self.resolve_target_addr.clone(),
        }
    }

    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            base_url: self.target_host.clone(),
            num_users: self.num_users,
            spawn_rate: self.spawn_rate,
            run_time: self.run_time,
            transport: self.to_transport_config(),
        }
    }

    /// Prints the configuration summary.
    pub fn print_summary(&self) {
        println!("Starting load test:");
        println!("  Target host: {}", self.target_host);
        println!("  Users: {} (spawn rate {}/s)", self.num_users, self.spawn_rate);
        println!("  Run time: {:?}", self.run_time);
        match &self.policy_source {
            PolicySource::Profile(profile) => println!("  Policy profile: {}", profile),
            PolicySource::File(path) => println!("  Policy file: {}", path.display()),
        }
        match self.rate_limit {
            Some(policy) => println!("  Rate limit (429) policy: {:?}", policy),
            None => println!("  Rate limit (429) policy: profile/file default"),
        }
        println!("  Skip TLS Verify: {}", self.skip_tls_verify);
        println!("  Request timeout: {:?}", self.request_timeout);
        match self.metrics_port {
            Some(port) => println!("  Metrics port: {}", port),
            None => println!("  Metrics server: disabled"),
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(name, raw.clone(), "Not a valid number."))
}

fn duration_var(name: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    parse_duration_string(&raw).map_err(|e| ConfigError::invalid(name, raw.clone(), e))
}

fn bool_var(name: &str) -> bool {
    env::var(name)
        .unwrap_or_else(|_| "false".to_string())
        .to_lowercase()
        == "true"
}
